//! Retry with backoff and size-aware per-attempt timeouts.
//!
//! Render and upload calls share one loop: a bounded number of attempts, a
//! delay schedule between them, and a deadline per attempt that can grow with
//! the payload size and the attempt number.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use temario_error::RetryableError;
use tokio_retry2::{Retry, RetryError, strategy::jitter};
use tracing::{debug, warn};

const MIB: usize = 1024 * 1024;

/// Shape of the delay between attempts.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Backoff {
    /// `base * n` before the n-th retry
    Linear,
    /// `base * 2^(n-1)` before the n-th retry
    Exponential,
}

/// Attempt budget, delay schedule and per-attempt deadline of one stage.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use temario_policy::RetryPolicy;
///
/// let policy = RetryPolicy::upload_default();
/// // 3 MiB payload, second attempt: (base + 3 * per_mib) * 2
/// assert_eq!(
///     policy.attempt_timeout(2, 3 * 1024 * 1024),
///     Duration::from_millis((30_000 + 3 * 10_000) * 2)
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: usize,
    /// Delay unit between attempts
    pub base_delay_ms: u64,
    /// Delay growth
    pub backoff: Backoff,
    /// Upper bound on one delay
    pub max_delay_ms: u64,
    /// Deadline of one attempt before size scaling
    pub base_timeout_ms: u64,
    /// Extra deadline per started MiB of payload
    #[serde(default)]
    pub timeout_per_mib_ms: u64,
    /// Multiply the deadline by the attempt number
    #[serde(default)]
    pub scale_timeout_by_attempt: bool,
    /// Randomise delays
    #[serde(default)]
    pub jitter: bool,
}

impl RetryPolicy {
    /// Render calls: few attempts, linear backoff, fixed deadline.
    pub fn render_default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 2_000,
            backoff: Backoff::Linear,
            max_delay_ms: 10_000,
            base_timeout_ms: 120_000,
            timeout_per_mib_ms: 0,
            scale_timeout_by_attempt: false,
            jitter: false,
        }
    }

    /// Uploads: exponential backoff, deadline scaled by size and attempt.
    pub fn upload_default() -> Self {
        Self {
            max_attempts: 4,
            base_delay_ms: 1_000,
            backoff: Backoff::Exponential,
            max_delay_ms: 30_000,
            base_timeout_ms: 30_000,
            timeout_per_mib_ms: 10_000,
            scale_timeout_by_attempt: true,
            jitter: false,
        }
    }

    /// Delays slept between attempts; one fewer than `max_attempts`.
    pub fn delays(&self) -> Vec<Duration> {
        let cap = Duration::from_millis(self.max_delay_ms);
        (1..self.max_attempts)
            .map(|retry| {
                let factor = match self.backoff {
                    Backoff::Linear => retry as u64,
                    Backoff::Exponential => 1_u64 << (retry - 1).min(20),
                };
                Duration::from_millis(self.base_delay_ms.saturating_mul(factor)).min(cap)
            })
            .map(|delay| if self.jitter { jitter(delay) } else { delay })
            .collect()
    }

    /// Deadline of the given 1-based attempt for a payload of `payload_bytes`.
    pub fn attempt_timeout(&self, attempt: usize, payload_bytes: usize) -> Duration {
        let started_mib = payload_bytes.div_ceil(MIB) as u64;
        let mut millis = self
            .base_timeout_ms
            .saturating_add(self.timeout_per_mib_ms.saturating_mul(started_mib));
        if self.scale_timeout_by_attempt {
            millis = millis.saturating_mul(attempt.max(1) as u64);
        }
        Duration::from_millis(millis)
    }
}

/// Run `operation` under `policy`.
///
/// The operation receives the 1-based attempt number. Each attempt runs under
/// [`RetryPolicy::attempt_timeout`]; an elapsed deadline is turned into an
/// error by `on_timeout` and classified like any other. Errors whose
/// [`RetryableError::is_retryable`] is false end the loop immediately.
///
/// # Examples
///
/// ```
/// # let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
/// # rt.block_on(async {
/// use temario_error::{RenderError, RenderErrorKind};
/// use temario_policy::{RetryPolicy, retry_with_backoff};
///
/// let policy = RetryPolicy { base_delay_ms: 1, ..RetryPolicy::render_default() };
/// let value = retry_with_backoff(
///     &policy,
///     0,
///     "render",
///     |attempt| async move {
///         if attempt < 2 {
///             Err(RenderError::new(RenderErrorKind::Request("reset".into())))
///         } else {
///             Ok(attempt)
///         }
///     },
///     |elapsed| RenderError::new(RenderErrorKind::Timeout(elapsed.as_millis() as u64)),
/// )
/// .await
/// .unwrap();
/// assert_eq!(value, 2);
/// # });
/// ```
pub async fn retry_with_backoff<T, E, Op, Fut, OnTimeout>(
    policy: &RetryPolicy,
    payload_bytes: usize,
    stage: &str,
    operation: Op,
    on_timeout: OnTimeout,
) -> Result<T, E>
where
    Op: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    OnTimeout: Fn(Duration) -> E,
    E: RetryableError + Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let on_timeout = &on_timeout;
    let mut operation = operation;
    let mut attempt = 0_usize;

    Retry::spawn(policy.delays(), move || {
        attempt += 1;
        let current = attempt;
        let deadline = policy.attempt_timeout(current, payload_bytes);
        let pending = operation(current);
        async move {
            debug!(
                stage,
                attempt = current,
                deadline_ms = deadline.as_millis() as u64,
                "Attempt started"
            );
            let outcome = match tokio::time::timeout(deadline, pending).await {
                Ok(result) => result,
                Err(_) => Err(on_timeout(deadline)),
            };
            match outcome {
                Ok(value) => Ok(value),
                Err(err) if err.is_retryable() && current < max_attempts => {
                    warn!(
                        stage,
                        attempt = current,
                        max_attempts,
                        error = %err,
                        "Attempt failed, will retry"
                    );
                    Err(RetryError::Transient {
                        err,
                        retry_after: None,
                    })
                }
                Err(err) => {
                    warn!(stage, attempt = current, error = %err, "Attempt failed, giving up");
                    Err(RetryError::Permanent(err))
                }
            }
        }
    })
    .await
}
