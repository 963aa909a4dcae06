//! Retry classification shared by every error that crosses a network boundary.

use crate::{
    GenerationError, RenderError, TemarioError, TemarioErrorKind, UploadError,
};

/// Trait for errors that support retry logic.
///
/// The retry utility asks the error whether another attempt can help. Transient
/// failures (timeouts, 5xx, throttling) return true; deterministic failures
/// (oversized payloads, malformed responses, validation) return false.
///
/// # Examples
///
/// ```
/// use temario_error::{RenderError, RenderErrorKind, RetryableError};
///
/// let err = RenderError::new(RenderErrorKind::Timeout(30_000));
/// assert!(err.is_retryable());
/// ```
pub trait RetryableError {
    /// Returns true if this error should trigger a retry.
    fn is_retryable(&self) -> bool;
}

impl RetryableError for GenerationError {
    fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl RetryableError for RenderError {
    fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl RetryableError for UploadError {
    fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl RetryableError for TemarioError {
    fn is_retryable(&self) -> bool {
        match self.kind() {
            TemarioErrorKind::Generation(e) => e.is_retryable(),
            TemarioErrorKind::Render(e) => e.is_retryable(),
            TemarioErrorKind::Upload(e) => e.is_retryable(),
            TemarioErrorKind::Http(_) => true,
            _ => false,
        }
    }
}
