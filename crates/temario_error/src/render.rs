//! PDF render endpoint error types.

/// Render endpoint failure conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum RenderErrorKind {
    /// The request could not be sent
    #[display("Render request failed: {}", _0)]
    Request(String),
    /// Non-2xx response
    #[display("Render endpoint returned HTTP {}: {}", status_code, message)]
    Status {
        /// HTTP status code
        status_code: u16,
        /// Response body or reason phrase
        message: String,
    },
    /// The endpoint answered `ok: false`
    #[display("Render endpoint rejected the document: {}", _0)]
    Rejected(String),
    /// `pdfData` missing or not valid base64
    #[display("Invalid render payload: {}", _0)]
    InvalidPayload(String),
    /// The call exceeded its deadline
    #[display("Render timed out after {}ms", _0)]
    Timeout(u64),
}

impl RenderErrorKind {
    /// Every endpoint failure is eligible for retry except a garbled payload
    /// on a 2xx answer, which repeats deterministically.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, RenderErrorKind::InvalidPayload(_))
    }
}

/// Render error with source location tracking.
///
/// # Examples
///
/// ```
/// use temario_error::{RenderError, RenderErrorKind, RetryableError};
///
/// let err = RenderError::new(RenderErrorKind::Status {
///     status_code: 502,
///     message: "Bad Gateway".to_string(),
/// });
/// assert!(err.is_retryable());
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Render Error: {} at line {} in {}", kind, line, file)]
pub struct RenderError {
    /// The kind of error that occurred
    pub kind: RenderErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl RenderError {
    /// Create a new RenderError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: RenderErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
