//! Object storage upload error types.

/// Upload failure conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum UploadErrorKind {
    /// The storage backend rejected the write
    #[display("Upload failed: {}", _0)]
    Storage(String),
    /// The attempt exceeded its size-scaled deadline
    #[display("Upload timed out after {}ms", _0)]
    Timeout(u64),
    /// Payload is above the hard upload limit and was never attempted
    #[display("Payload of {} bytes exceeds upload limit of {} bytes", size, limit)]
    PayloadTooLarge {
        /// Payload size in bytes
        size: usize,
        /// Configured limit in bytes
        limit: usize,
    },
}

impl UploadErrorKind {
    /// Oversized payloads fail the same way every time.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, UploadErrorKind::PayloadTooLarge { .. })
    }
}

/// Upload error with source location tracking.
///
/// # Examples
///
/// ```
/// use temario_error::{RetryableError, UploadError, UploadErrorKind};
///
/// let err = UploadError::new(UploadErrorKind::PayloadTooLarge {
///     size: 150 * 1024 * 1024,
///     limit: 100 * 1024 * 1024,
/// });
/// assert!(!err.is_retryable());
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Upload Error: {} at line {} in {}", kind, line, file)]
pub struct UploadError {
    /// The kind of error that occurred
    pub kind: UploadErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl UploadError {
    /// Create a new UploadError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: UploadErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
