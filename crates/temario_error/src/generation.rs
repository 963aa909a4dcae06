//! Content generator error types.

/// Failure conditions when calling the language model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum GenerationErrorKind {
    /// The request could not be sent
    #[display("Generator request failed: {}", _0)]
    Request(String),
    /// The model endpoint answered with a non-success status
    #[display("Generator returned HTTP {}: {}", status_code, message)]
    Status {
        /// HTTP status code
        status_code: u16,
        /// Response body or reason phrase
        message: String,
    },
    /// The response body could not be decoded
    #[display("Failed to decode generator response: {}", _0)]
    Deserialization(String),
    /// The model returned no usable text
    #[display("Generator returned an empty response")]
    EmptyResponse,
    /// Structured output (tests, flashcards) was expected but not found
    #[display("No structured output in generator response: {}", _0)]
    MissingStructuredOutput(String),
    /// The call exceeded its deadline
    #[display("Generator call timed out after {}s", _0)]
    Timeout(u64),
}

impl GenerationErrorKind {
    /// Check if this failure is transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            GenerationErrorKind::Status { status_code, .. } => {
                matches!(*status_code, 408 | 429 | 500 | 502 | 503 | 504)
            }
            GenerationErrorKind::Request(_) | GenerationErrorKind::Timeout(_) => true,
            _ => false,
        }
    }
}

/// Content generator error with source location tracking.
///
/// # Examples
///
/// ```
/// use temario_error::{GenerationError, GenerationErrorKind};
///
/// let err = GenerationError::new(GenerationErrorKind::EmptyResponse);
/// assert!(format!("{}", err).contains("empty response"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Generation Error: {} at line {} in {}", kind, line, file)]
pub struct GenerationError {
    /// The kind of error that occurred
    pub kind: GenerationErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl GenerationError {
    /// Create a new GenerationError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: GenerationErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
