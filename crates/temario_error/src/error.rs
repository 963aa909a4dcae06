//! Top-level error wrapper types.

use crate::{
    ConfigError, GenerationError, HttpError, JsonError, PersistenceError, RenderError,
    StorageError, UploadError, ValidationError,
};

/// Every failure the pipeline can report.
///
/// The taxonomy follows the pipeline stages: generation, validation,
/// persistence, render and upload. Timeouts are reported through the kind of
/// the stage that timed out.
///
/// # Examples
///
/// ```
/// use temario_error::{HttpError, TemarioError};
///
/// let http_err = HttpError::new("Connection failed");
/// let err: TemarioError = http_err.into();
/// assert!(format!("{}", err).contains("HTTP Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum TemarioErrorKind {
    /// HTTP transport error
    #[from(HttpError)]
    Http(HttpError),
    /// JSON serialization/deserialization error
    #[from(JsonError)]
    Json(JsonError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Content generator failure
    #[from(GenerationError)]
    Generation(GenerationError),
    /// Generated content rejected
    #[from(ValidationError)]
    Validation(ValidationError),
    /// Document store failure
    #[from(PersistenceError)]
    Persistence(PersistenceError),
    /// PDF render failure
    #[from(RenderError)]
    Render(RenderError),
    /// Object storage upload failure
    #[from(UploadError)]
    Upload(UploadError),
    /// Object storage backend failure
    #[from(StorageError)]
    Storage(StorageError),
}

/// Temario error with kind discrimination.
///
/// # Examples
///
/// ```
/// use temario_error::{ConfigError, TemarioErrorKind, TemarioResult};
///
/// fn might_fail() -> TemarioResult<()> {
///     Err(ConfigError::new("Missing field"))?
/// }
///
/// let err = might_fail().unwrap_err();
/// assert!(matches!(err.kind(), TemarioErrorKind::Config(_)));
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Temario Error: {}", _0)]
pub struct TemarioError(Box<TemarioErrorKind>);

impl TemarioError {
    /// Create a new error from a kind.
    pub fn new(kind: TemarioErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &TemarioErrorKind {
        &self.0
    }

    /// True when the error came from the validator.
    pub fn is_validation(&self) -> bool {
        matches!(self.kind(), TemarioErrorKind::Validation(_))
    }
}

// Generic From implementation for any type that converts to TemarioErrorKind
impl<T> From<T> for TemarioError
where
    T: Into<TemarioErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Temario operations.
pub type TemarioResult<T> = std::result::Result<T, TemarioError>;
