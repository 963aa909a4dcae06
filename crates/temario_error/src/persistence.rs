//! Document store error types.

/// Document store failure conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum PersistenceErrorKind {
    /// Reading a document or collection failed
    #[display("Failed to read {}", _0)]
    Read(String),
    /// Writing a document was rejected
    #[display("Failed to write {}", _0)]
    Write(String),
    /// Deleting a document failed
    #[display("Failed to delete {}", _0)]
    Delete(String),
    /// The document does not exist
    #[display("Document not found: {}", _0)]
    NotFound(String),
    /// A set write would not contain the configured number of items
    #[display("Expected exactly {} items for {}, got {}", expected, collection, actual)]
    CountMismatch {
        /// Collection being written
        collection: String,
        /// Items required
        expected: usize,
        /// Items supplied
        actual: usize,
    },
    /// A document could not be converted to or from its record type
    #[display("Failed to convert document {}: {}", path, message)]
    Serialization {
        /// Document path
        path: String,
        /// Conversion error
        message: String,
    },
    /// Another operator holds the generation lease for this assistant
    #[display("Generation lease for '{}' held by {} until {}", assistant, holder, expires_at)]
    LeaseHeld {
        /// Assistant id
        assistant: String,
        /// Current holder
        holder: String,
        /// Expiry as RFC 3339
        expires_at: String,
    },
}

/// Document store error with source location tracking.
///
/// # Examples
///
/// ```
/// use temario_error::{PersistenceError, PersistenceErrorKind};
///
/// let err = PersistenceError::new(PersistenceErrorKind::CountMismatch {
///     collection: "assistants/a/tests/tema-1".to_string(),
///     expected: 20,
///     actual: 17,
/// });
/// assert!(format!("{}", err).contains("exactly 20"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Persistence Error: {} at line {} in {}", kind, line, file)]
pub struct PersistenceError {
    /// The kind of error that occurred
    pub kind: PersistenceErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl PersistenceError {
    /// Create a new PersistenceError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: PersistenceErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
