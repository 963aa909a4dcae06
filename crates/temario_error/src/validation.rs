//! Validation error types.

/// Reasons generated content was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum ValidationErrorKind {
    /// The body text broke one or more structural or length rules.
    ///
    /// Every failed rule is listed, so one pass reports everything.
    #[display("Content rejected: {}", _0.join("; "))]
    Content(Vec<String>),
    /// Fewer well-formed questions than the profile requires
    #[display("Test set has {} valid questions, {} required", valid, required)]
    TestSetShort {
        /// Questions that passed structural checks
        valid: usize,
        /// Questions the profile requires
        required: usize,
    },
    /// Fewer unique flashcards than the profile requires
    #[display("Flashcard set has {} unique cards, {} required", unique, required)]
    FlashcardsShort {
        /// Cards left after de-duplication
        unique: usize,
        /// Minimum the profile requires
        required: usize,
    },
    /// The topic title is blank or produces an empty slug
    #[display("Topic title '{}' is not usable", _0)]
    InvalidTitle(String),
}

/// Validation error with source location tracking.
///
/// # Examples
///
/// ```
/// use temario_error::{ValidationError, ValidationErrorKind};
///
/// let err = ValidationError::new(ValidationErrorKind::Content(vec![
///     "missing markers: summary, diagrams".to_string(),
///     "word count 1200 below minimum 2500".to_string(),
/// ]));
/// let text = format!("{}", err);
/// assert!(text.contains("summary, diagrams"));
/// assert!(text.contains("1200"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Validation Error: {} at line {} in {}", kind, line, file)]
pub struct ValidationError {
    /// The kind of error that occurred
    pub kind: ValidationErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl ValidationError {
    /// Create a new ValidationError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ValidationErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
