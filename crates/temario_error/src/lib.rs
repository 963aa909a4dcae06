//! Error types for the Temario syllabus generation pipeline.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! Stage errors convert into [`TemarioError`] with `?`:
//!
//! ```
//! use temario_error::{RenderError, RenderErrorKind, TemarioResult};
//!
//! fn render() -> TemarioResult<Vec<u8>> {
//!     Err(RenderError::new(RenderErrorKind::Rejected("template crashed".to_string())))?
//! }
//!
//! assert!(render().is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod generation;
mod http;
mod json;
mod persistence;
mod render;
mod retry;
mod storage;
mod upload;
mod validation;

pub use config::ConfigError;
pub use error::{TemarioError, TemarioErrorKind, TemarioResult};
pub use generation::{GenerationError, GenerationErrorKind};
pub use http::HttpError;
pub use json::JsonError;
pub use persistence::{PersistenceError, PersistenceErrorKind};
pub use render::{RenderError, RenderErrorKind};
pub use retry::RetryableError;
pub use storage::{StorageError, StorageErrorKind};
pub use upload::{UploadError, UploadErrorKind};
pub use validation::{ValidationError, ValidationErrorKind};
