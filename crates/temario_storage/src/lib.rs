//! Object storage backends and URL probing for Temario.
//!
//! Rendered PDFs are uploaded under hierarchical keys
//! (`assistants/{id}/syllabus/{slug}/v{n}.pdf`) and served from a public URL.
//! The repair sweeper later probes those URLs to find broken artifacts.
//!
//! # Example
//!
//! ```rust
//! use temario_interface::ObjectStorage;
//! use temario_storage::FileSystemObjectStorage;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let storage = FileSystemObjectStorage::new(
//!     "/tmp/temario-objects",
//!     Some("https://cdn.example".to_string()),
//! )?;
//! let stored = storage
//!     .upload("assistants/demo/syllabus/tema-1/v1.pdf", b"%PDF-1.7", "application/pdf")
//!     .await?;
//! assert_eq!(stored.url, "https://cdn.example/assistants/demo/syllabus/tema-1/v1.pdf");
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod filesystem;
mod keys;
mod memory;
mod probe;

pub use filesystem::FileSystemObjectStorage;
pub use keys::{content_hash, validate_key};
pub use memory::InMemoryObjectStorage;
pub use probe::HttpUrlProbe;
