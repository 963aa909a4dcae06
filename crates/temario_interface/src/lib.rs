//! Trait definitions for the Temario syllabus generation pipeline.
//!
//! The pipeline consumes five external capabilities: a content generator, a
//! document store, object storage, a PDF render endpoint and a URL probe.
//! Each is a trait here so the orchestration logic can be exercised against
//! in-memory or scripted implementations.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod traits;
mod types;

pub use traits::{ContentGenerator, DocumentStore, ObjectStorage, PdfRenderer, UrlProbe};
pub use types::{
    Compression, ProbeOutcome, RenderRequest, StoredDocument, StoredObject, WriteMode,
    merge_documents,
};
