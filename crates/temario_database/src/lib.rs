//! Document persistence for Temario.
//!
//! Topic records, questions and flashcards are JSON documents in a
//! hierarchical store (see [`temario_core::syllabus_collection`] and friends).
//! [`PersistenceGateway`] is the only writer the pipeline uses; it enforces
//! the count invariants of test sets and flashcard sets at write time.
//!
//! Writes are last-writer-wins per document with no cross-document
//! transaction. A failure between writing a topic and its children leaves
//! the earlier documents in place; the topic is then marked `error` and the
//! next regeneration or repair overwrites everything.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod filesystem;
mod gateway;
mod lease;
mod memory;

pub use filesystem::FileSystemDocumentStore;
pub use gateway::{PersistenceGateway, PurgeReport};
pub use lease::{GenerationLease, LeaseRecord};
pub use memory::InMemoryDocumentStore;
