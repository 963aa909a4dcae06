//! Temario: syllabus content generation for exam-preparation assistants.
//!
//! For every topic of an assistant's syllabus Temario asks a language model
//! for a long-form body, validates it, persists it together with a fixed-size
//! quiz and a de-duplicated flashcard set, and publishes a PDF with graceful
//! degradation when the document is too large or the render endpoint fails.
//! A repair sweep finds and fixes topics left broken by earlier runs.
//!
//! # Architecture
//!
//! Temario is organized as a workspace with focused crates:
//!
//! - `temario_error` - Error types
//! - `temario_core` - Topic records, questions, flashcards, profiles
//! - `temario_interface` - Collaborator traits (generator, stores, renderer, probe)
//! - `temario_policy` - Configuration and retry policy
//! - `temario_storage` - Object storage backends and URL probing
//! - `temario_database` - Document stores, persistence gateway, generation lease
//! - `temario_models` - Chat-completion generator and HTTP PDF renderer
//! - `temario_pipeline` - Validator, PDF pipeline, orchestrator, repair sweeper
//!
//! This crate (`temario`) re-exports everything and wires it together in
//! [`Services`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod observability;
mod services;

pub use observability::{ObservabilityConfig, init_observability};
pub use services::{PurgeOutcome, Services, TopicStatusRow};

pub use temario_core::*;
pub use temario_database::*;
pub use temario_error::*;
pub use temario_interface::*;
pub use temario_models::*;
pub use temario_pipeline::*;
pub use temario_policy::*;
pub use temario_storage::*;
