//! Syllabus generation pipeline for Temario.
//!
//! The pieces, bottom-up:
//!
//! - [`Validator`] checks generated bodies and question sets against a
//!   content profile.
//! - [`PdfPipeline`] renders, reduces and uploads a topic's PDF and records
//!   the outcome without ever failing the topic.
//! - [`TopicPipeline`] runs the per-topic chain: generate, validate, persist
//!   the topic, derive and persist tests and flashcards, then the PDF.
//! - [`BatchOrchestrator`] runs the chain over a list of topics under a
//!   [`RunHandle`] that can pause, resume, cancel and be observed.
//! - [`RepairSweeper`] verifies every stored topic and repairs what is
//!   broken.
//!
//! # Example
//!
//! ```no_run
//! # async fn example(orchestrator: temario_pipeline::BatchOrchestrator, assistant: temario_policy::Assistant) {
//! use temario_core::TopicRequest;
//! use temario_pipeline::RunEvent;
//! use tokio_stream::StreamExt;
//!
//! let requests = TopicRequest::from_titles(["La Constitución Española de 1978"]);
//! let (handle, task) = orchestrator.spawn(assistant, requests);
//! let mut events = Box::pin(handle.subscribe());
//! while let Some(event) = events.next().await {
//!     println!("{:?}", event);
//!     if matches!(event, RunEvent::Finished { .. }) {
//!         break;
//!     }
//! }
//! let outcomes = task.await;
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod events;
mod orchestrator;
mod pdf;
mod reduce;
mod run_handle;
mod sweeper;
mod topic;
mod validator;

pub use events::{RunEvent, StageHook, TopicStage, TracingHook};
pub use orchestrator::BatchOrchestrator;
pub use pdf::{PdfOutcome, PdfPipeline};
pub use reduce::{TRUNCATION_NOTICE, reduce_for_pdf};
pub use run_handle::{RunHandle, RunSnapshot, TopicProgress, TopicRunStatus};
pub use sweeper::{Diagnosis, RepairAction, RepairResult, RepairSummary, RepairSweeper};
pub use topic::{TopicOutcome, TopicPipeline, TopicResult};
pub use validator::{Validator, heading_marker, present_markers};
