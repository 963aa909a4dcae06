//! Stages, run events and the stage hook.

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

/// Step of the per-topic chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TopicStage {
    /// Waiting for the content generator
    Generating,
    /// Checking markers and length
    Validating,
    /// Writing the topic record
    SavingTopic,
    /// Deriving and checking quiz questions
    DerivingTests,
    /// Writing the question set
    SavingTests,
    /// Deriving flashcards
    DerivingFlashcards,
    /// Writing the flashcard set
    SavingFlashcards,
    /// Marking the new version published
    Publishing,
    /// Calling the render endpoint
    Rendering,
    /// Shrinking the content after an oversized render
    Reducing,
    /// Uploading the PDF
    Uploading,
}

/// Progress notification published by a running batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    /// A topic left the queue
    TopicStarted {
        /// Position in the batch, from 0
        index: usize,
        /// Topic title
        title: String,
    },
    /// A topic entered a new stage
    StageChanged {
        /// Topic slug
        slug: String,
        /// Stage entered
        stage: TopicStage,
    },
    /// A topic reached a terminal state
    TopicFinished {
        /// Position in the batch, from 0
        index: usize,
        /// Topic title
        title: String,
        /// Whether the topic was published
        success: bool,
        /// Failure message
        error: Option<String>,
    },
    /// Emitted after every finished topic
    Progress {
        /// Topics finished
        completed: usize,
        /// Topics in the batch
        total: usize,
        /// `completed / total` as a percentage
        percent: u8,
    },
    /// A line was appended to the operator log
    Log {
        /// Timestamped line
        line: String,
    },
    /// The run will stop at the next checkpoint
    Paused,
    /// The run continues
    Resumed,
    /// No further topics will be scheduled
    Cancelled,
    /// The batch loop ended
    Finished {
        /// Published topics
        succeeded: usize,
        /// Failed topics
        failed: usize,
        /// Topics never started because of cancellation
        skipped: usize,
    },
}

/// Checkpoint called before each stage of the per-topic chain.
///
/// The batch run uses it to publish stage events and to hold the chain while
/// paused. Implementations must not fail: a hook only observes or waits.
#[async_trait]
pub trait StageHook: Send + Sync {
    /// Called before `stage` starts for topic `slug`.
    async fn enter(&self, slug: &str, stage: TopicStage);
}

/// Hook that only writes a debug event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingHook;

#[async_trait]
impl StageHook for TracingHook {
    async fn enter(&self, slug: &str, stage: TopicStage) {
        debug!(slug, %stage, "Stage started");
    }
}

pub(crate) fn percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((completed.min(total) * 100) / total) as u8
}
