//! Sequential batch runs over a list of topics.

use crate::run_handle::RunHandle;
use crate::topic::{TopicOutcome, TopicPipeline};
use temario_core::TopicRequest;
use temario_database::GenerationLease;
use temario_error::TemarioResult;
use temario_policy::{Assistant, RunPolicy};
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

/// Generates a batch of topics one at a time.
///
/// Each topic runs the full [`TopicPipeline`] chain. A failed topic is
/// recorded and the batch moves on, so progress always reaches 100% unless
/// the run is cancelled.
#[derive(Debug, Clone)]
pub struct BatchOrchestrator {
    topics: TopicPipeline,
    policy: RunPolicy,
    lease: Option<GenerationLease>,
}

impl BatchOrchestrator {
    /// Create an orchestrator without a generation lease.
    pub fn new(topics: TopicPipeline, policy: RunPolicy) -> Self {
        Self {
            topics,
            policy,
            lease: None,
        }
    }

    /// Hold `lease` on the assistant for the duration of every run.
    pub fn with_lease(mut self, lease: GenerationLease) -> Self {
        self.lease = Some(lease);
        self
    }

    /// Create a handle for a batch without starting it.
    pub fn handle_for(&self, requests: &[TopicRequest]) -> RunHandle {
        RunHandle::new(requests, &self.policy)
    }

    /// Start a batch on the runtime and return its handle.
    pub fn spawn(
        &self,
        assistant: Assistant,
        requests: Vec<TopicRequest>,
    ) -> (RunHandle, JoinHandle<TemarioResult<Vec<TopicOutcome>>>) {
        let handle = self.handle_for(&requests);
        let orchestrator = self.clone();
        let task_handle = handle.clone();
        let task = tokio::spawn(async move {
            orchestrator
                .run(&assistant, &requests, &task_handle)
                .await
        });
        (handle, task)
    }

    /// Run a batch to completion under `handle`.
    ///
    /// Only a lease conflict fails the whole run; topic failures are part of
    /// the returned outcomes. The run waits while paused before each topic
    /// and stops scheduling once cancelled.
    #[instrument(skip(self, assistant, requests, handle), fields(assistant = %assistant.id, topics = requests.len()))]
    pub async fn run(
        &self,
        assistant: &Assistant,
        requests: &[TopicRequest],
        handle: &RunHandle,
    ) -> TemarioResult<Vec<TopicOutcome>> {
        if let Some(lease) = &self.lease {
            if let Err(err) = lease.acquire(&assistant.id).await {
                handle.log(format!("Could not start: {}", err)).await;
                handle.finish(0, 0).await;
                return Err(err);
            }
        }

        handle
            .log(format!(
                "Generating {} topics for {}",
                requests.len(),
                assistant.name
            ))
            .await;

        let mut outcomes = Vec::with_capacity(requests.len());
        for (index, request) in requests.iter().enumerate() {
            handle.wait_while_paused().await;
            if handle.is_cancelled() {
                info!(remaining = requests.len() - index, "Run cancelled before next topic");
                break;
            }

            handle.topic_started(index, request).await;
            let outcome = self.topics.run(assistant, request, handle).await;
            handle.topic_finished(index, &outcome).await;
            outcomes.push(outcome);
        }

        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        let failed = outcomes.len() - succeeded;
        handle.finish(succeeded, failed).await;
        info!(succeeded, failed, "Batch finished");

        if let Some(lease) = &self.lease
            && let Err(err) = lease.release(&assistant.id).await
        {
            warn!(error = %err, "Could not release generation lease");
        }

        Ok(outcomes)
    }
}
