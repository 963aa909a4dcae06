//! Verification and repair of every topic of an assistant.

use crate::events::TracingHook;
use crate::pdf::PdfOutcome;
use crate::topic::{TopicPipeline, TopicResult};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use temario_core::{TopicRecord, TopicRequest, TopicStatus};
use temario_database::GenerationLease;
use temario_error::TemarioResult;
use temario_interface::{ProbeOutcome, UrlProbe};
use temario_policy::{Assistant, ProbePolicy, SweepPolicy};
use tracing::{debug, error, info, instrument, warn};

/// What the sweep did for one topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RepairAction {
    /// Already healthy, nothing written
    Verified,
    /// New PDF uploaded
    Repaired,
    /// New PDF uploaded from reduced content
    RepairedReduced,
    /// Published without PDF because it is too large
    ContentOnly,
    /// Text is fine but the PDF could not be produced
    Partial,
    /// Regeneration failed or timed out
    Failed,
}

impl RepairAction {
    /// The topic ends the sweep in a servable state.
    pub fn is_success(&self) -> bool {
        !matches!(self, RepairAction::Partial | RepairAction::Failed)
    }
}

impl From<&PdfOutcome> for RepairAction {
    fn from(outcome: &PdfOutcome) -> Self {
        match outcome {
            PdfOutcome::Uploaded { reduced: false, .. } => RepairAction::Repaired,
            PdfOutcome::Uploaded { reduced: true, .. } => RepairAction::RepairedReduced,
            PdfOutcome::ContentOnly => RepairAction::ContentOnly,
            PdfOutcome::Partial { .. } => RepairAction::Partial,
        }
    }
}

/// Per-topic line of a sweep report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepairResult {
    /// Topic slug
    pub slug: String,
    /// Topic title
    pub title: String,
    /// Whether the topic ended servable
    pub success: bool,
    /// What was done
    pub action: RepairAction,
    /// Failure message for `partial` and `failed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RepairResult {
    fn new(record: &TopicRecord, action: RepairAction, error: Option<String>) -> Self {
        Self {
            slug: record.slug.clone(),
            title: record.title.clone(),
            success: action.is_success(),
            action,
            error,
        }
    }
}

/// Counts per action over a sweep.
///
/// # Examples
///
/// ```
/// use temario_pipeline::{RepairAction, RepairSummary};
///
/// let summary = RepairSummary::default();
/// assert_eq!(summary.count(RepairAction::Verified), 0);
/// assert!(summary.all_succeeded());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepairSummary {
    /// Topics examined
    pub total: usize,
    /// Topics per action
    pub by_action: BTreeMap<RepairAction, usize>,
}

impl RepairSummary {
    /// Tally a sweep report.
    pub fn from_results(results: &[RepairResult]) -> Self {
        let mut by_action = BTreeMap::new();
        for result in results {
            *by_action.entry(result.action).or_insert(0) += 1;
        }
        Self {
            total: results.len(),
            by_action,
        }
    }

    /// Topics that ended with `action`.
    pub fn count(&self, action: RepairAction) -> usize {
        self.by_action.get(&action).copied().unwrap_or(0)
    }

    /// No topic ended partial or failed.
    pub fn all_succeeded(&self) -> bool {
        self.by_action
            .iter()
            .all(|(action, count)| action.is_success() || *count == 0)
    }
}

/// Health of a stored topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnosis {
    /// Published text with a reachable PDF
    Healthy,
    /// Published text, PDF skipped on purpose
    ContentOnly,
    /// Text is fine, the PDF must be produced again
    NeedsPdf(String),
    /// Text missing or not published; the whole chain must run
    NeedsContent(String),
}

/// Walks every topic of an assistant and fixes what is broken.
///
/// Healthy and deliberately content-only topics are left untouched, so a
/// second sweep over a repaired syllabus performs no writes. Each topic
/// runs under a hard timeout; a timed-out topic is reported as failed and
/// the sweep continues.
#[derive(Clone)]
pub struct RepairSweeper {
    topics: TopicPipeline,
    probe: Arc<dyn UrlProbe>,
    probe_timeout: Duration,
    per_topic_timeout: Duration,
    lease: Option<GenerationLease>,
}

impl std::fmt::Debug for RepairSweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepairSweeper")
            .field("topics", &self.topics)
            .field("probe_timeout", &self.probe_timeout)
            .field("per_topic_timeout", &self.per_topic_timeout)
            .field("lease", &self.lease)
            .finish()
    }
}

impl RepairSweeper {
    /// Create a sweeper.
    pub fn new(
        topics: TopicPipeline,
        probe: Arc<dyn UrlProbe>,
        probe_policy: &ProbePolicy,
        sweep_policy: &SweepPolicy,
    ) -> Self {
        Self {
            topics,
            probe,
            probe_timeout: probe_policy.timeout(),
            per_topic_timeout: sweep_policy.per_topic_timeout(),
            lease: None,
        }
    }

    /// Hold `lease` on the assistant while sweeping.
    pub fn with_lease(mut self, lease: GenerationLease) -> Self {
        self.lease = Some(lease);
        self
    }

    /// Classify one stored topic.
    pub async fn diagnose(&self, record: &TopicRecord) -> Diagnosis {
        if record.status != TopicStatus::Published {
            return Diagnosis::NeedsContent(format!("status is {}", record.status));
        }
        if !record.has_content() {
            return Diagnosis::NeedsContent("content missing".to_string());
        }
        if record.is_content_only() {
            return Diagnosis::ContentOnly;
        }
        if record.pdf_generation_failed {
            let reason = record
                .last_pdf_error
                .clone()
                .unwrap_or_else(|| "last PDF attempt failed".to_string());
            return Diagnosis::NeedsPdf(reason);
        }
        let Some(url) = record.pdf_url.as_deref() else {
            return Diagnosis::NeedsPdf("no PDF URL".to_string());
        };
        match self.probe.probe(url, self.probe_timeout).await {
            ProbeOutcome::Reachable => Diagnosis::Healthy,
            ProbeOutcome::Unreachable(reason) => {
                Diagnosis::NeedsPdf(format!("PDF unreachable: {}", reason))
            }
        }
    }

    /// Verify every topic of `assistant` and repair the broken ones.
    ///
    /// Per-topic failures are reported in the results; only listing the
    /// topics or taking the lease can fail the sweep.
    #[instrument(skip(self, assistant), fields(assistant = %assistant.id))]
    pub async fn repair_all(&self, assistant: &Assistant) -> TemarioResult<Vec<RepairResult>> {
        if let Some(lease) = &self.lease {
            lease.acquire(&assistant.id).await?;
        }

        let outcome = self.sweep(assistant).await;

        if let Some(lease) = &self.lease
            && let Err(err) = lease.release(&assistant.id).await
        {
            warn!(error = %err, "Could not release generation lease");
        }

        let results = outcome?;
        let summary = RepairSummary::from_results(&results);
        info!(
            total = summary.total,
            verified = summary.count(RepairAction::Verified),
            failed = summary.count(RepairAction::Failed),
            partial = summary.count(RepairAction::Partial),
            "Sweep finished"
        );
        Ok(results)
    }

    async fn sweep(&self, assistant: &Assistant) -> TemarioResult<Vec<RepairResult>> {
        let records = self.topics.gateway().list_topics(&assistant.id).await?;
        info!(topics = records.len(), "Sweeping topics");

        let mut results = Vec::with_capacity(records.len());
        for record in &records {
            let result = match tokio::time::timeout(
                self.per_topic_timeout,
                self.repair_topic(assistant, record),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => {
                    let message = format!(
                        "repair timed out after {}s",
                        self.per_topic_timeout.as_secs()
                    );
                    error!(slug = %record.slug, "{}", message);
                    RepairResult::new(record, RepairAction::Failed, Some(message))
                }
            };
            results.push(result);
        }
        Ok(results)
    }

    #[instrument(skip(self, assistant, record), fields(slug = %record.slug))]
    async fn repair_topic(&self, assistant: &Assistant, record: &TopicRecord) -> RepairResult {
        match self.diagnose(record).await {
            Diagnosis::Healthy => {
                debug!("Topic verified");
                RepairResult::new(record, RepairAction::Verified, None)
            }
            Diagnosis::ContentOnly => {
                debug!("Topic verified as content only");
                RepairResult::new(record, RepairAction::Verified, None)
            }
            Diagnosis::NeedsPdf(reason) => {
                info!(reason = %reason, "Repairing PDF");
                match self
                    .topics
                    .pdf()
                    .produce(&assistant.id, record, record.version + 1, &TracingHook)
                    .await
                {
                    Ok(outcome) => pdf_result(record, &outcome),
                    Err(err) => RepairResult::new(record, RepairAction::Failed, Some(err.to_string())),
                }
            }
            Diagnosis::NeedsContent(reason) => {
                info!(reason = %reason, "Regenerating topic");
                let request = TopicRequest {
                    title: record.title.clone(),
                    order: record.order,
                };
                let outcome = self
                    .topics
                    .run_for_slug(assistant, &record.slug, &request, &TracingHook)
                    .await;
                match &outcome.result {
                    TopicResult::Published { pdf, .. } => pdf_result(record, pdf),
                    TopicResult::Failed { error, .. } => {
                        RepairResult::new(record, RepairAction::Failed, Some(error.clone()))
                    }
                }
            }
        }
    }
}

fn pdf_result(record: &TopicRecord, outcome: &PdfOutcome) -> RepairResult {
    let error = match outcome {
        PdfOutcome::Partial { error } => Some(error.clone()),
        _ => None,
    };
    RepairResult::new(record, RepairAction::from(outcome), error)
}
