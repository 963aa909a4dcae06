//! Control and observation surface of a running batch.

use crate::events::{RunEvent, StageHook, TopicStage, percent};
use crate::topic::TopicOutcome;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use temario_core::TopicRequest;
use temario_policy::RunPolicy;
use tokio::sync::{RwLock, broadcast, watch};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Control {
    paused: bool,
    cancelled: bool,
}

/// Where one topic of the batch stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, strum::Display)]
#[serde(tag = "state", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TopicRunStatus {
    /// Not started yet
    Pending,
    /// In the per-topic chain
    Running {
        /// Stage entered last
        stage: Option<TopicStage>,
    },
    /// Text published (the PDF may still have degraded)
    Published,
    /// A stage failed
    Failed {
        /// Failure message
        error: String,
    },
    /// Never started because the run was cancelled
    Skipped,
}

/// One row of the run snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicProgress {
    /// Topic title
    pub title: String,
    /// Current status
    pub status: TopicRunStatus,
}

/// Point-in-time copy of the run state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSnapshot {
    /// Per-topic status in batch order
    pub topics: Vec<TopicProgress>,
    /// Most recent operator log lines, oldest first
    pub log: Vec<String>,
    /// Topics finished
    pub completed: usize,
    /// Topics in the batch
    pub total: usize,
    /// `completed / total` as a percentage
    pub percent: u8,
    /// Pause requested
    pub paused: bool,
    /// Cancel requested
    pub cancelled: bool,
    /// The batch loop has ended
    pub finished: bool,
}

#[derive(Debug)]
struct RunState {
    topics: Vec<TopicProgress>,
    log: VecDeque<String>,
    current: Option<usize>,
    completed: usize,
    finished: bool,
}

#[derive(Debug)]
struct RunInner {
    control: watch::Sender<Control>,
    events: broadcast::Sender<RunEvent>,
    state: RwLock<RunState>,
    log_capacity: usize,
}

/// Handle to a batch run.
///
/// Cloning is cheap; every clone controls and observes the same run. Pause
/// takes effect at the next checkpoint (between topics or between stages of
/// a topic) and never interrupts a call in flight. Cancel stops scheduling
/// after the current topic.
///
/// # Examples
///
/// ```
/// # let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
/// # rt.block_on(async {
/// use temario_core::TopicRequest;
/// use temario_pipeline::RunHandle;
/// use temario_policy::RunPolicy;
///
/// let handle = RunHandle::new(&TopicRequest::from_titles(["Tema 1"]), &RunPolicy::default());
/// handle.pause().await;
/// assert!(handle.snapshot().await.paused);
/// handle.resume().await;
/// assert!(!handle.is_paused());
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct RunHandle {
    inner: Arc<RunInner>,
}

impl RunHandle {
    /// Create the handle for a batch of topics, all pending.
    pub fn new(requests: &[TopicRequest], policy: &RunPolicy) -> Self {
        let (control, _) = watch::channel(Control::default());
        let (events, _) = broadcast::channel(policy.event_buffer.max(1));
        let topics = requests
            .iter()
            .map(|request| TopicProgress {
                title: request.title.clone(),
                status: TopicRunStatus::Pending,
            })
            .collect();

        Self {
            inner: Arc::new(RunInner {
                control,
                events,
                state: RwLock::new(RunState {
                    topics,
                    log: VecDeque::new(),
                    current: None,
                    completed: 0,
                    finished: false,
                }),
                log_capacity: policy.log_capacity.max(1),
            }),
        }
    }

    /// Ask the run to stop at the next checkpoint.
    pub async fn pause(&self) {
        let changed = self.inner.control.send_if_modified(|control| {
            let changed = !control.paused && !control.cancelled;
            control.paused = true;
            changed
        });
        if changed {
            info!("Run paused");
            self.log("Run paused").await;
            self.emit(RunEvent::Paused);
        }
    }

    /// Let a paused run continue.
    pub async fn resume(&self) {
        let changed = self.inner.control.send_if_modified(|control| {
            let changed = control.paused;
            control.paused = false;
            changed
        });
        if changed {
            info!("Run resumed");
            self.log("Run resumed").await;
            self.emit(RunEvent::Resumed);
        }
    }

    /// Stop scheduling topics after the current one. Also releases a pause.
    pub async fn cancel(&self) {
        let changed = self.inner.control.send_if_modified(|control| {
            let changed = !control.cancelled;
            control.cancelled = true;
            control.paused = false;
            changed
        });
        if changed {
            warn!("Run cancelled");
            self.log("Run cancelled; stopping after the current topic")
                .await;
            self.emit(RunEvent::Cancelled);
        }
    }

    /// Pause requested and not yet resumed.
    pub fn is_paused(&self) -> bool {
        self.inner.control.borrow().paused
    }

    /// Cancel requested.
    pub fn is_cancelled(&self) -> bool {
        self.inner.control.borrow().cancelled
    }

    /// Return once the run is neither paused nor blocked, or was cancelled.
    pub async fn wait_while_paused(&self) {
        let mut receiver = self.inner.control.subscribe();
        // The sender lives as long as `self`, so the wait cannot fail.
        let _ = receiver
            .wait_for(|control| !control.paused || control.cancelled)
            .await;
    }

    /// Stream of events published from now on.
    ///
    /// A subscriber that falls more than the configured buffer behind skips
    /// the missed events.
    pub fn subscribe(&self) -> impl Stream<Item = RunEvent> + Send + 'static {
        BroadcastStream::new(self.inner.events.subscribe()).filter_map(Result::ok)
    }

    /// Copy of the current statuses, log and progress.
    pub async fn snapshot(&self) -> RunSnapshot {
        let control = *self.inner.control.borrow();
        let state = self.inner.state.read().await;
        let total = state.topics.len();
        RunSnapshot {
            topics: state.topics.clone(),
            log: state.log.iter().cloned().collect(),
            completed: state.completed,
            total,
            percent: percent(state.completed, total),
            paused: control.paused,
            cancelled: control.cancelled,
            finished: state.finished,
        }
    }

    /// Append a timestamped line to the operator log.
    pub async fn log(&self, message: impl AsRef<str>) {
        let line = format!(
            "[{}] {}",
            chrono::Local::now().format("%H:%M:%S"),
            message.as_ref()
        );
        {
            let mut state = self.inner.state.write().await;
            while state.log.len() >= self.inner.log_capacity {
                state.log.pop_front();
            }
            state.log.push_back(line.clone());
        }
        self.emit(RunEvent::Log { line });
    }

    pub(crate) async fn topic_started(&self, index: usize, request: &TopicRequest) {
        {
            let mut state = self.inner.state.write().await;
            state.current = Some(index);
            if let Some(topic) = state.topics.get_mut(index) {
                topic.status = TopicRunStatus::Running { stage: None };
            }
        }
        self.log(format!("Starting topic '{}'", request.title)).await;
        self.emit(RunEvent::TopicStarted {
            index,
            title: request.title.clone(),
        });
    }

    pub(crate) async fn topic_finished(&self, index: usize, outcome: &TopicOutcome) {
        let (completed, total) = {
            let mut state = self.inner.state.write().await;
            state.current = None;
            if let Some(topic) = state.topics.get_mut(index) {
                topic.status = match outcome.error() {
                    None => TopicRunStatus::Published,
                    Some(error) => TopicRunStatus::Failed {
                        error: error.to_string(),
                    },
                };
            }
            state.completed += 1;
            (state.completed, state.topics.len())
        };

        match outcome.error() {
            None => {
                self.log(format!("Topic '{}' published ({})", outcome.title, outcome.summary()))
                    .await
            }
            Some(error) => {
                self.log(format!("Topic '{}' failed: {}", outcome.title, error))
                    .await
            }
        }
        self.emit(RunEvent::TopicFinished {
            index,
            title: outcome.title.clone(),
            success: outcome.is_success(),
            error: outcome.error().map(str::to_string),
        });
        self.emit(RunEvent::Progress {
            completed,
            total,
            percent: percent(completed, total),
        });
    }

    pub(crate) async fn finish(&self, succeeded: usize, failed: usize) {
        let skipped = {
            let mut state = self.inner.state.write().await;
            state.finished = true;
            let mut skipped = 0;
            for topic in state
                .topics
                .iter_mut()
                .filter(|topic| topic.status == TopicRunStatus::Pending)
            {
                topic.status = TopicRunStatus::Skipped;
                skipped += 1;
            }
            skipped
        };
        self.log(format!(
            "Run finished: {} published, {} failed, {} skipped",
            succeeded, failed, skipped
        ))
        .await;
        self.emit(RunEvent::Finished {
            succeeded,
            failed,
            skipped,
        });
    }

    fn emit(&self, event: RunEvent) {
        // No subscribers is not an error.
        let _ = self.inner.events.send(event);
    }
}

#[async_trait]
impl StageHook for RunHandle {
    async fn enter(&self, slug: &str, stage: TopicStage) {
        {
            let mut state = self.inner.state.write().await;
            if let Some(index) = state.current
                && let Some(topic) = state.topics.get_mut(index)
            {
                topic.status = TopicRunStatus::Running { stage: Some(stage) };
            }
        }
        self.emit(RunEvent::StageChanged {
            slug: slug.to_string(),
            stage,
        });

        if self.is_paused() {
            self.log(format!("Paused before {} of '{}'", stage, slug))
                .await;
            self.wait_while_paused().await;
        }
    }
}
