//! Progress tracking and observation.
//!
//! Phase workflows drive a [`ProgressTracker`] through named stages. Every
//! update is translated into a public [`WorkflowProgress`] snapshot by
//! [`ProgressTracker::snapshot`] and published on a [`ProgressChannel`], which
//! fans out to typed listeners and to any number of broadcast subscribers.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;

use super::context::CancelFlag;
use super::error::WorkflowError;
use super::types::WorkflowProgress;
use crate::observability::OperationTimer;

const CHANNEL_CAPACITY: usize = 64;

/// A named stage with its fixed progress checkpoint
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stage {
    pub name: &'static str,
    pub checkpoint: f64,
}

impl Stage {
    pub const fn new(name: &'static str, checkpoint: f64) -> Self {
        Self { name, checkpoint }
    }
}

pub const INITIALIZATION: Stage = Stage::new("initialization", 0.0);
pub const COMPLETION: Stage = Stage::new("completion", 100.0);

pub type ProgressCallback = Arc<dyn Fn(&WorkflowProgress) + Send + Sync>;

struct ChannelInner {
    sender: broadcast::Sender<WorkflowProgress>,
    listeners: RwLock<Vec<ProgressCallback>>,
    latest: RwLock<WorkflowProgress>,
}

/// Fan-out point for progress snapshots
#[derive(Clone)]
pub struct ProgressChannel {
    inner: Arc<ChannelInner>,
}

impl ProgressChannel {
    pub fn new(initial: WorkflowProgress) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(ChannelInner {
                sender,
                listeners: RwLock::new(Vec::new()),
                latest: RwLock::new(initial),
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowProgress> {
        self.inner.sender.subscribe()
    }

    pub fn add_listener(&self, listener: ProgressCallback) {
        self.inner.listeners.write().push(listener);
    }

    pub fn latest(&self) -> WorkflowProgress {
        self.inner.latest.read().clone()
    }

    pub fn publish(&self, snapshot: WorkflowProgress) {
        *self.inner.latest.write() = snapshot.clone();

        // Listeners may register further listeners, so don't hold the lock
        let listeners: Vec<ProgressCallback> = self.inner.listeners.read().clone();
        for listener in &listeners {
            listener(&snapshot);
        }

        // No subscribers is fine
        let _ = self.inner.sender.send(snapshot);
    }
}

/// Internal progress state owned by a workflow handle
pub struct ProgressTracker {
    workflow_id: String,
    stage: &'static str,
    step: String,
    percent: f64,
    message: String,
    started_at: DateTime<Utc>,
    clock: Instant,
    errors: Vec<String>,
    warnings: Vec<String>,
    cancel: CancelFlag,
    channel: ProgressChannel,
    stage_timer: Option<OperationTimer>,
}

impl ProgressTracker {
    pub fn new(workflow_id: &str, cancel: CancelFlag, channel: ProgressChannel) -> Self {
        Self {
            workflow_id: workflow_id.to_string(),
            stage: INITIALIZATION.name,
            step: String::new(),
            percent: 0.0,
            message: String::new(),
            started_at: Utc::now(),
            clock: Instant::now(),
            errors: Vec::new(),
            warnings: Vec::new(),
            cancel,
            channel,
            stage_timer: None,
        }
    }

    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    /// Enter the next stage. Fails if the workflow was cancelled, so a
    /// cancelled workflow never starts another stage.
    pub fn enter(&mut self, stage: Stage, message: impl Into<String>) -> Result<(), WorkflowError> {
        if self.cancel.is_cancelled() {
            return Err(WorkflowError::Cancelled {
                id: self.workflow_id.clone(),
                phase: stage.name.to_string(),
            });
        }

        self.finish_stage();
        self.stage_timer = Some(OperationTimer::new(stage.name));

        self.stage = stage.name;
        self.step = stage.name.to_string();
        self.percent = self.percent.max(stage.checkpoint);
        self.message = message.into();
        tracing::debug!(
            workflow_id = %self.workflow_id,
            stage = stage.name,
            percent = self.percent,
            "Entering stage"
        );
        self.publish();
        Ok(())
    }

    /// Log the duration of the stage currently open, if any
    pub fn finish_stage(&mut self) -> Option<u64> {
        self.stage_timer.take().map(OperationTimer::finish)
    }

    pub fn step(&mut self, step: impl Into<String>, message: impl Into<String>) {
        self.step = step.into();
        self.message = message.into();
        self.publish();
    }

    pub fn warn(&mut self, warning: impl Into<String>) {
        let warning = warning.into();
        tracing::warn!(workflow_id = %self.workflow_id, stage = self.stage, "{}", warning);
        self.warnings.push(warning);
        self.publish();
    }

    pub fn error(&mut self, error: impl Into<String>) {
        let error = error.into();
        self.errors.push(error.clone());
        self.message = error;
        self.publish();
    }

    pub fn stage(&self) -> &'static str {
        self.stage
    }

    pub fn percent(&self) -> f64 {
        self.percent
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Translate internal state into the public snapshot
    pub fn snapshot(&self) -> WorkflowProgress {
        WorkflowProgress {
            stage: self.stage.to_string(),
            step: self.step.clone(),
            percent_complete: self.percent,
            message: self.message.clone(),
            start_time: self.started_at,
            elapsed_ms: self.clock.elapsed().as_millis() as u64,
            errors: self.errors.clone(),
            warnings: self.warnings.clone(),
        }
    }

    fn publish(&self) {
        self.channel.publish(self.snapshot());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    const HALFWAY: Stage = Stage::new("halfway", 50.0);
    const EARLY: Stage = Stage::new("early", 20.0);

    fn tracker() -> (ProgressTracker, ProgressChannel, CancelFlag) {
        let channel = ProgressChannel::new(WorkflowProgress::new(INITIALIZATION.name));
        let cancel = CancelFlag::new();
        let tracker = ProgressTracker::new("workflow_test", cancel.clone(), channel.clone());
        (tracker, channel, cancel)
    }

    #[test]
    fn test_percent_never_decreases() {
        let (mut tracker, _, _) = tracker();
        tracker.enter(HALFWAY, "half").unwrap();
        tracker.enter(EARLY, "out of order").unwrap();

        assert_eq!(tracker.percent(), 50.0);
        assert_eq!(tracker.stage(), "early");
    }

    #[test]
    fn test_listeners_receive_every_snapshot() {
        let (mut tracker, channel, _) = tracker();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        channel.add_listener(Arc::new(move |p: &WorkflowProgress| {
            sink.lock().push(p.percent_complete);
        }));

        tracker.enter(INITIALIZATION, "start").unwrap();
        tracker.warn("minor");
        tracker.enter(COMPLETION, "done").unwrap();

        assert_eq!(*seen.lock(), vec![0.0, 0.0, 100.0]);
        assert_eq!(channel.latest().warnings, vec!["minor".to_string()]);
    }

    #[tokio::test]
    async fn test_subscribers_receive_snapshots() {
        let (mut tracker, channel, _) = tracker();
        let mut rx = channel.subscribe();

        tracker.enter(HALFWAY, "half").unwrap();

        let snapshot = rx.recv().await.unwrap();
        assert_eq!(snapshot.stage, "halfway");
        assert_eq!(snapshot.percent_complete, 50.0);
    }

    #[test]
    fn test_cancelled_tracker_refuses_new_stage() {
        let (mut tracker, _, cancel) = tracker();
        tracker.enter(EARLY, "early").unwrap();
        cancel.cancel();

        let err = tracker.enter(HALFWAY, "half").unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(err.phase_name(), Some("halfway"));
        assert_eq!(tracker.percent(), 20.0);
    }

    #[test]
    fn test_open_stage_timer_is_finished_once() {
        let (mut tracker, _, _) = tracker();
        assert_eq!(tracker.finish_stage(), None);

        tracker.enter(EARLY, "early").unwrap();
        tracker.enter(COMPLETION, "done").unwrap();
        assert!(tracker.finish_stage().is_some());
        assert_eq!(tracker.finish_stage(), None);
    }
}
