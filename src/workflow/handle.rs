//! Uniform public adapter over every phase workflow.
//!
//! [`Workflow`] owns one [`PhaseWorkflow`] together with its progress
//! tracker. It stamps the shared registry before and after the phase state
//! machine runs, so callers never depend on kind-specific internals.

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;
use tracing::{info, Instrument};

use super::context::{CancelFlag, ExecutionContext};
use super::error::WorkflowError;
use super::progress::{ProgressChannel, ProgressTracker, INITIALIZATION};
use super::registry::WorkflowRegistry;
use super::types::{RunSummary, WorkflowKind, WorkflowProgress, WorkflowState, WorkflowStatus};
use crate::telemetry::create_workflow_span;

/// A linear state machine over named stages
#[async_trait]
pub trait PhaseWorkflow: Send {
    type Output: Clone + fmt::Debug + Serialize + Send + Sync;

    fn kind(&self) -> WorkflowKind;

    /// Path (or other target) recorded in the registry metadata
    fn target(&self) -> String;

    async fn run(
        &mut self,
        ctx: &ExecutionContext,
        tracker: &mut ProgressTracker,
    ) -> Result<(), WorkflowError>;

    /// Build the result from whatever the run produced, success or not
    fn output(&self, summary: RunSummary) -> Self::Output;
}

pub struct Workflow<P: PhaseWorkflow> {
    id: String,
    kind: WorkflowKind,
    phase: P,
    tracker: ProgressTracker,
    channel: ProgressChannel,
    registry: Arc<WorkflowRegistry>,
    last_result: Option<P::Output>,
}

impl<P: PhaseWorkflow> Workflow<P> {
    pub(crate) fn new(
        id: String,
        phase: P,
        registry: Arc<WorkflowRegistry>,
        cancel: CancelFlag,
    ) -> Self {
        let channel = ProgressChannel::new(WorkflowProgress::new(INITIALIZATION.name));

        // Keep the registry entry in step with progress
        let progress_registry = registry.clone();
        let progress_id = id.clone();
        channel.add_listener(Arc::new(move |progress: &WorkflowProgress| {
            progress_registry.record_progress(&progress_id, progress);
        }));

        Self {
            kind: phase.kind(),
            tracker: ProgressTracker::new(&id, cancel, channel.clone()),
            id,
            phase,
            channel,
            registry,
            last_result: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> WorkflowKind {
        self.kind
    }

    pub fn progress(&self) -> WorkflowProgress {
        self.channel.latest()
    }

    /// Register a listener invoked synchronously on every progress update.
    /// It runs on the task driving `execute` and must not block.
    pub fn set_progress_callback<F>(&self, callback: F)
    where
        F: Fn(&WorkflowProgress) + Send + Sync + 'static,
    {
        self.channel.add_listener(Arc::new(callback));
    }

    /// Stream of progress snapshots; any number of subscribers
    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowProgress> {
        self.channel.subscribe()
    }

    pub fn status(&self) -> Result<WorkflowStatus, WorkflowError> {
        self.registry.status(&self.id)
    }

    pub fn cancel(&self) -> Result<(), WorkflowError> {
        self.registry.cancel(&self.id).map(|_| ())
    }

    /// Result of the most recent execute call, including failed runs
    pub fn last_result(&self) -> Option<&P::Output> {
        self.last_result.as_ref()
    }

    pub fn phase(&self) -> &P {
        &self.phase
    }

    /// Run the phase state machine on the caller's task
    pub async fn execute(&mut self, ctx: &ExecutionContext) -> Result<P::Output, WorkflowError> {
        self.registry.mark_running(&self.id)?;

        let span = create_workflow_span(self.kind.as_str(), &self.id);
        let started = Instant::now();
        let outcome = self
            .phase
            .run(ctx, &mut self.tracker)
            .instrument(span)
            .await;

        self.tracker.finish_stage();

        let recorded = self
            .registry
            .finish(&self.id, outcome.as_ref().map(|_| ()).map_err(|e| e.to_string()));

        // A cancel that lands after the last stage was entered still wins
        let outcome = match outcome {
            Ok(()) if recorded != Some(WorkflowState::Completed) => {
                Err(WorkflowError::Cancelled {
                    id: self.id.clone(),
                    phase: self.tracker.stage().to_string(),
                })
            }
            other => other,
        };
        if let Err(e) = &outcome {
            self.tracker.error(e.to_string());
        }

        let summary = RunSummary::new(outcome.is_ok(), started.elapsed(), self.tracker.snapshot());
        let output = self.phase.output(summary);
        self.last_result = Some(output.clone());

        info!(
            workflow_id = %self.id,
            kind = %self.kind,
            state = ?recorded,
            "Workflow execution returned"
        );

        outcome.map(|()| output)
    }
}
