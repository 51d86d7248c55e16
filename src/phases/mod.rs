//! Phase workflows.
//!
//! Each phase workflow is a linear state machine over named stages. Stages
//! are entered through the [`ProgressTracker`], which refuses to start a new
//! stage once the workflow has been cancelled. Collaborator calls go through
//! [`call`] (non-fatal) or [`require`] (fatal) so that every call honours the
//! execution deadline and is counted in the collaborator metrics.

use std::future::Future;
use tracing::Instrument;

use crate::observability::collaborator_metrics;
use crate::telemetry::stage_span;
use crate::workflow::{ExecutionContext, ProgressTracker, WorkflowError};

pub mod configuration;
pub mod generation;
pub mod offline;
pub mod validation_audit;

#[cfg(test)]
pub(crate) mod test_support;

pub use configuration::{ConfigOperation, ConfigurationOptions, ConfigurationResult, ConfigurationWorkflow};
pub use generation::{GenerationOptions, GenerationResult, ProjectGenerationWorkflow};
pub use offline::{OfflineOperation, OfflineOptions, OfflineResult, OfflineWorkflow};
pub use validation_audit::{ValidationAuditOptions, ValidationAuditResult, ValidationAuditWorkflow};

/// Run a collaborator call for the current stage, bounded by the deadline
pub(crate) async fn call<T, F>(
    ctx: &ExecutionContext,
    tracker: &ProgressTracker,
    fut: F,
) -> anyhow::Result<T>
where
    F: Future<Output = anyhow::Result<T>>,
{
    let stage = tracker.stage();
    let metrics = collaborator_metrics();
    metrics.record_call();

    let result = ctx
        .call(stage, fut)
        .instrument(stage_span(tracker.workflow_id(), stage))
        .await;
    if let Err(e) = &result {
        metrics.record_failure();
        if matches!(
            e.downcast_ref::<WorkflowError>(),
            Some(WorkflowError::DeadlineExceeded { .. })
        ) {
            metrics.record_deadline_hit(stage);
        }
    }
    result
}

/// Like [`call`], but a failure aborts the workflow
pub(crate) async fn require<T, F>(
    ctx: &ExecutionContext,
    tracker: &ProgressTracker,
    fut: F,
) -> Result<T, WorkflowError>
where
    F: Future<Output = anyhow::Result<T>>,
{
    call(ctx, tracker, fut)
        .await
        .map_err(|e| fatal(tracker.stage(), e))
}

/// Attach the phase name to a collaborator error. Workflow errors raised
/// underneath (deadline) pass through as they are.
pub(crate) fn fatal(phase: &str, error: anyhow::Error) -> WorkflowError {
    match error.downcast::<WorkflowError>() {
        Ok(workflow_error) => workflow_error,
        Err(error) => WorkflowError::phase(phase, error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_passes_deadline_through() {
        let deadline: anyhow::Error = WorkflowError::DeadlineExceeded {
            phase: "audit".to_string(),
        }
        .into();
        assert!(matches!(
            fatal("audit", deadline),
            WorkflowError::DeadlineExceeded { .. }
        ));

        let err = fatal("validation", anyhow::anyhow!("engine offline"));
        assert_eq!(err.to_string(), "validation: engine offline");
    }
}
