use thiserror::Error;

use super::types::{WorkflowKind, WorkflowState};

/// Errors raised by the workflow manager and phase workflows
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Invalid workflow input: {0}")]
    InvalidInput(String),

    #[error("Workflow not found: {id}")]
    NotFound { id: String },

    #[error("Workflow {id} is {actual}, expected {expected}")]
    InvalidState {
        id: String,
        actual: WorkflowState,
        expected: WorkflowState,
    },

    /// A fatal phase failure; the phase name is carried alongside the cause
    #[error("{phase}: {source}")]
    Phase {
        phase: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Unknown {kind} operation: {operation}")]
    UnknownOperation { kind: WorkflowKind, operation: String },

    #[error("Deadline exceeded during {phase}")]
    DeadlineExceeded { phase: String },

    #[error("Workflow {id} was cancelled before {phase}")]
    Cancelled { id: String, phase: String },
}

impl WorkflowError {
    pub fn phase(phase: &str, source: impl Into<anyhow::Error>) -> Self {
        WorkflowError::Phase {
            phase: phase.to_string(),
            source: source.into(),
        }
    }

    /// Name of the phase that failed, when the error came from one
    pub fn phase_name(&self) -> Option<&str> {
        match self {
            WorkflowError::Phase { phase, .. }
            | WorkflowError::DeadlineExceeded { phase }
            | WorkflowError::Cancelled { phase, .. } => Some(phase),
            _ => None,
        }
    }

    /// The collaborator error behind a phase failure, untouched
    pub fn collaborator_error(&self) -> Option<&anyhow::Error> {
        match self {
            WorkflowError::Phase { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, WorkflowError::Cancelled { .. })
    }
}
