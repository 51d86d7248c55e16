//! Workflow orchestration: identity, lifecycle, progress and the registry
//! shared by every caller.

pub mod context;
pub mod error;
pub mod handle;
pub mod lifecycle;
pub mod manager;
pub mod progress;
pub mod registry;
pub mod types;

pub use context::{CancelFlag, ExecutionContext};
pub use error::WorkflowError;
pub use handle::{PhaseWorkflow, Workflow};
pub use lifecycle::{Lifecycle, LifecycleEvent};
pub use manager::{WorkflowManager, WORKFLOW_ID_PREFIX};
pub use progress::{
    ProgressCallback, ProgressChannel, ProgressTracker, Stage, COMPLETION, INITIALIZATION,
};
pub use registry::{RegistryStats, WorkflowRegistry, DEFAULT_HISTORY_LIMIT};
pub use types::{
    RunSummary, WorkflowInfo, WorkflowKind, WorkflowProgress, WorkflowState, WorkflowStatus,
    METADATA_PATH, METADATA_PERCENT, METADATA_STAGE,
};
