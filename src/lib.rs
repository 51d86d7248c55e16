// Scaffolder - workflow orchestration for project generation, validation,
// auditing, configuration and offline template caching

pub mod cli;
pub mod collaborators;
pub mod config;
pub mod observability;
pub mod phases;
pub mod telemetry;
pub mod workflow;

// Re-export key types for easy access
pub use collaborators::{Collaborators, ProjectConfig};
pub use crate::config::{config, init_config, ScaffolderConfig};
pub use observability::{collaborator_metrics, OperationTimer};
pub use phases::{
    ConfigurationOptions, ConfigurationResult, ConfigurationWorkflow, GenerationOptions,
    GenerationResult, OfflineOptions, OfflineResult, OfflineWorkflow, ProjectGenerationWorkflow,
    ValidationAuditOptions, ValidationAuditResult, ValidationAuditWorkflow,
};
pub use telemetry::{create_workflow_span, generate_correlation_id, init_telemetry};
pub use workflow::{
    ExecutionContext, Workflow, WorkflowError, WorkflowInfo, WorkflowKind, WorkflowManager,
    WorkflowRegistry, WorkflowState, WorkflowStatus,
};
