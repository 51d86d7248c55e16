//! Workflow manager.
//!
//! Creates phase workflows, binds each to a freshly registered id and hands
//! back a [`Workflow`] handle. The registry is an injected service so that
//! every caller (CLI commands, the watch loop, tests) can share or isolate it.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::context::ExecutionContext;
use super::error::WorkflowError;
use super::handle::{PhaseWorkflow, Workflow};
use super::registry::{path_metadata, WorkflowRegistry};
use super::types::{WorkflowInfo, WorkflowStatus};
use crate::collaborators::{Collaborators, ProjectConfig};
use crate::phases::{
    ConfigurationOptions, ConfigurationWorkflow, GenerationOptions, OfflineOptions,
    OfflineWorkflow, ProjectGenerationWorkflow, ValidationAuditOptions, ValidationAuditWorkflow,
};

pub const WORKFLOW_ID_PREFIX: &str = "workflow_";

#[derive(Clone)]
pub struct WorkflowManager {
    registry: Arc<WorkflowRegistry>,
    collaborators: Collaborators,
}

fn require_path(path: &Path) -> Result<(), WorkflowError> {
    if path.as_os_str().is_empty() {
        return Err(WorkflowError::InvalidInput("path must not be empty".to_string()));
    }
    Ok(())
}

fn require_operation(operation: &str) -> Result<(), WorkflowError> {
    if operation.trim().is_empty() {
        return Err(WorkflowError::InvalidInput(
            "operation must not be empty".to_string(),
        ));
    }
    Ok(())
}

impl WorkflowManager {
    pub fn new(registry: Arc<WorkflowRegistry>, collaborators: Collaborators) -> Self {
        Self {
            registry,
            collaborators,
        }
    }

    pub fn registry(&self) -> &Arc<WorkflowRegistry> {
        &self.registry
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    pub fn generate_workflow_id() -> String {
        format!("{WORKFLOW_ID_PREFIX}{}", Uuid::new_v4().simple())
    }

    fn bind<P: PhaseWorkflow>(&self, phase: P) -> Result<Workflow<P>, WorkflowError> {
        let id = Self::generate_workflow_id();
        let cancel = self
            .registry
            .register(&id, phase.kind(), path_metadata(&phase.target()))?;
        Ok(Workflow::new(id, phase, self.registry.clone(), cancel))
    }

    pub fn create_project_workflow(
        &self,
        config: ProjectConfig,
        output_path: impl Into<PathBuf>,
        options: Option<GenerationOptions>,
    ) -> Result<Workflow<ProjectGenerationWorkflow>, WorkflowError> {
        if config.name.trim().is_empty() {
            return Err(WorkflowError::InvalidInput(
                "project name must not be empty".to_string(),
            ));
        }
        let output_path = output_path.into();
        require_path(&output_path)?;

        let options = options.unwrap_or_default();
        debug!(project = %config.name, ?options, "Creating project generation workflow");
        self.bind(ProjectGenerationWorkflow::new(
            self.collaborators.clone(),
            config,
            output_path,
            options,
        ))
    }

    pub fn create_validation_workflow(
        &self,
        path: impl Into<PathBuf>,
        options: Option<ValidationAuditOptions>,
    ) -> Result<Workflow<ValidationAuditWorkflow>, WorkflowError> {
        let path = path.into();
        require_path(&path)?;

        let phase = ValidationAuditWorkflow::new(
            self.collaborators.clone(),
            path,
            options.unwrap_or_default(),
        )?;
        self.bind(phase)
    }

    pub fn create_configuration_workflow(
        &self,
        path: impl Into<PathBuf>,
        options: ConfigurationOptions,
    ) -> Result<Workflow<ConfigurationWorkflow>, WorkflowError> {
        let path = path.into();
        require_path(&path)?;
        require_operation(&options.operation)?;

        self.bind(ConfigurationWorkflow::new(
            self.collaborators.clone(),
            path,
            options,
        ))
    }

    pub fn create_offline_workflow(
        &self,
        path: impl Into<PathBuf>,
        options: OfflineOptions,
    ) -> Result<Workflow<OfflineWorkflow>, WorkflowError> {
        let path = path.into();
        require_path(&path)?;
        require_operation(&options.operation)?;

        self.bind(OfflineWorkflow::new(self.collaborators.clone(), path, options))
    }

    /// Run a workflow to completion on the caller's task
    pub async fn execute<P: PhaseWorkflow>(
        &self,
        workflow: &mut Workflow<P>,
        ctx: &ExecutionContext,
    ) -> Result<P::Output, WorkflowError> {
        workflow.execute(ctx).await
    }

    pub fn cancel(&self, id: &str) -> Result<WorkflowInfo, WorkflowError> {
        self.registry.cancel(id)
    }

    pub fn status(&self, id: &str) -> Result<WorkflowStatus, WorkflowError> {
        self.registry.status(id)
    }

    pub fn list_active(&self) -> Vec<WorkflowInfo> {
        self.registry.list_active()
    }

    pub fn list_history(&self) -> Vec<WorkflowInfo> {
        self.registry.list_history()
    }
}
