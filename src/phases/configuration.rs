// Configuration file operations: export | import | validate | merge

use anyhow::anyhow;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::info;

use super::require;
use crate::collaborators::{Collaborators, ProjectConfig};
use crate::workflow::{
    ExecutionContext, PhaseWorkflow, ProgressTracker, RunSummary, Stage, WorkflowError,
    WorkflowKind, COMPLETION, INITIALIZATION,
};

const OPERATION_CHECKPOINT: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOperation {
    Export,
    Import,
    Validate,
    Merge,
}

impl ConfigOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigOperation::Export => "export",
            ConfigOperation::Import => "import",
            ConfigOperation::Validate => "validate",
            ConfigOperation::Merge => "merge",
        }
    }

    fn stage(&self) -> Stage {
        Stage::new(self.as_str(), OPERATION_CHECKPOINT)
    }
}

impl fmt::Display for ConfigOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigOperation {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "export" => Ok(ConfigOperation::Export),
            "import" => Ok(ConfigOperation::Import),
            "validate" => Ok(ConfigOperation::Validate),
            "merge" => Ok(ConfigOperation::Merge),
            other => Err(WorkflowError::UnknownOperation {
                kind: WorkflowKind::Configuration,
                operation: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationOptions {
    pub operation: String,
    /// Configuration written by `export`
    pub config: Option<ProjectConfig>,
    /// Files combined by `merge`, later ones overriding earlier ones
    pub sources: Vec<PathBuf>,
}

impl ConfigurationOptions {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigurationResult {
    pub operation: String,
    pub path: PathBuf,
    pub config: Option<ProjectConfig>,
    pub problems: Vec<String>,
    #[serde(flatten)]
    pub summary: RunSummary,
}

/// Single-phase dispatcher over the config manager. `path` is the file
/// exported to, imported from, validated, or the merge destination.
pub struct ConfigurationWorkflow {
    collaborators: Collaborators,
    path: PathBuf,
    options: ConfigurationOptions,
    config: Option<ProjectConfig>,
    problems: Vec<String>,
}

impl ConfigurationWorkflow {
    pub fn new(collaborators: Collaborators, path: PathBuf, options: ConfigurationOptions) -> Self {
        Self {
            collaborators,
            path,
            options,
            config: None,
            problems: Vec::new(),
        }
    }

    pub fn options(&self) -> &ConfigurationOptions {
        &self.options
    }
}

#[async_trait]
impl PhaseWorkflow for ConfigurationWorkflow {
    type Output = ConfigurationResult;

    fn kind(&self) -> WorkflowKind {
        WorkflowKind::Configuration
    }

    fn target(&self) -> String {
        self.path.display().to_string()
    }

    async fn run(
        &mut self,
        ctx: &ExecutionContext,
        tracker: &mut ProgressTracker,
    ) -> Result<(), WorkflowError> {
        tracker.enter(
            INITIALIZATION,
            format!("Configuration {}", self.options.operation),
        )?;
        self.config = None;
        self.problems.clear();

        let operation: ConfigOperation = self.options.operation.parse()?;
        let stage = operation.stage();
        tracker.enter(stage, format!("Running {operation}"))?;

        let store = self.collaborators.config_store.clone();
        match operation {
            ConfigOperation::Export => {
                let config = self.options.config.clone().ok_or_else(|| {
                    WorkflowError::phase(stage.name, anyhow!("export requires a configuration"))
                })?;
                require(ctx, tracker, store.export(&config, &self.path)).await?;
                self.config = Some(config);
            }
            ConfigOperation::Import => {
                self.config = Some(require(ctx, tracker, store.import(&self.path)).await?);
            }
            ConfigOperation::Validate => {
                self.problems = require(ctx, tracker, store.validate(&self.path)).await?;
                if !self.problems.is_empty() {
                    return Err(WorkflowError::phase(
                        stage.name,
                        anyhow!("configuration is invalid: {}", self.problems.join("; ")),
                    ));
                }
            }
            ConfigOperation::Merge => {
                if self.options.sources.is_empty() {
                    return Err(WorkflowError::phase(
                        stage.name,
                        anyhow!("merge requires at least one source"),
                    ));
                }
                let merged = require(ctx, tracker, store.merge(&self.options.sources)).await?;
                tracker.step(
                    "merge",
                    format!("Merged {} source(s)", self.options.sources.len()),
                );
                require(ctx, tracker, store.export(&merged, &self.path)).await?;
                self.config = Some(merged);
            }
        }

        tracker.enter(COMPLETION, format!("Configuration {operation} finished"))?;
        info!(operation = %operation, path = %self.path.display(), "Configuration operation finished");
        Ok(())
    }

    fn output(&self, summary: RunSummary) -> ConfigurationResult {
        ConfigurationResult {
            operation: self.options.operation.clone(),
            path: self.path.clone(),
            config: self.config.clone(),
            problems: self.problems.clone(),
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phases::test_support::{tracker, Mocks};

    fn workflow(mocks: Mocks, options: ConfigurationOptions) -> ConfigurationWorkflow {
        ConfigurationWorkflow::new(mocks.into_collaborators(), "/tmp/scaffold.toml".into(), options)
    }

    #[tokio::test]
    async fn test_unknown_operation_names_it() {
        let mut wf = workflow(Mocks::new(), ConfigurationOptions::new("explode"));
        let (mut tracker, _, _) = tracker();

        let err = wf.run(&ExecutionContext::new(), &mut tracker).await.unwrap_err();
        assert!(matches!(
            &err,
            WorkflowError::UnknownOperation { operation, .. } if operation == "explode"
        ));
        assert_eq!(err.to_string(), "Unknown configuration operation: explode");
    }

    #[tokio::test]
    async fn test_import_records_config() {
        let mut mocks = Mocks::new();
        mocks
            .config_store
            .expect_import()
            .withf(|path| path.ends_with("scaffold.toml"))
            .returning(|_| Ok(ProjectConfig::new("imported")));
        let mut wf = workflow(mocks, ConfigurationOptions::new("import"));
        let (mut tracker, _, _) = tracker();

        wf.run(&ExecutionContext::new(), &mut tracker).await.unwrap();
        let result = wf.output(RunSummary::new(
            true,
            std::time::Duration::ZERO,
            tracker.snapshot(),
        ));
        assert_eq!(result.config.unwrap().name, "imported");
    }

    #[tokio::test]
    async fn test_export_without_config_fails() {
        let mut mocks = Mocks::new();
        mocks.config_store.expect_export().never();
        let mut wf = workflow(mocks, ConfigurationOptions::new("export"));
        let (mut tracker, _, _) = tracker();

        let err = wf.run(&ExecutionContext::new(), &mut tracker).await.unwrap_err();
        assert_eq!(err.phase_name(), Some("export"));
    }

    #[tokio::test]
    async fn test_validate_problems_are_fatal() {
        let mut mocks = Mocks::new();
        mocks
            .config_store
            .expect_validate()
            .returning(|_| Ok(vec!["name must not be empty".to_string()]));
        let mut wf = workflow(mocks, ConfigurationOptions::new("validate"));
        let (mut tracker, _, _) = tracker();

        let err = wf.run(&ExecutionContext::new(), &mut tracker).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "validate: configuration is invalid: name must not be empty"
        );
        assert_eq!(tracker.percent(), 50.0);
    }

    #[tokio::test]
    async fn test_merge_exports_to_destination() {
        let mut mocks = Mocks::new();
        mocks
            .config_store
            .expect_merge()
            .withf(|sources| sources.len() == 2)
            .returning(|_| Ok(ProjectConfig::new("merged")));
        mocks
            .config_store
            .expect_export()
            .withf(|config, path| config.name == "merged" && path.ends_with("scaffold.toml"))
            .times(1)
            .returning(|_, _| Ok(()));

        let options = ConfigurationOptions {
            sources: vec!["a.json".into(), "b.toml".into()],
            ..ConfigurationOptions::new("merge")
        };
        let mut wf = workflow(mocks, options);
        let (mut tracker, _, _) = tracker();
        wf.run(&ExecutionContext::new(), &mut tracker).await.unwrap();
        assert_eq!(tracker.percent(), 100.0);
    }
}
