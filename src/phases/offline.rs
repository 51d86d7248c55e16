// Offline operations against the template cache: sync | validate | generate

use anyhow::anyhow;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, warn};

use super::{call, fatal, require};
use crate::collaborators::{CacheStats, Collaborators, ProjectConfig};
use crate::workflow::{
    ExecutionContext, PhaseWorkflow, ProgressTracker, RunSummary, Stage, WorkflowError,
    WorkflowKind, COMPLETION, INITIALIZATION,
};

const OPERATION_CHECKPOINT: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfflineOperation {
    Sync,
    Validate,
    Generate,
}

impl OfflineOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            OfflineOperation::Sync => "sync",
            OfflineOperation::Validate => "validate",
            OfflineOperation::Generate => "generate",
        }
    }

    fn stage(&self) -> Stage {
        Stage::new(self.as_str(), OPERATION_CHECKPOINT)
    }
}

impl fmt::Display for OfflineOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OfflineOperation {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sync" => Ok(OfflineOperation::Sync),
            "validate" => Ok(OfflineOperation::Validate),
            "generate" => Ok(OfflineOperation::Generate),
            other => Err(WorkflowError::UnknownOperation {
                kind: WorkflowKind::Offline,
                operation: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OfflineOptions {
    pub operation: String,
    /// On a failed `validate`, rebuild the cache and check it again
    pub repair_cache: bool,
    /// Project generated by `generate`
    pub config: Option<ProjectConfig>,
    /// Overwrite an existing target on `generate`
    pub force: bool,
}

impl OfflineOptions {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OfflineResult {
    pub operation: String,
    pub path: PathBuf,
    pub cache: Option<CacheStats>,
    pub cache_valid: Option<bool>,
    pub repaired: bool,
    pub generated_files: Vec<String>,
    #[serde(flatten)]
    pub summary: RunSummary,
}

/// Single-phase dispatcher over the cache manager. `path` is the cache
/// location for `sync`/`validate` and the project directory for `generate`.
pub struct OfflineWorkflow {
    collaborators: Collaborators,
    path: PathBuf,
    options: OfflineOptions,
    cache: Option<CacheStats>,
    cache_valid: Option<bool>,
    repaired: bool,
    generated_files: Vec<String>,
}

impl OfflineWorkflow {
    pub fn new(collaborators: Collaborators, path: PathBuf, options: OfflineOptions) -> Self {
        Self {
            collaborators,
            path,
            options,
            cache: None,
            cache_valid: None,
            repaired: false,
            generated_files: Vec::new(),
        }
    }

    pub fn options(&self) -> &OfflineOptions {
        &self.options
    }

    async fn validate(
        &mut self,
        ctx: &ExecutionContext,
        tracker: &mut ProgressTracker,
        stage: Stage,
    ) -> Result<(), WorkflowError> {
        let cache = self.collaborators.cache.clone();
        let original = match call(ctx, tracker, cache.validate_cache()).await {
            Ok(()) => {
                self.cache_valid = Some(true);
                return Ok(());
            }
            Err(e) => e,
        };
        self.cache_valid = Some(false);

        // Deadline errors pass through untouched and skip the repair
        if !self.options.repair_cache || original.is::<WorkflowError>() {
            return Err(fatal(stage.name, original));
        }

        tracker.warn(format!("cache validation failed: {original:#}; repairing"));
        if let Err(repair) = call(ctx, tracker, cache.repair_cache()).await {
            warn!(error = %repair, "Cache repair failed");
            return Err(WorkflowError::phase(
                stage.name,
                original.context(format!("cache repair failed: {repair:#}")),
            ));
        }

        require(ctx, tracker, cache.validate_cache()).await?;
        tracker.step("repair", "Cache repaired");
        self.cache_valid = Some(true);
        self.repaired = true;
        Ok(())
    }

    async fn generate(
        &mut self,
        ctx: &ExecutionContext,
        tracker: &mut ProgressTracker,
        stage: Stage,
    ) -> Result<(), WorkflowError> {
        let config = self.options.config.clone().ok_or_else(|| {
            WorkflowError::phase(stage.name, anyhow!("generate requires a project configuration"))
        })?;

        require(ctx, tracker, self.collaborators.cache.validate_cache()).await?;
        self.cache_valid = Some(true);

        let generator = self.collaborators.generator.clone();
        if generator.file_exists(&self.path) && !self.options.force {
            return Err(WorkflowError::phase(
                stage.name,
                anyhow!("{} already exists (use force to overwrite)", self.path.display()),
            ));
        }

        self.generated_files =
            require(ctx, tracker, generator.create_project(&config, &self.path)).await?;
        tracker.step("templates", "Substituting template variables");
        let variables = config.template_variables();
        require(
            ctx,
            tracker,
            self.collaborators
                .templates
                .process_variables(&self.path, &variables),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl PhaseWorkflow for OfflineWorkflow {
    type Output = OfflineResult;

    fn kind(&self) -> WorkflowKind {
        WorkflowKind::Offline
    }

    fn target(&self) -> String {
        self.path.display().to_string()
    }

    async fn run(
        &mut self,
        ctx: &ExecutionContext,
        tracker: &mut ProgressTracker,
    ) -> Result<(), WorkflowError> {
        tracker.enter(INITIALIZATION, format!("Offline {}", self.options.operation))?;
        self.cache = None;
        self.cache_valid = None;
        self.repaired = false;
        self.generated_files.clear();

        let operation: OfflineOperation = self.options.operation.parse()?;
        let stage = operation.stage();
        tracker.enter(stage, format!("Running offline {operation}"))?;

        match operation {
            OfflineOperation::Sync => {
                let stats = require(ctx, tracker, self.collaborators.cache.sync_templates()).await?;
                tracker.step("sync", format!("{} cached file(s)", stats.entries));
                self.cache = Some(stats);
            }
            OfflineOperation::Validate => self.validate(ctx, tracker, stage).await?,
            OfflineOperation::Generate => self.generate(ctx, tracker, stage).await?,
        }

        // Stats are informational only
        if self.cache.is_none() && operation != OfflineOperation::Generate {
            match call(ctx, tracker, self.collaborators.cache.stats()).await {
                Ok(stats) => self.cache = Some(stats),
                Err(e) => tracker.warn(format!("cache stats unavailable: {e:#}")),
            }
        }

        tracker.enter(COMPLETION, format!("Offline {operation} finished"))?;
        info!(operation = %operation, path = %self.path.display(), repaired = self.repaired, "Offline operation finished");
        Ok(())
    }

    fn output(&self, summary: RunSummary) -> OfflineResult {
        OfflineResult {
            operation: self.options.operation.clone(),
            path: self.path.clone(),
            cache: self.cache.clone(),
            cache_valid: self.cache_valid,
            repaired: self.repaired,
            generated_files: self.generated_files.clone(),
            summary,
        }
    }
}
