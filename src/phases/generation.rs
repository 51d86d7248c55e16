//! Project generation.
//!
//! `initialization` → `configuration-validation` → `template-preparation` →
//! `structure-generation` → `template-processing` → `post-validation` →
//! `post-audit` → `completion`. The post-generation checks are optional and
//! never fatal: their failures and findings are recorded as warnings.

use anyhow::anyhow;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

use super::{call, require};
use crate::collaborators::{
    AuditOptions, AuditResult, Collaborators, ProjectConfig, Severity, ValidationResult,
};
use crate::workflow::{
    ExecutionContext, PhaseWorkflow, ProgressTracker, RunSummary, Stage, WorkflowError,
    WorkflowKind, COMPLETION, INITIALIZATION,
};

pub const CONFIGURATION_VALIDATION: Stage = Stage::new("configuration-validation", 10.0);
pub const TEMPLATE_PREPARATION: Stage = Stage::new("template-preparation", 20.0);
pub const STRUCTURE_GENERATION: Stage = Stage::new("structure-generation", 60.0);
pub const TEMPLATE_PROCESSING: Stage = Stage::new("template-processing", 70.0);
pub const POST_VALIDATION: Stage = Stage::new("post-validation", 85.0);
pub const POST_AUDIT: Stage = Stage::new("post-audit", 95.0);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Overwrite an existing target directory
    pub force: bool,
    /// Move an existing target aside before overwriting it
    pub backup_existing: bool,
    /// Skip the template availability check and rely on the cache
    pub offline: bool,
    pub post_validation: bool,
    pub post_audit: bool,
    pub audit: AuditOptions,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            force: false,
            backup_existing: false,
            offline: false,
            post_validation: true,
            post_audit: true,
            audit: AuditOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationResult {
    pub project_name: String,
    pub output_path: PathBuf,
    /// Top-level entries created by the generator; empty unless generation ran
    pub generated_files: Vec<String>,
    pub backup_path: Option<PathBuf>,
    pub files_processed: usize,
    pub validation: Option<ValidationResult>,
    pub audit: Option<AuditResult>,
    #[serde(flatten)]
    pub summary: RunSummary,
}

pub struct ProjectGenerationWorkflow {
    collaborators: Collaborators,
    config: ProjectConfig,
    output_path: PathBuf,
    options: GenerationOptions,
    generated_files: Vec<String>,
    backup_path: Option<PathBuf>,
    files_processed: usize,
    validation: Option<ValidationResult>,
    audit: Option<AuditResult>,
}

impl ProjectGenerationWorkflow {
    pub fn new(
        collaborators: Collaborators,
        config: ProjectConfig,
        output_path: PathBuf,
        options: GenerationOptions,
    ) -> Self {
        Self {
            collaborators,
            config,
            output_path,
            options,
            generated_files: Vec::new(),
            backup_path: None,
            files_processed: 0,
            validation: None,
            audit: None,
        }
    }

    pub fn options(&self) -> &GenerationOptions {
        &self.options
    }

    fn reset(&mut self) {
        self.generated_files.clear();
        self.backup_path = None;
        self.files_processed = 0;
        self.validation = None;
        self.audit = None;
    }

    async fn validate_configuration(
        &mut self,
        ctx: &ExecutionContext,
        tracker: &mut ProgressTracker,
    ) -> Result<(), WorkflowError> {
        tracker.enter(CONFIGURATION_VALIDATION, "Validating project configuration")?;

        if self.config.name.trim().is_empty() {
            return Err(WorkflowError::phase(
                CONFIGURATION_VALIDATION.name,
                anyhow!("project name is empty"),
            ));
        }

        let result = require(
            ctx,
            tracker,
            self.collaborators.validator.validate_configuration(&self.config),
        )
        .await?;

        if !result.valid {
            let problems: Vec<&str> = result
                .issues
                .iter()
                .filter(|issue| issue.severity == Severity::Error)
                .map(|issue| issue.message.as_str())
                .collect();
            return Err(WorkflowError::phase(
                CONFIGURATION_VALIDATION.name,
                anyhow!("invalid configuration: {}", problems.join("; ")),
            ));
        }
        for issue in result.issues.iter().filter(|i| i.severity == Severity::Warning) {
            tracker.warn(format!("configuration: {}", issue.message));
        }
        Ok(())
    }

    async fn prepare_template(
        &mut self,
        ctx: &ExecutionContext,
        tracker: &mut ProgressTracker,
    ) -> Result<(), WorkflowError> {
        tracker.enter(TEMPLATE_PREPARATION, "Preparing template")?;

        if self.options.offline {
            tracker.step("offline", "Offline mode, using cached templates");
            return Ok(());
        }

        let available = require(
            ctx,
            tracker,
            self.collaborators.templates.is_available(&self.config.template),
        )
        .await?;
        if !available {
            return Err(WorkflowError::phase(
                TEMPLATE_PREPARATION.name,
                anyhow!("template '{}' is not available", self.config.template),
            ));
        }
        Ok(())
    }

    async fn generate_structure(
        &mut self,
        ctx: &ExecutionContext,
        tracker: &mut ProgressTracker,
    ) -> Result<(), WorkflowError> {
        tracker.enter(STRUCTURE_GENERATION, "Generating project structure")?;

        let generator = self.collaborators.generator.clone();
        if generator.file_exists(&self.output_path) {
            if !self.options.force {
                return Err(WorkflowError::phase(
                    STRUCTURE_GENERATION.name,
                    anyhow!(
                        "{} already exists (use force to overwrite)",
                        self.output_path.display()
                    ),
                ));
            }
            if self.options.backup_existing {
                let backup = require(ctx, tracker, generator.backup_existing(&self.output_path))
                    .await?;
                tracker.step(
                    "backup",
                    format!("Backed up existing directory to {}", backup.display()),
                );
                self.backup_path = Some(backup);
            }
        }

        self.generated_files = require(
            ctx,
            tracker,
            generator.create_project(&self.config, &self.output_path),
        )
        .await?;
        Ok(())
    }

    async fn process_templates(
        &mut self,
        ctx: &ExecutionContext,
        tracker: &mut ProgressTracker,
    ) -> Result<(), WorkflowError> {
        tracker.enter(TEMPLATE_PROCESSING, "Substituting template variables")?;

        let variables = self.config.template_variables();
        self.files_processed = require(
            ctx,
            tracker,
            self.collaborators
                .templates
                .process_variables(&self.output_path, &variables),
        )
        .await?;
        Ok(())
    }

    async fn post_validate(
        &mut self,
        ctx: &ExecutionContext,
        tracker: &mut ProgressTracker,
    ) -> Result<(), WorkflowError> {
        tracker.enter(POST_VALIDATION, "Validating generated project")?;

        let outcome = call(
            ctx,
            tracker,
            self.collaborators.validator.validate_project(&self.output_path),
        )
        .await;
        match outcome {
            Ok(result) => {
                for issue in result.issues.iter().filter(|i| i.severity >= Severity::Warning) {
                    tracker.warn(format!("post-validation: {}", issue.message));
                }
                self.validation = Some(result);
            }
            Err(e) => tracker.warn(format!("post-validation failed: {e:#}")),
        }
        Ok(())
    }

    async fn post_audit(
        &mut self,
        ctx: &ExecutionContext,
        tracker: &mut ProgressTracker,
    ) -> Result<(), WorkflowError> {
        tracker.enter(POST_AUDIT, "Auditing generated project")?;

        let outcome = call(
            ctx,
            tracker,
            self.collaborators
                .auditor
                .audit_project(&self.output_path, &self.options.audit),
        )
        .await;
        match outcome {
            Ok(result) => {
                if !result.passed {
                    tracker.warn(format!("post-audit: audit did not pass (score {})", result.score));
                }
                for finding in result.findings.iter().filter(|f| f.severity >= Severity::Warning) {
                    tracker.warn(format!("post-audit: {}", finding.message));
                }
                self.audit = Some(result);
            }
            Err(e) => tracker.warn(format!("post-audit failed: {e:#}")),
        }
        Ok(())
    }
}

#[async_trait]
impl PhaseWorkflow for ProjectGenerationWorkflow {
    type Output = GenerationResult;

    fn kind(&self) -> WorkflowKind {
        WorkflowKind::ProjectGeneration
    }

    fn target(&self) -> String {
        self.output_path.display().to_string()
    }

    async fn run(
        &mut self,
        ctx: &ExecutionContext,
        tracker: &mut ProgressTracker,
    ) -> Result<(), WorkflowError> {
        tracker.enter(
            INITIALIZATION,
            format!("Generating project {}", self.config.name),
        )?;
        self.reset();

        self.validate_configuration(ctx, tracker).await?;
        self.prepare_template(ctx, tracker).await?;
        self.generate_structure(ctx, tracker).await?;
        self.process_templates(ctx, tracker).await?;

        if self.options.post_validation {
            self.post_validate(ctx, tracker).await?;
        }
        if self.options.post_audit {
            self.post_audit(ctx, tracker).await?;
        }

        tracker.enter(COMPLETION, format!("Project {} generated", self.config.name))?;
        info!(
            project = %self.config.name,
            path = %self.output_path.display(),
            files = self.generated_files.len(),
            warnings = tracker.warnings().len(),
            "Project generation finished"
        );
        Ok(())
    }

    fn output(&self, summary: RunSummary) -> GenerationResult {
        GenerationResult {
            project_name: self.config.name.clone(),
            output_path: self.output_path.clone(),
            generated_files: self.generated_files.clone(),
            backup_path: self.backup_path.clone(),
            files_processed: self.files_processed,
            validation: self.validation.clone(),
            audit: self.audit.clone(),
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{AuditCategory, AuditFinding, ValidationIssue};
    use crate::phases::test_support::{tracker, Mocks};
    use std::time::Duration;

    fn valid_config(mocks: &mut Mocks) {
        mocks
            .validator
            .expect_validate_configuration()
            .returning(|_| Ok(ValidationResult::from_issues(Vec::new())));
    }

    fn template_ok(mocks: &mut Mocks) {
        mocks.templates.expect_is_available().returning(|_| Ok(true));
        mocks
            .templates
            .expect_process_variables()
            .returning(|_, _| Ok(2));
    }

    fn fresh_target(mocks: &mut Mocks) {
        mocks.generator.expect_file_exists().return_const(false);
        mocks
            .generator
            .expect_create_project()
            .returning(|_, _| Ok(vec!["README.md".to_string(), "src".to_string()]));
    }

    fn happy_path(mocks: &mut Mocks) {
        valid_config(mocks);
        template_ok(mocks);
        fresh_target(mocks);
    }

    fn workflow(mocks: Mocks, options: GenerationOptions) -> ProjectGenerationWorkflow {
        ProjectGenerationWorkflow::new(
            mocks.into_collaborators(),
            ProjectConfig::new("demo"),
            PathBuf::from("/tmp/demo"),
            options,
        )
    }

    fn without_checks() -> GenerationOptions {
        GenerationOptions {
            post_validation: false,
            post_audit: false,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_happy_path_reaches_completion() {
        let mut mocks = Mocks::new();
        happy_path(&mut mocks);
        let mut wf = workflow(mocks, without_checks());
        let (mut tracker, _, _) = tracker();

        wf.run(&ExecutionContext::new(), &mut tracker).await.unwrap();

        assert_eq!(tracker.percent(), 100.0);
        let result = wf.output(RunSummary::new(true, Duration::ZERO, tracker.snapshot()));
        assert_eq!(result.generated_files, vec!["README.md", "src"]);
        assert_eq!(result.files_processed, 2);
        assert!(result.summary.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_existing_target_without_force_fails() {
        let mut mocks = Mocks::new();
        valid_config(&mut mocks);
        mocks.templates.expect_is_available().returning(|_| Ok(true));
        mocks.generator.expect_file_exists().return_const(true);
        mocks.generator.expect_create_project().never();
        let mut wf = workflow(mocks, without_checks());
        let (mut tracker, _, _) = tracker();

        let err = wf.run(&ExecutionContext::new(), &mut tracker).await.unwrap_err();

        assert_eq!(err.phase_name(), Some(STRUCTURE_GENERATION.name));
        assert_eq!(tracker.percent(), 60.0);
        let result = wf.output(RunSummary::new(false, Duration::ZERO, tracker.snapshot()));
        assert!(result.generated_files.is_empty());
        assert!(!result.summary.success);
    }

    #[tokio::test]
    async fn test_force_with_backup_moves_existing_directory() {
        let mut mocks = Mocks::new();
        valid_config(&mut mocks);
        template_ok(&mut mocks);
        mocks.generator.expect_file_exists().return_const(true);
        mocks
            .generator
            .expect_backup_existing()
            .withf(|path| path.ends_with("demo"))
            .times(1)
            .returning(|_| Ok(PathBuf::from("/tmp/demo.backup-1")));
        mocks
            .generator
            .expect_create_project()
            .returning(|_, _| Ok(vec!["src".to_string()]));

        let options = GenerationOptions {
            force: true,
            backup_existing: true,
            ..without_checks()
        };
        let mut wf = workflow(mocks, options);
        let (mut tracker, _, _) = tracker();
        wf.run(&ExecutionContext::new(), &mut tracker).await.unwrap();

        let result = wf.output(RunSummary::new(true, Duration::ZERO, tracker.snapshot()));
        assert_eq!(result.backup_path, Some(PathBuf::from("/tmp/demo.backup-1")));
    }

    #[tokio::test]
    async fn test_invalid_configuration_is_fatal() {
        let mut mocks = Mocks::new();
        mocks.validator.expect_validate_configuration().returning(|_| {
            Ok(ValidationResult::from_issues(vec![ValidationIssue::new(
                "name",
                Severity::Error,
                "bad name",
            )]))
        });
        mocks.templates.expect_is_available().never();
        let mut wf = workflow(mocks, without_checks());
        let (mut tracker, _, _) = tracker();

        let err = wf.run(&ExecutionContext::new(), &mut tracker).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "configuration-validation: invalid configuration: bad name"
        );
    }

    #[tokio::test]
    async fn test_unavailable_template_is_fatal_unless_offline() {
        let mut mocks = Mocks::new();
        valid_config(&mut mocks);
        mocks.templates.expect_is_available().returning(|_| Ok(false));
        let mut wf = workflow(mocks, without_checks());
        let (mut online, _, _) = tracker();
        let err = wf.run(&ExecutionContext::new(), &mut online).await.unwrap_err();
        assert_eq!(err.phase_name(), Some(TEMPLATE_PREPARATION.name));

        let mut mocks = Mocks::new();
        valid_config(&mut mocks);
        fresh_target(&mut mocks);
        mocks.templates.expect_is_available().never();
        mocks.templates.expect_process_variables().returning(|_, _| Ok(0));
        let options = GenerationOptions {
            offline: true,
            ..without_checks()
        };
        let mut wf = workflow(mocks, options);
        let (mut offline, _, _) = tracker();
        wf.run(&ExecutionContext::new(), &mut offline).await.unwrap();
    }

    #[tokio::test]
    async fn test_post_check_problems_are_warnings() {
        let mut mocks = Mocks::new();
        happy_path(&mut mocks);
        mocks
            .validator
            .expect_validate_project()
            .returning(|_| Err(anyhow!("validator crashed")));
        mocks.auditor.expect_audit_project().returning(|_, _| {
            Ok(AuditResult {
                score: 40,
                passed: false,
                findings: vec![AuditFinding {
                    category: AuditCategory::Security,
                    severity: Severity::Error,
                    message: "hard-coded secret".to_string(),
                    path: Some("src/main.rs".to_string()),
                }],
            })
        });
        let mut wf = workflow(mocks, GenerationOptions::default());
        let (mut tracker, _, _) = tracker();

        wf.run(&ExecutionContext::new(), &mut tracker).await.unwrap();

        let warnings = tracker.warnings();
        assert_eq!(warnings.len(), 3);
        assert!(warnings[0].contains("validator crashed"));
        assert!(warnings[1].contains("score 40"));
        assert_eq!(tracker.percent(), 100.0);
    }

    #[tokio::test]
    async fn test_cancel_stops_before_next_stage() {
        let mut mocks = Mocks::new();
        mocks.validator.expect_validate_configuration().never();
        let mut wf = workflow(mocks, without_checks());
        let (mut tracker, _, cancel) = tracker();
        cancel.cancel();

        let err = wf.run(&ExecutionContext::new(), &mut tracker).await.unwrap_err();
        assert!(err.is_cancelled());
    }
}
