//! Validation and audit of an existing project.
//!
//! Stages: `initialization` → `validation` → `audit` → `fix-application` →
//! `report-generation` → `completion`. Validation and audit run when their
//! toggle is on; fixes only when requested and validation ran; the report
//! only when requested. Fix and report failures become warnings.

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use super::{call, require};
use crate::collaborators::{
    AuditOptions, AuditResult, Collaborators, FixFailure, ReportFormat, Severity,
    ValidationIssue, ValidationResult,
};
use crate::workflow::{
    ExecutionContext, PhaseWorkflow, ProgressTracker, RunSummary, Stage, WorkflowError,
    WorkflowKind, COMPLETION, INITIALIZATION,
};

pub const VALIDATION: Stage = Stage::new("validation", 40.0);
pub const AUDIT: Stage = Stage::new("audit", 70.0);
pub const FIX_APPLICATION: Stage = Stage::new("fix-application", 85.0);
pub const REPORT_GENERATION: Stage = Stage::new("report-generation", 95.0);

pub const DEFAULT_REPORT_STEM: &str = "scaffolder-report";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationAuditOptions {
    /// Both toggles default to on when neither is given. When only one is
    /// given the other takes its opposite.
    pub validation_enabled: Option<bool>,
    pub audit_enabled: Option<bool>,
    pub fix_issues: bool,
    pub generate_report: bool,
    pub report_format: ReportFormat,
    /// Defaults to `<path>/scaffolder-report.<ext>`
    pub report_path: Option<PathBuf>,
    pub audit: AuditOptions,
}

impl ValidationAuditOptions {
    pub fn validation_only() -> Self {
        Self {
            validation_enabled: Some(true),
            ..Default::default()
        }
    }

    pub fn audit_only() -> Self {
        Self {
            audit_enabled: Some(true),
            ..Default::default()
        }
    }

    /// Resolved `(validation, audit)` toggles. An omitted toggle takes the
    /// opposite of the one that was given.
    pub fn toggles(&self) -> Result<(bool, bool), WorkflowError> {
        let resolved = match (self.validation_enabled, self.audit_enabled) {
            (None, None) => (true, true),
            (Some(validation), None) => (validation, !validation),
            (None, Some(audit)) => (!audit, audit),
            (Some(validation), Some(audit)) => (validation, audit),
        };
        if resolved == (false, false) {
            return Err(WorkflowError::InvalidInput(
                "at least one of validation or audit must be enabled".to_string(),
            ));
        }
        Ok(resolved)
    }

    pub fn kind(&self) -> Result<WorkflowKind, WorkflowError> {
        Ok(match self.toggles()? {
            (true, true) => WorkflowKind::ValidationAudit,
            (true, false) => WorkflowKind::Validation,
            _ => WorkflowKind::Audit,
        })
    }

    fn report_path_for(&self, project: &Path) -> PathBuf {
        self.report_path.clone().unwrap_or_else(|| {
            project.join(format!(
                "{DEFAULT_REPORT_STEM}.{}",
                self.report_format.extension()
            ))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationAuditResult {
    pub path: PathBuf,
    pub validation: Option<ValidationResult>,
    pub audit: Option<AuditResult>,
    pub fixes_applied: Vec<ValidationIssue>,
    pub fixes_failed: Vec<FixFailure>,
    pub report_path: Option<PathBuf>,
    #[serde(flatten)]
    pub summary: RunSummary,
}

pub struct ValidationAuditWorkflow {
    collaborators: Collaborators,
    path: PathBuf,
    options: ValidationAuditOptions,
    kind: WorkflowKind,
    validation_enabled: bool,
    audit_enabled: bool,
    validation: Option<ValidationResult>,
    audit: Option<AuditResult>,
    fixes_applied: Vec<ValidationIssue>,
    fixes_failed: Vec<FixFailure>,
    report_path: Option<PathBuf>,
}

impl ValidationAuditWorkflow {
    pub fn new(
        collaborators: Collaborators,
        path: PathBuf,
        options: ValidationAuditOptions,
    ) -> Result<Self, WorkflowError> {
        let (validation_enabled, audit_enabled) = options.toggles()?;
        Ok(Self {
            kind: options.kind()?,
            collaborators,
            path,
            options,
            validation_enabled,
            audit_enabled,
            validation: None,
            audit: None,
            fixes_applied: Vec::new(),
            fixes_failed: Vec::new(),
            report_path: None,
        })
    }

    pub fn options(&self) -> &ValidationAuditOptions {
        &self.options
    }

    fn reset(&mut self) {
        self.validation = None;
        self.audit = None;
        self.fixes_applied.clear();
        self.fixes_failed.clear();
        self.report_path = None;
    }

    async fn apply_fixes(&mut self, ctx: &ExecutionContext, tracker: &mut ProgressTracker) {
        let issues = self
            .validation
            .as_ref()
            .map(|v| v.issues.clone())
            .unwrap_or_default();
        let fixable = self.collaborators.validator.fixable_issues(&issues);
        if fixable.is_empty() {
            tracker.step("fix", "No fixable issues");
            return;
        }

        let outcome = call(
            ctx,
            tracker,
            self.collaborators
                .validator
                .fix_validation_issues(&self.path, &fixable),
        )
        .await;
        match outcome {
            Ok(fixes) => {
                for failure in &fixes.failed {
                    tracker.warn(format!(
                        "fix-application: could not fix {}: {}",
                        failure.issue.rule, failure.reason
                    ));
                }
                tracker.step("fix", format!("Applied {} fix(es)", fixes.fixed.len()));
                self.fixes_applied = fixes.fixed;
                self.fixes_failed = fixes.failed;
            }
            Err(e) => tracker.warn(format!("fix-application failed: {e:#}")),
        }
    }

    async fn render_report(
        &self,
        ctx: &ExecutionContext,
        tracker: &ProgressTracker,
    ) -> anyhow::Result<Vec<u8>> {
        let format = self.options.report_format;
        let mut sections = Vec::new();
        if let Some(validation) = &self.validation {
            let bytes = call(
                ctx,
                tracker,
                self.collaborators
                    .validator
                    .generate_validation_report(validation, format),
            )
            .await?;
            sections.push(("validation", bytes));
        }
        if let Some(audit) = &self.audit {
            let bytes = call(
                ctx,
                tracker,
                self.collaborators.auditor.generate_audit_report(audit, format),
            )
            .await?;
            sections.push(("audit", bytes));
        }

        if format != ReportFormat::Json {
            return Ok(sections
                .into_iter()
                .map(|(_, bytes)| bytes)
                .collect::<Vec<_>>()
                .join(&b"\n"[..]));
        }

        let mut combined = serde_json::Map::new();
        for (name, bytes) in sections {
            let value: serde_json::Value = serde_json::from_slice(&bytes)
                .with_context(|| format!("{name} report is not valid JSON"))?;
            combined.insert(name.to_string(), value);
        }
        Ok(serde_json::to_vec_pretty(&combined)?)
    }

    async fn write_report(
        &mut self,
        ctx: &ExecutionContext,
        tracker: &mut ProgressTracker,
    ) -> anyhow::Result<()> {
        let body = self.render_report(ctx, tracker).await?;
        let target = self.options.report_path_for(&self.path);
        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, body)
            .await
            .with_context(|| format!("Failed to write report to {}", target.display()))?;
        tracker.step("report", format!("Report written to {}", target.display()));
        self.report_path = Some(target);
        Ok(())
    }
}

#[async_trait]
impl PhaseWorkflow for ValidationAuditWorkflow {
    type Output = ValidationAuditResult;

    fn kind(&self) -> WorkflowKind {
        self.kind
    }

    fn target(&self) -> String {
        self.path.display().to_string()
    }

    async fn run(
        &mut self,
        ctx: &ExecutionContext,
        tracker: &mut ProgressTracker,
    ) -> Result<(), WorkflowError> {
        tracker.enter(INITIALIZATION, format!("Checking {}", self.path.display()))?;
        self.reset();

        if self.validation_enabled {
            tracker.enter(VALIDATION, "Validating project")?;
            let result = require(
                ctx,
                tracker,
                self.collaborators.validator.validate_project(&self.path),
            )
            .await?;
            tracker.step(
                "validation",
                format!(
                    "{} issue(s), {} error(s)",
                    result.issues.len(),
                    result.count(Severity::Error)
                ),
            );
            self.validation = Some(result);
        }

        if self.audit_enabled {
            tracker.enter(AUDIT, "Auditing project")?;
            let result = require(
                ctx,
                tracker,
                self.collaborators
                    .auditor
                    .audit_project(&self.path, &self.options.audit),
            )
            .await?;
            tracker.step("audit", format!("Audit score {}", result.score));
            self.audit = Some(result);
        }

        if self.options.fix_issues && self.validation.is_some() {
            tracker.enter(FIX_APPLICATION, "Applying fixes")?;
            self.apply_fixes(ctx, tracker).await;
        }

        if self.options.generate_report {
            tracker.enter(REPORT_GENERATION, "Generating report")?;
            if let Err(e) = self.write_report(ctx, tracker).await {
                tracker.warn(format!("report-generation failed: {e:#}"));
            }
        }

        tracker.enter(COMPLETION, "Checks finished")?;
        info!(
            path = %self.path.display(),
            kind = %self.kind,
            fixes = self.fixes_applied.len(),
            "Validation and audit finished"
        );
        Ok(())
    }

    fn output(&self, summary: RunSummary) -> ValidationAuditResult {
        ValidationAuditResult {
            path: self.path.clone(),
            validation: self.validation.clone(),
            audit: self.audit.clone(),
            fixes_applied: self.fixes_applied.clone(),
            fixes_failed: self.fixes_failed.clone(),
            report_path: self.report_path.clone(),
            summary,
        }
    }
}
