use anyhow::Result;
use std::path::PathBuf;

use super::{print_summary, CommandContext};
use crate::collaborators::{ReportFormat, Severity};
use crate::phases::{ValidationAuditOptions, ValidationAuditResult};

pub struct CheckCommand {
    pub path: PathBuf,
    pub options: ValidationAuditOptions,
}

impl CheckCommand {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            options: ValidationAuditOptions::default(),
        }
    }

    /// `validate_only` and `audit_only` narrow the default of running both
    pub fn with_scope(mut self, validate_only: bool, audit_only: bool) -> Self {
        if validate_only || audit_only {
            self.options.validation_enabled = Some(!audit_only);
            self.options.audit_enabled = Some(!validate_only);
        }
        self
    }

    pub fn with_fix(mut self, fix: bool) -> Self {
        self.options.fix_issues = fix;
        self
    }

    pub fn with_report(
        mut self,
        report: bool,
        format: ReportFormat,
        path: Option<PathBuf>,
    ) -> Self {
        self.options.generate_report = report || path.is_some();
        self.options.report_format = format;
        self.options.report_path = path;
        self
    }

    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        if !ctx.is_json() {
            println!("🔍 Checking {}", self.path.display());
        }
        let mut workflow = ctx
            .manager
            .create_validation_workflow(self.path.clone(), Some(self.options.clone()))?;
        let result = ctx.run(&mut workflow, render).await?;

        // A check that found errors exits non-zero
        let failed = result.validation.as_ref().is_some_and(|v| !v.valid)
            || result.audit.as_ref().is_some_and(|a| !a.passed);
        if failed {
            anyhow::bail!("{} did not pass checks", self.path.display());
        }
        Ok(())
    }
}

fn render(result: &ValidationAuditResult) {
    if let Some(validation) = &result.validation {
        println!(
            "   🔍 Validation {} ({} error(s), {} warning(s), {} info)",
            if validation.valid { "passed" } else { "failed" },
            validation.count(Severity::Error),
            validation.count(Severity::Warning),
            validation.count(Severity::Info)
        );
        for issue in &validation.issues {
            println!("      [{}] {}: {}", issue.severity, issue.rule, issue.message);
        }
    }
    if let Some(audit) = &result.audit {
        println!(
            "   🛡️  Audit {} with score {}/100",
            if audit.passed { "passed" } else { "failed" },
            audit.score
        );
        for finding in &audit.findings {
            println!("      [{}] {}", finding.severity, finding.message);
        }
    }
    if !result.fixes_applied.is_empty() {
        println!("   🔧 Fixed {} issue(s)", result.fixes_applied.len());
    }
    for failure in &result.fixes_failed {
        println!("   ⚠️  Could not fix {}: {}", failure.issue.rule, failure.reason);
    }
    if let Some(report) = &result.report_path {
        println!("   📄 Report written to {}", report.display());
    }
    print_summary(&result.summary);
}
