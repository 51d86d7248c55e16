// Structural project and configuration validation

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, warn};

use super::types::{
    FixFailure, FixResult, ProjectConfig, ReportFormat, Severity, ValidationIssue,
    ValidationResult,
};
use super::ValidationEngine;

static PROJECT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_-]*$").expect("name pattern is valid"));

static SEMVER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(0|[1-9]\d*)\.(0|[1-9]\d*)\.(0|[1-9]\d*)(-[0-9A-Za-z.-]+)?(\+[0-9A-Za-z.-]+)?$")
        .expect("semver pattern is valid")
});

pub(crate) fn is_semver(version: &str) -> bool {
    SEMVER.is_match(version)
}

pub const KNOWN_LICENSES: &[&str] = &[
    "MIT",
    "Apache-2.0",
    "BSD-2-Clause",
    "BSD-3-Clause",
    "GPL-3.0",
    "LGPL-3.0",
    "MPL-2.0",
    "ISC",
    "Unlicense",
];

const MANIFESTS: &[&str] = &["Cargo.toml", "package.json", "pyproject.toml", "go.mod"];

pub mod rules {
    pub const NAME: &str = "name";
    pub const VERSION: &str = "version";
    pub const LICENSE: &str = "license";
    pub const TEMPLATE: &str = "template";
    pub const PATH: &str = "path";
    pub const README: &str = "readme";
    pub const GITIGNORE: &str = "gitignore";
    pub const LICENSE_FILE: &str = "license-file";
    pub const MANIFEST: &str = "manifest";
    pub const TESTS: &str = "tests";
}

const DEFAULT_GITIGNORE: &str = "/target\nnode_modules/\n.env\n";

#[derive(Debug, Clone, Default)]
pub struct StructureValidator;

impl StructureValidator {
    pub fn new() -> Self {
        Self
    }

    async fn apply_fix(&self, root: &Path, issue: &ValidationIssue) -> Result<(), String> {
        let write = |file: &str, contents: String| {
            let target = root.join(file);
            async move {
                tokio::fs::write(&target, contents)
                    .await
                    .map_err(|e| format!("failed to write {}: {e}", target.display()))
            }
        };

        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "project".to_string());

        match issue.rule.as_str() {
            rules::README => write("README.md", format!("# {name}\n")).await,
            rules::LICENSE_FILE => {
                let year = chrono::Utc::now().format("%Y");
                write(
                    "LICENSE",
                    format!("Copyright (c) {year} {name}. All rights reserved.\n"),
                )
                .await
            }
            rules::GITIGNORE => write(".gitignore", DEFAULT_GITIGNORE.to_string()).await,
            other => Err(format!("no automatic fix for rule '{other}'")),
        }
    }
}

fn render_text(result: &ValidationResult) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Validation {}: {} error(s), {} warning(s), {} info",
        if result.valid { "passed" } else { "failed" },
        result.count(Severity::Error),
        result.count(Severity::Warning),
        result.count(Severity::Info),
    );
    for issue in &result.issues {
        let _ = write!(out, "[{}] {}: {}", issue.severity, issue.rule, issue.message);
        if let Some(path) = &issue.path {
            let _ = write!(out, " ({path})");
        }
        if issue.fixable {
            out.push_str(" [fixable]");
        }
        out.push('\n');
    }
    out
}

fn render_markdown(result: &ValidationResult) -> String {
    let mut out = String::from("# Validation Report\n\n");
    let _ = writeln!(
        out,
        "**Status:** {}\n",
        if result.valid { "passed" } else { "failed" }
    );
    if result.issues.is_empty() {
        out.push_str("No issues found.\n");
        return out;
    }
    out.push_str("| Severity | Rule | Message | Path | Fixable |\n");
    out.push_str("|----------|------|---------|------|---------|\n");
    for issue in &result.issues {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} |",
            issue.severity,
            issue.rule,
            issue.message,
            issue.path.as_deref().unwrap_or("-"),
            if issue.fixable { "yes" } else { "no" },
        );
    }
    out
}

#[async_trait]
impl ValidationEngine for StructureValidator {
    async fn validate_configuration(&self, config: &ProjectConfig) -> Result<ValidationResult> {
        let mut issues = Vec::new();

        if !PROJECT_NAME.is_match(&config.name) {
            issues.push(ValidationIssue::new(
                rules::NAME,
                Severity::Error,
                format!(
                    "project name '{}' must start with a lowercase letter and contain only [a-z0-9_-]",
                    config.name
                ),
            ));
        }
        if !is_semver(&config.version) {
            issues.push(ValidationIssue::new(
                rules::VERSION,
                Severity::Error,
                format!("version '{}' is not semantic versioning", config.version),
            ));
        }
        if config.template.trim().is_empty() {
            issues.push(ValidationIssue::new(
                rules::TEMPLATE,
                Severity::Error,
                "template name is empty",
            ));
        }
        match &config.license {
            Some(license) if !KNOWN_LICENSES.contains(&license.as_str()) => {
                issues.push(ValidationIssue::new(
                    rules::LICENSE,
                    Severity::Warning,
                    format!("license '{license}' is not a recognised SPDX identifier"),
                ));
            }
            None => issues.push(ValidationIssue::new(
                rules::LICENSE,
                Severity::Info,
                "no license selected",
            )),
            _ => {}
        }

        debug!(name = %config.name, issues = issues.len(), "Validated configuration");
        Ok(ValidationResult::from_issues(issues))
    }

    async fn validate_project(&self, path: &Path) -> Result<ValidationResult> {
        if !path.is_dir() {
            return Ok(ValidationResult::from_issues(vec![ValidationIssue::new(
                rules::PATH,
                Severity::Error,
                "project directory does not exist",
            )
            .at(path.display().to_string())]));
        }

        let mut issues = Vec::new();
        if !path.join("README.md").is_file() {
            issues.push(
                ValidationIssue::new(rules::README, Severity::Warning, "README.md is missing")
                    .at("README.md")
                    .fixable(),
            );
        }
        if !path.join(".gitignore").is_file() {
            issues.push(
                ValidationIssue::new(rules::GITIGNORE, Severity::Warning, ".gitignore is missing")
                    .at(".gitignore")
                    .fixable(),
            );
        }
        if !path.join("LICENSE").is_file() {
            issues.push(
                ValidationIssue::new(rules::LICENSE_FILE, Severity::Warning, "LICENSE is missing")
                    .at("LICENSE")
                    .fixable(),
            );
        }
        if !MANIFESTS.iter().any(|m| path.join(m).is_file()) {
            issues.push(ValidationIssue::new(
                rules::MANIFEST,
                Severity::Error,
                format!("no build manifest found (expected one of {})", MANIFESTS.join(", ")),
            ));
        }
        if !path.join("tests").is_dir() && !path.join("test").is_dir() {
            issues.push(ValidationIssue::new(
                rules::TESTS,
                Severity::Info,
                "no tests directory",
            ));
        }

        debug!(path = %path.display(), issues = issues.len(), "Validated project");
        Ok(ValidationResult::from_issues(issues))
    }

    fn fixable_issues(&self, issues: &[ValidationIssue]) -> Vec<ValidationIssue> {
        issues.iter().filter(|issue| issue.fixable).cloned().collect()
    }

    async fn fix_validation_issues(
        &self,
        path: &Path,
        issues: &[ValidationIssue],
    ) -> Result<FixResult> {
        let mut result = FixResult::default();
        for issue in issues {
            let outcome = if issue.fixable {
                self.apply_fix(path, issue).await
            } else {
                Err("issue is not automatically fixable".to_string())
            };
            match outcome {
                Ok(()) => result.fixed.push(issue.clone()),
                Err(reason) => {
                    warn!(rule = %issue.rule, reason = %reason, "Could not fix issue");
                    result.failed.push(FixFailure {
                        issue: issue.clone(),
                        reason,
                    });
                }
            }
        }
        Ok(result)
    }

    async fn generate_validation_report(
        &self,
        result: &ValidationResult,
        format: ReportFormat,
    ) -> Result<Vec<u8>> {
        Ok(match format {
            ReportFormat::Json => serde_json::to_vec_pretty(result)?,
            ReportFormat::Markdown => render_markdown(result).into_bytes(),
            ReportFormat::Text => render_text(result).into_bytes(),
        })
    }
}
