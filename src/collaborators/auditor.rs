// Heuristic project auditor
//
// Scores start at 100 and lose points per finding: errors 25, warnings 10,
// info 2. A project passes when no error-level finding exists.

use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;
use walkdir::WalkDir;

use super::types::{
    AuditCategory, AuditFinding, AuditOptions, AuditResult, ReportFormat, Severity,
};
use super::AuditEngine;

const LARGE_FILE_BYTES: u64 = 1024 * 1024;
const SKIPPED_DIRS: &[&str] = &[".git", "target", "node_modules"];

static SECRET_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#"(?i)(api[_-]?key|secret|password|token)\s*[:=]\s*["'][^"'\s]{8,}["']"#,
        r"AKIA[0-9A-Z]{16}",
        r"-----BEGIN (RSA |EC )?PRIVATE KEY-----",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("secret pattern is valid"))
    .collect()
});

static MARKERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(TODO|FIXME)\b").expect("marker pattern is valid"));

struct ScannedFile {
    relative: String,
    absolute: PathBuf,
    size: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ProjectAuditor;

impl ProjectAuditor {
    pub fn new() -> Self {
        Self
    }

    fn scan(root: &Path) -> Vec<ScannedFile> {
        WalkDir::new(root)
            .into_iter()
            .filter_entry(|entry| {
                let name = entry.file_name().to_string_lossy();
                !(entry.file_type().is_dir() && SKIPPED_DIRS.iter().any(|dir| *dir == name))
            })
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| ScannedFile {
                relative: entry
                    .path()
                    .strip_prefix(root)
                    .unwrap_or(entry.path())
                    .display()
                    .to_string(),
                size: entry.metadata().map(|m| m.len()).unwrap_or(0),
                absolute: entry.into_path(),
            })
            .collect()
    }
}

pub fn score(findings: &[AuditFinding]) -> u8 {
    let penalty: u32 = findings
        .iter()
        .map(|finding| match finding.severity {
            Severity::Error => 25,
            Severity::Warning => 10,
            Severity::Info => 2,
        })
        .sum();
    100u32.saturating_sub(penalty) as u8
}

fn finding(
    category: AuditCategory,
    severity: Severity,
    message: impl Into<String>,
    path: Option<&str>,
) -> AuditFinding {
    AuditFinding {
        category,
        severity,
        message: message.into(),
        path: path.map(str::to_string),
    }
}

#[async_trait]
impl AuditEngine for ProjectAuditor {
    async fn audit_project(&self, path: &Path, options: &AuditOptions) -> Result<AuditResult> {
        if !path.is_dir() {
            anyhow::bail!("{} is not a directory", path.display());
        }

        let root = path.to_path_buf();
        let files = tokio::task::spawn_blocking(move || Self::scan(&root))
            .await
            .context("Project scan panicked")?;

        let mut findings = Vec::new();
        let mut markers = 0usize;

        for file in &files {
            let name = file.absolute.file_name().and_then(|n| n.to_str());

            if options.security && name == Some(".env") {
                findings.push(finding(
                    AuditCategory::Security,
                    Severity::Error,
                    "environment file committed to the project",
                    Some(&file.relative),
                ));
            }
            if options.performance && file.size > LARGE_FILE_BYTES {
                findings.push(finding(
                    AuditCategory::Performance,
                    Severity::Warning,
                    format!("large file ({} bytes)", file.size),
                    Some(&file.relative),
                ));
                continue;
            }
            if !(options.security || options.quality) {
                continue;
            }

            let Ok(contents) = tokio::fs::read_to_string(&file.absolute).await else {
                continue;
            };
            if options.security && SECRET_PATTERNS.iter().any(|re| re.is_match(&contents)) {
                findings.push(finding(
                    AuditCategory::Security,
                    Severity::Error,
                    "possible hard-coded secret",
                    Some(&file.relative),
                ));
            }
            if options.quality {
                markers += MARKERS.find_iter(&contents).count();
            }
        }

        if options.quality {
            if markers > 0 {
                findings.push(finding(
                    AuditCategory::Quality,
                    Severity::Info,
                    format!("{markers} TODO/FIXME marker(s)"),
                    None,
                ));
            }
            if !path.join("tests").is_dir() && !path.join("test").is_dir() {
                findings.push(finding(
                    AuditCategory::Quality,
                    Severity::Warning,
                    "no tests directory",
                    None,
                ));
            }
        }
        if options.licenses && !path.join("LICENSE").is_file() {
            findings.push(finding(
                AuditCategory::License,
                Severity::Warning,
                "LICENSE file is missing",
                None,
            ));
        }

        let result = AuditResult {
            score: score(&findings),
            passed: !findings.iter().any(|f| f.severity == Severity::Error),
            findings,
        };
        debug!(
            path = %path.display(),
            files = files.len(),
            score = result.score,
            "Audited project"
        );
        Ok(result)
    }

    async fn generate_audit_report(
        &self,
        result: &AuditResult,
        format: ReportFormat,
    ) -> Result<Vec<u8>> {
        let status = if result.passed { "passed" } else { "failed" };
        let report = match format {
            ReportFormat::Json => return Ok(serde_json::to_vec_pretty(result)?),
            ReportFormat::Markdown => {
                let mut out = format!(
                    "# Audit Report\n\n**Score:** {}/100 ({status})\n\n",
                    result.score
                );
                for f in &result.findings {
                    let _ = writeln!(
                        out,
                        "- **{:?}** [{}] {}{}",
                        f.category,
                        f.severity,
                        f.message,
                        f.path.as_deref().map(|p| format!(" `{p}`")).unwrap_or_default()
                    );
                }
                out
            }
            ReportFormat::Text => {
                let mut out = format!("Audit {status}: score {}/100\n", result.score);
                for f in &result.findings {
                    let _ = writeln!(
                        out,
                        "[{}] {:?}: {}{}",
                        f.severity,
                        f.category,
                        f.message,
                        f.path.as_deref().map(|p| format!(" ({p})")).unwrap_or_default()
                    );
                }
                out
            }
        };
        Ok(report.into_bytes())
    }
}
