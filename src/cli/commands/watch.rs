use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

use super::{print_json, CommandContext};
use crate::phases::{ValidationAuditOptions, ValidationAuditResult};
use crate::workflow::{RegistryStats, WorkflowInfo};

pub struct WatchCommand {
    pub path: PathBuf,
    pub interval: Duration,
    pub iterations: Option<u32>,
    pub audit: bool,
}

/// What `watch` prints once the loop ends
#[derive(Debug, Serialize)]
pub struct WatchSummary {
    pub runs: u32,
    pub failures: u32,
    pub registry: RegistryStats,
    pub history: Vec<WorkflowInfo>,
}

impl WatchCommand {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            interval: Duration::from_secs(5),
            iterations: None,
            audit: false,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_iterations(mut self, iterations: Option<u32>) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_audit(mut self, audit: bool) -> Self {
        self.audit = audit;
        self
    }

    fn options(&self) -> ValidationAuditOptions {
        if self.audit {
            ValidationAuditOptions::default()
        } else {
            ValidationAuditOptions::validation_only()
        }
    }

    /// One validation run; failures are logged and counted, never fatal
    async fn run_once(&self, ctx: &CommandContext, run: u32) -> Result<bool> {
        let mut workflow = ctx
            .manager
            .create_validation_workflow(self.path.clone(), Some(self.options()))?;
        let outcome = ctx.manager.execute(&mut workflow, &ctx.execution()).await;

        let passed = match &outcome {
            Ok(result) => passed(result),
            Err(e) => {
                warn!(run, workflow_id = %workflow.id(), error = %e, "Watch run failed");
                false
            }
        };
        if !ctx.is_json() {
            let marker = if passed { "✅" } else { "❌" };
            match &outcome {
                Ok(result) => println!(
                    "{marker} run {run}: {} issue(s) in {}ms",
                    issue_count(result),
                    result.summary.duration_ms
                ),
                Err(e) => println!("{marker} run {run}: {e}"),
            }
        }
        Ok(passed)
    }

    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        if !ctx.is_json() {
            println!(
                "👀 Watching {} every {}s (Ctrl-C to stop)",
                self.path.display(),
                self.interval.as_secs()
            );
        }

        let mut runs = 0u32;
        let mut failures = 0u32;
        loop {
            runs += 1;
            if !self.run_once(ctx, runs).await? {
                failures += 1;
            }
            if self.iterations.is_some_and(|limit| runs >= limit) {
                break;
            }
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = tokio::signal::ctrl_c() => {
                    debug!(runs, "Watch interrupted");
                    break;
                }
            }
        }

        let summary = WatchSummary {
            runs,
            failures,
            registry: ctx.manager.registry().metrics().get_stats(),
            history: ctx.manager.list_history(),
        };
        if ctx.is_json() {
            print_json(&summary)?;
        } else {
            print_history(&summary);
        }
        Ok(())
    }
}

fn issue_count(result: &ValidationAuditResult) -> usize {
    result.validation.as_ref().map_or(0, |v| v.issues.len())
        + result.audit.as_ref().map_or(0, |a| a.findings.len())
}

fn passed(result: &ValidationAuditResult) -> bool {
    result.validation.as_ref().map_or(true, |v| v.valid)
        && result.audit.as_ref().map_or(true, |a| a.passed)
}

fn print_history(summary: &WatchSummary) {
    println!();
    println!(
        "📊 {} run(s), {} with problems; {} completed, {} failed, {} evicted",
        summary.runs,
        summary.failures,
        summary.registry.completed,
        summary.registry.failed,
        summary.registry.evicted
    );
    for info in &summary.history {
        println!(
            "   {} {} {} {}ms",
            info.id,
            info.kind,
            info.state,
            info.duration_ms.unwrap_or_default()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::WorkflowKind;

    #[test]
    fn test_audit_flag_selects_kind() {
        let plain = WatchCommand::new(".");
        assert_eq!(plain.options().kind().unwrap(), WorkflowKind::Validation);

        let audited = WatchCommand::new(".").with_audit(true);
        assert_eq!(audited.options().kind().unwrap(), WorkflowKind::ValidationAudit);
    }
}
