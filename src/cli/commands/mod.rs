use anyhow::Result;
use serde::Serialize;
use std::time::Duration;

use crate::cli::OutputFormat;
use crate::workflow::{
    ExecutionContext, PhaseWorkflow, RunSummary, Workflow, WorkflowManager,
};

pub mod check;
pub mod config;
pub mod generate;
pub mod offline;
pub mod watch;

/// Shared state handed to every command
#[derive(Clone)]
pub struct CommandContext {
    pub manager: WorkflowManager,
    pub output_format: OutputFormat,
    pub default_template: String,
    /// Deadline applied to each workflow run
    pub timeout: Option<Duration>,
}

impl CommandContext {
    pub fn new(manager: WorkflowManager, output_format: OutputFormat) -> Self {
        Self {
            manager,
            output_format,
            default_template: "basic".to_string(),
            timeout: None,
        }
    }

    pub fn with_default_template(mut self, template: impl Into<String>) -> Self {
        self.default_template = template.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// A fresh context per run so every run gets the full deadline
    pub fn execution(&self) -> ExecutionContext {
        match self.timeout {
            Some(timeout) => ExecutionContext::with_timeout(timeout),
            None => ExecutionContext::new(),
        }
    }

    pub fn is_json(&self) -> bool {
        self.output_format == OutputFormat::Json
    }

    /// Execute a workflow and print its result, even when the run failed
    pub async fn run<P, F>(&self, workflow: &mut Workflow<P>, render_text: F) -> Result<P::Output>
    where
        P: PhaseWorkflow,
        F: Fn(&P::Output),
    {
        let outcome = self.manager.execute(workflow, &self.execution()).await;
        if let Some(result) = workflow.last_result() {
            if self.is_json() {
                print_json(result)?;
            } else {
                render_text(result);
            }
        }
        Ok(outcome?)
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Warnings and errors shared by every text rendering
pub fn print_summary(summary: &RunSummary) {
    for warning in &summary.warnings {
        println!("   ⚠️  {warning}");
    }
    for error in &summary.errors {
        println!("   ❌ {error}");
    }
    let status = if summary.success { "✅ Done" } else { "❌ Failed" };
    println!("{status} in {}ms", summary.duration_ms);
}

/// Parse `KEY=VALUE` pairs from repeated command-line flags
pub fn parse_vars(vars: &[String]) -> Result<Vec<(String, String)>> {
    vars.iter()
        .map(|raw| {
            let (key, value) = raw
                .split_once('=')
                .ok_or_else(|| anyhow::anyhow!("expected KEY=VALUE, got '{raw}'"))?;
            let key = key.trim();
            if key.is_empty() {
                anyhow::bail!("empty variable name in '{raw}'");
            }
            Ok((key.to_string(), value.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vars() {
        let vars = parse_vars(&["crate_type=bin".to_string(), "motto=a=b".to_string()]).unwrap();
        assert_eq!(vars[0], ("crate_type".to_string(), "bin".to_string()));
        assert_eq!(vars[1].1, "a=b");

        assert!(parse_vars(&["novalue".to_string()]).is_err());
        assert!(parse_vars(&["=x".to_string()]).is_err());
    }
}
