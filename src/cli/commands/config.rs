use anyhow::Result;
use std::path::PathBuf;

use super::{print_summary, CommandContext};
use crate::collaborators::ProjectConfig;
use crate::phases::{ConfigurationOptions, ConfigurationResult};

pub struct ConfigCommand {
    pub path: PathBuf,
    pub options: ConfigurationOptions,
}

impl ConfigCommand {
    pub fn new(operation: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            options: ConfigurationOptions::new(operation),
        }
    }

    /// Configuration written by `export`, built from the command-line flags
    pub fn with_project(mut self, name: Option<String>, template: Option<String>) -> Self {
        self.options.config = name.map(|name| {
            let config = ProjectConfig::new(name);
            match template {
                Some(template) => config.with_template(template),
                None => config,
            }
        });
        self
    }

    pub fn with_sources(mut self, sources: Vec<PathBuf>) -> Self {
        self.options.sources = sources;
        self
    }

    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        if !ctx.is_json() {
            println!(
                "⚙️  Configuration {} on {}",
                self.options.operation,
                self.path.display()
            );
        }
        let mut workflow = ctx
            .manager
            .create_configuration_workflow(self.path.clone(), self.options.clone())?;
        ctx.run(&mut workflow, render).await?;
        Ok(())
    }
}

fn render(result: &ConfigurationResult) {
    if let Some(config) = &result.config {
        println!(
            "   📋 {} {} (template: {})",
            config.name, config.version, config.template
        );
        if let Some(license) = &config.license {
            println!("      license: {license}");
        }
        for (key, value) in &config.variables {
            println!("      {key} = {value}");
        }
    }
    for problem in &result.problems {
        println!("   ❌ {problem}");
    }
    print_summary(&result.summary);
}
