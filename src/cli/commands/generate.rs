use anyhow::Result;
use std::path::PathBuf;

use super::{parse_vars, print_summary, CommandContext};
use crate::collaborators::ProjectConfig;
use crate::phases::{GenerationOptions, GenerationResult};

pub struct GenerateCommand {
    pub config: ProjectConfig,
    pub output: Option<PathBuf>,
    pub options: GenerationOptions,
}

impl GenerateCommand {
    pub fn new(name: impl Into<String>) -> Self {
        // Empty template means the configured default
        Self {
            config: ProjectConfig::new(name).with_template(""),
            output: None,
            options: GenerationOptions::default(),
        }
    }

    pub fn with_template(mut self, template: Option<String>) -> Self {
        if let Some(template) = template {
            self.config.template = template;
        }
        self
    }

    pub fn with_output(mut self, output: Option<PathBuf>) -> Self {
        self.output = output;
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.config.description = description.unwrap_or_default();
        self
    }

    pub fn with_license(mut self, license: Option<String>) -> Self {
        self.config.license = license;
        self
    }

    pub fn with_author(mut self, author: Option<String>) -> Self {
        self.config.author = author;
        self
    }

    pub fn with_version(mut self, version: Option<String>) -> Self {
        if let Some(version) = version {
            self.config.version = version;
        }
        self
    }

    pub fn with_vars(mut self, vars: &[String]) -> Result<Self> {
        self.config.variables.extend(parse_vars(vars)?);
        Ok(self)
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(&self.config.name))
    }

    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let mut config = self.config.clone();
        if config.template.is_empty() {
            config.template = ctx.default_template.clone();
        }
        let output_path = self.output_path();

        if !ctx.is_json() {
            println!(
                "🏗️  Generating '{}' from template '{}' into {}",
                config.name,
                config.template,
                output_path.display()
            );
        }

        let mut workflow =
            ctx.manager
                .create_project_workflow(config, output_path, Some(self.options.clone()))?;
        ctx.run(&mut workflow, render).await?;
        Ok(())
    }
}

fn render(result: &GenerationResult) {
    if let Some(backup) = &result.backup_path {
        println!("   📦 Existing directory moved to {}", backup.display());
    }
    if !result.generated_files.is_empty() {
        println!("   📁 Created: {}", result.generated_files.join(", "));
        println!("   ✏️  {} file(s) processed", result.files_processed);
    }
    if let Some(validation) = &result.validation {
        println!(
            "   🔍 Validation: {} ({} issue(s))",
            if validation.valid { "passed" } else { "failed" },
            validation.issues.len()
        );
    }
    if let Some(audit) = &result.audit {
        println!("   🛡️  Audit score: {}/100", audit.score);
    }
    print_summary(&result.summary);
}
