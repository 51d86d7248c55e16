use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::collaborators::ReportFormat;

pub mod commands;

#[derive(Parser)]
#[command(name = "scaffolder")]
#[command(about = "Project scaffolding, validation and audit workflows")]
#[command(long_about = "Scaffolder generates projects from built-in templates and runs validation, \
                       audit, configuration and offline cache workflows against them. Start with \
                       'scaffolder generate <name>'.")]
pub struct Cli {
    /// Output format for command results
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub output_format: OutputFormat,

    /// Template cache directory (overrides configuration)
    #[arg(long, global = true, help = "Directory holding the offline template cache")]
    pub cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a new project from a template
    Generate {
        /// Project name
        name: String,
        /// Target directory (defaults to ./<name>)
        #[arg(long, short = 'o', help = "Directory to generate into")]
        output: Option<PathBuf>,
        /// Template to use
        #[arg(long, short = 't', help = "Template: basic, library, cli")]
        template: Option<String>,
        #[arg(long, help = "One-line project description")]
        description: Option<String>,
        #[arg(long, help = "SPDX license identifier, e.g. MIT")]
        license: Option<String>,
        #[arg(long, help = "Project author")]
        author: Option<String>,
        #[arg(long, help = "Initial version")]
        version: Option<String>,
        /// Extra template variables
        #[arg(long = "var", value_name = "KEY=VALUE", help = "Template variable, may be repeated")]
        vars: Vec<String>,
        #[arg(long, help = "Overwrite an existing target directory")]
        force: bool,
        #[arg(long, help = "Move an existing target aside before overwriting")]
        backup: bool,
        #[arg(long, help = "Skip the template availability check")]
        offline: bool,
        #[arg(long, help = "Skip validation after generation")]
        no_validate: bool,
        #[arg(long, help = "Skip the audit after generation")]
        no_audit: bool,
    },
    /// Validate and audit an existing project
    Check {
        /// Project directory
        #[arg(default_value = ".")]
        path: PathBuf,
        #[arg(long, conflicts_with = "audit_only", help = "Run validation only")]
        validate_only: bool,
        #[arg(long, help = "Run the audit only")]
        audit_only: bool,
        #[arg(long, help = "Apply fixes for fixable validation issues")]
        fix: bool,
        #[arg(long, help = "Write a report file")]
        report: bool,
        #[arg(long, default_value = "json", help = "Report format: json, markdown, text")]
        report_format: ReportFormat,
        #[arg(long, help = "Report destination (defaults inside the project)")]
        report_path: Option<PathBuf>,
    },
    /// Export, import, validate or merge project configuration files
    Config {
        /// Operation: export, import, validate, merge
        operation: String,
        /// File to operate on (merge destination for merge)
        path: PathBuf,
        /// Project name written by export
        #[arg(long, help = "Project name for export")]
        name: Option<String>,
        #[arg(long, help = "Template recorded by export")]
        template: Option<String>,
        /// Merge sources, later ones override earlier ones
        #[arg(long = "source", help = "File merged into the destination, may be repeated")]
        sources: Vec<PathBuf>,
    },
    /// Work against the local template cache
    Offline {
        /// Operation: sync, validate, generate
        operation: String,
        /// Project name for generate
        #[arg(long, help = "Project name for offline generate")]
        name: Option<String>,
        /// Project directory for generate (defaults to ./<name>)
        #[arg(long, short = 'o', help = "Directory to generate into")]
        output: Option<PathBuf>,
        #[arg(long, short = 't', help = "Template for offline generate")]
        template: Option<String>,
        #[arg(long, help = "Repair the cache when validation fails")]
        repair: bool,
        #[arg(long, help = "Overwrite an existing target directory")]
        force: bool,
    },
    /// Re-run validation on an interval
    Watch {
        /// Project directory
        #[arg(default_value = ".")]
        path: PathBuf,
        #[arg(long, default_value = "5", help = "Seconds between runs")]
        interval: u64,
        /// Stop after this many runs
        #[arg(long, help = "Number of runs before exiting (runs forever when unset)")]
        iterations: Option<u32>,
        #[arg(long, help = "Include the audit in each run")]
        audit: bool,
    },
}
