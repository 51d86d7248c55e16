use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;

use scaffolder::cli::commands::{
    check::CheckCommand, config::ConfigCommand, generate::GenerateCommand,
    offline::OfflineCommand, watch::WatchCommand, CommandContext,
};
use scaffolder::cli::{Cli, Commands};
use scaffolder::collaborators::Collaborators;
use scaffolder::config::{init_config, ScaffolderConfig};
use scaffolder::observability::collaborator_metrics;
use scaffolder::phases::GenerationOptions;
use scaffolder::telemetry::init_telemetry;
use scaffolder::workflow::{WorkflowManager, WorkflowRegistry};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    ScaffolderConfig::load_env_file()?;
    let config = init_config()?;
    init_telemetry(
        &config.observability.log_level,
        config.observability.json_logs,
    )?;

    let cache_dir = cli
        .cache_dir
        .clone()
        .unwrap_or_else(|| config.cache.dir.clone());
    let manager = WorkflowManager::new(
        Arc::new(WorkflowRegistry::new(config.workflows.history_limit)),
        Collaborators::local(cache_dir.clone()),
    );
    let ctx = CommandContext::new(manager, cli.output_format)
        .with_default_template(config.templates.default_template.clone())
        .with_timeout(config.workflows.timeout());

    let result = match cli.command {
        None => show_usage(),
        Some(Commands::Generate {
            name,
            output,
            template,
            description,
            license,
            author,
            version,
            vars,
            force,
            backup,
            offline,
            no_validate,
            no_audit,
        }) => {
            let options = GenerationOptions {
                force,
                backup_existing: backup,
                offline,
                post_validation: !no_validate,
                post_audit: !no_audit,
                ..Default::default()
            };
            GenerateCommand::new(name)
                .with_output(output)
                .with_template(template)
                .with_description(description)
                .with_license(license)
                .with_author(author)
                .with_version(version)
                .with_vars(&vars)?
                .with_options(options)
                .execute(&ctx)
                .await
        }
        Some(Commands::Check {
            path,
            validate_only,
            audit_only,
            fix,
            report,
            report_format,
            report_path,
        }) => {
            CheckCommand::new(path)
                .with_scope(validate_only, audit_only)
                .with_fix(fix)
                .with_report(report, report_format, report_path)
                .execute(&ctx)
                .await
        }
        Some(Commands::Config {
            operation,
            path,
            name,
            template,
            sources,
        }) => {
            ConfigCommand::new(operation, path)
                .with_project(name, template)
                .with_sources(sources)
                .execute(&ctx)
                .await
        }
        Some(Commands::Offline {
            operation,
            name,
            output,
            template,
            repair,
            force,
        }) => {
            OfflineCommand::new(operation, cache_dir)
                .with_project(name, template, output)
                .with_repair(repair)
                .with_force(force)
                .execute(&ctx)
                .await
        }
        Some(Commands::Watch {
            path,
            interval,
            iterations,
            audit,
        }) => {
            WatchCommand::new(path)
                .with_interval(Duration::from_secs(interval))
                .with_iterations(iterations)
                .with_audit(audit)
                .execute(&ctx)
                .await
        }
    };

    collaborator_metrics().log_stats();
    ctx.manager.registry().metrics().log_stats();
    result
}

fn show_usage() -> Result<()> {
    println!("🏗️  Scaffolder - project generation and checks");
    println!();
    println!("  scaffolder generate <name>     # Create a project from a template");
    println!("  scaffolder check [path]        # Validate and audit a project");
    println!("  scaffolder config <op> <file>  # export | import | validate | merge");
    println!("  scaffolder offline <op>        # sync | validate | generate");
    println!("  scaffolder watch [path]        # Re-validate on an interval");
    println!();
    println!("💡 Add --output-format json for machine-readable results");
    Ok(())
}
