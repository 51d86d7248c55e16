use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

/// Install the global subscriber. Logs go to stderr so command output on
/// stdout stays machine readable. `RUST_LOG` overrides `level`.
pub fn init_telemetry(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    if json {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_writer(std::io::stderr),
            )
            .with(filter)
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .with(filter)
            .try_init()?;
    }

    tracing::debug!(json, "Scaffolder telemetry initialized");
    Ok(())
}

/// Generate a correlation ID for linking related operations
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Span wrapping one `execute` call; every call gets its own correlation id
pub fn create_workflow_span(kind: &str, workflow_id: &str) -> tracing::Span {
    tracing::info_span!(
        "workflow",
        workflow.kind = kind,
        workflow_id = workflow_id,
        correlation_id = %generate_correlation_id(),
        otel.kind = "internal"
    )
}

/// Span wrapping a single stage of a phase workflow
pub fn stage_span(workflow_id: &str, stage: &str) -> tracing::Span {
    tracing::debug_span!("stage", workflow_id = workflow_id, stage = stage)
}
