use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Initialize tracing with JSON output for structured logging.
/// Progress intended for humans goes through the CLI layer; this stream is
/// for operators correlating a run across the external services it touches.
pub fn init_telemetry() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true),
        )
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    tracing::info!("Covgate telemetry initialized with structured logging");
    Ok(())
}

/// Generate a correlation ID linking one run's operations across targets
pub fn generate_run_correlation_id() -> String {
    Uuid::new_v4().to_string()
}
