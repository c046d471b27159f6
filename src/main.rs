use anyhow::Result;
use inspect_pipeline::{
    build_completion_client, build_notifier,
    config::{Config, RuntimeConfig},
    http::{AppState, start_http_server},
    workflows::{DiagnosisWorkflow, InspectionWorkflow},
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    inspect_pipeline::load_env();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(RuntimeConfig::default().log_level)),
        )
        .init();

    let config = Config::load()?;
    info!(
        "Starting inspect-pipeline {} (log filter: {})",
        env!("CARGO_PKG_VERSION"),
        config.runtime.log_level
    );

    let client = build_completion_client(&config)?;
    let notifier = build_notifier(&config)?;
    let inspection = Arc::new(InspectionWorkflow::new(
        &config,
        client.clone(),
        notifier.clone(),
    )?);
    let diagnosis = Arc::new(DiagnosisWorkflow::new(&config, client, notifier)?);

    let state = AppState::new(Arc::new(config), inspection, diagnosis);
    start_http_server(state).await
}
