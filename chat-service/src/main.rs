use chat_service::config::ChatConfig;
use chat_service::startup::Application;
use service_core::error::AppError;
use service_core::observability::{init_metrics, init_tracing};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Load configuration - fail fast if invalid
    let config = ChatConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.log_format,
        config.otlp_endpoint.as_deref(),
    );

    let metrics = init_metrics()?;

    tracing::info!(
        service = %config.service_name,
        version = env!("CARGO_PKG_VERSION"),
        environment = ?config.environment,
        table = %config.database.table,
        "Starting chat service"
    );

    let app = Application::build(config, metrics).await?;
    app.run_until_stopped().await?;

    tracing::info!("Chat service stopped");
    Ok(())
}
