use dotenvy::dotenv;
use portal_service::config::PortalConfig;
use portal_service::startup::Application;
use service_core::observability::logging::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = PortalConfig::load().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    init_tracing(&config.service_name, &config.log_level, &config.otlp_endpoint)?;

    portal_service::services::metrics::init_metrics()?;

    tracing::info!(
        service = %config.service_name,
        version = env!("CARGO_PKG_VERSION"),
        environment = ?config.environment,
        failure_policy = %config.reconciliation.failure_policy,
        "Starting portal-service"
    );

    let application = Application::build(config).await?;
    application.run_until_stopped().await
}
