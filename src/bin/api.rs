use lk_tax_extractor::{api::start_server, create_backend, ExtractorConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load environment variables
    let config = ExtractorConfig::from_env()?;

    info!("🚀 Tax Figure Extractor - API Server");
    info!("📍 Port: {}", config.port);

    let backend = create_backend(&config)?;

    info!("✅ Backend initialized: {}", backend.name());
    info!("📡 Starting API server...");

    // Start API server
    start_server(backend, config.port).await?;

    Ok(())
}
