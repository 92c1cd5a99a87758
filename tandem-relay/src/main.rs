use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tandem_relay::{RelayConfig, RelayService, router};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = RelayConfig::from_env();
    let service = RelayService::new();
    let app = router(service);

    let listener = tokio::net::TcpListener::bind(config.addr()).await?;
    info!("signaling relay listening on {}", config.addr());
    axum::serve(listener, app).await?;

    Ok(())
}
