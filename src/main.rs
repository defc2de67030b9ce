use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tx_adapter::adapter::config::AppConfig;
use tx_adapter::adapter::init::AppInitializer;
use tx_adapter::adapter::web::create_router::create_router;
use tx_adapter::error::ApplicationError;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env().map_err(ApplicationError::Configuration)?;
    let state = AppInitializer::initialize(&config)
        .await
        .map_err(ApplicationError::from)?;

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .map_err(|source| ApplicationError::Bind {
            addr: config.bind_addr,
            source,
        })?;

    info!(
        bind_addr = %config.bind_addr,
        io_max_in_flight = config.io_max_in_flight,
        "server running"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tx_adapter=debug,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "unable to install ctrl+c handler");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
