use std::net::SocketAddr;
use thiserror::Error;

use crate::adapter::init::AppInitializerError;

/// Startup failures of the `tx_adapter` binary.
#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("Configuration error: {0:#}")]
    Configuration(anyhow::Error),

    #[error("Failed to initialize application state: {0}")]
    Initialization(#[from] AppInitializerError),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}
