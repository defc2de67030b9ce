use std::net::SocketAddr;

use anyhow::{Context, Result};

use crate::core::dispatch::{DispatcherConfig, DEFAULT_MAX_IN_FLIGHT};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub io_max_in_flight: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let bind_addr = env_string("TX_BIND_ADDR", "127.0.0.1:3000")
            .parse::<SocketAddr>()
            .context("TX_BIND_ADDR must be a valid host:port")?;

        let io_max_in_flight = env_string("TX_IO_MAX_IN_FLIGHT", &DEFAULT_MAX_IN_FLIGHT.to_string())
            .parse::<usize>()
            .context("TX_IO_MAX_IN_FLIGHT must be a positive integer")?;
        anyhow::ensure!(io_max_in_flight > 0, "TX_IO_MAX_IN_FLIGHT must be greater than zero");

        Ok(Self {
            bind_addr,
            io_max_in_flight,
        })
    }

    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            max_in_flight: self.io_max_in_flight,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            io_max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
