//! Environment configuration for the hub binary and the demo client.

use std::{env, fmt::Display, net::SocketAddr, str::FromStr};

use tracing::{info, warn};

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub hub_url: String,
}

impl Config {
    /// Reads `SURVALE_HOST`, `SURVALE_PORT` and `SURVALE_HUB_URL`, falling
    /// back to defaults for anything unset or unparseable.
    pub fn load() -> Self {
        Self {
            host: try_load("SURVALE_HOST", String::from("127.0.0.1")),
            port: try_load("SURVALE_PORT", 3000u16),
            hub_url: try_load("SURVALE_HUB_URL", String::from("ws://127.0.0.1:3000/ws")),
        }
    }

    /// Socket address the hub binds to.
    pub fn bind_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::InvalidConfig(format!("bind address: {e}")))
    }
}

fn try_load<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|e| {
            warn!("Invalid {key} value '{raw}': {e}, using default: {default}");
            default
        }),
        Err(_) => {
            info!("{key} not set, using default: {default}");
            default
        }
    }
}
