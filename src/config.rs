//! Service configuration sourced from environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Runtime configuration.
///
/// | Variable                 | Default                  |
/// |--------------------------|--------------------------|
/// | `FEED_VEHICLE_POSITIONS` | empty (feed disabled)    |
/// | `FEED_TRIP_UPDATES`      | empty (feed disabled)    |
/// | `AGENCY_ID`              | `unknown_agency`         |
/// | `CITY`                   | `unknown_city`           |
/// | `POLL_SECONDS`           | `15`                     |
/// | `LOG_PATH`               | `/var/log/ptla/app.log`  |
/// | `PTLA_HOST`              | `0.0.0.0`                |
/// | `PTLA_PORT`              | `8000`                   |
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub vehicle_positions_url: String,
    pub trip_updates_url: String,
    pub agency_id: String,
    pub city: String,
    pub poll_interval: Duration,
    /// Destination of the per-cycle snapshot lines.
    pub log_path: PathBuf,
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if `POLL_SECONDS` or `PTLA_PORT` is set but not a
    /// valid number.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let poll_seconds = lookup("POLL_SECONDS")
            .map(|v| v.parse::<u64>())
            .transpose()
            .context("POLL_SECONDS must be a whole number of seconds")?
            .unwrap_or(15);

        let port = lookup("PTLA_PORT")
            .map(|v| v.parse::<u16>())
            .transpose()
            .context("PTLA_PORT must be a valid port number")?
            .unwrap_or(8000);

        Ok(Self {
            vehicle_positions_url: var("FEED_VEHICLE_POSITIONS", ""),
            trip_updates_url: var("FEED_TRIP_UPDATES", ""),
            agency_id: var("AGENCY_ID", "unknown_agency"),
            city: var("CITY", "unknown_city"),
            poll_interval: Duration::from_secs(poll_seconds),
            log_path: PathBuf::from(var("LOG_PATH", "/var/log/ptla/app.log")),
            host: var("PTLA_HOST", "0.0.0.0"),
            port,
        })
    }

    /// Returns the socket address for the HTTP surface.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}
