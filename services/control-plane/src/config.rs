use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub log_level: String,
    /// Deadline for each worker operation.
    pub request_timeout: Duration,
    /// Fetch-compute-write cycles allowed per reconciled object.
    pub reconcile_max_attempts: u32,
    /// JSON inventory of datacenters and clusters; none serves no clusters.
    pub inventory: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let listen_addr = lookup("FLEET_LISTEN_ADDR")
            .unwrap_or_else(|| "127.0.0.1:8080".to_string())
            .parse::<SocketAddr>()
            .context("FLEET_LISTEN_ADDR must be a socket address")?;

        let log_level = lookup("FLEET_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let request_timeout_secs = lookup("FLEET_REQUEST_TIMEOUT_SECS")
            .map(|v| v.parse::<u64>())
            .transpose()
            .context("FLEET_REQUEST_TIMEOUT_SECS must be a whole number of seconds")?
            .unwrap_or(30);
        if request_timeout_secs == 0 {
            bail!("FLEET_REQUEST_TIMEOUT_SECS must be positive");
        }

        let reconcile_max_attempts = lookup("FLEET_RECONCILE_MAX_ATTEMPTS")
            .map(|v| v.parse::<u32>())
            .transpose()
            .context("FLEET_RECONCILE_MAX_ATTEMPTS must be a whole number")?
            .unwrap_or(4);
        if reconcile_max_attempts == 0 {
            bail!("FLEET_RECONCILE_MAX_ATTEMPTS must be at least 1");
        }

        let inventory = lookup("FLEET_INVENTORY")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        Ok(Self {
            listen_addr,
            log_level,
            request_timeout: Duration::from_secs(request_timeout_secs),
            reconcile_max_attempts,
            inventory,
        })
    }
}
