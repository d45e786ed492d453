use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Runtime settings, read from the environment (after `.env` is loaded).
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    /// Drop and recreate every table on startup.
    pub reset_db: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let db_path = lookup("TECHNEWS_DB_PATH").unwrap_or_else(|| "technews.db".into());
        let host = lookup("TECHNEWS_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = lookup("TECHNEWS_PORT")
            .unwrap_or_else(|| "3001".into())
            .parse()
            .context("TECHNEWS_PORT must be a port number")?;
        let reset_db = lookup("TECHNEWS_RESET_DB")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            db_path: db_path.into(),
            host,
            port,
            reset_db,
        })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}
