use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context};
use wealthgoals_core::goals::Compounding;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub seed_path: Option<PathBuf>,
    /// Empty means any origin
    pub cors_allow_origins: Vec<String>,
    pub request_timeout: Duration,
    pub log_format: LogFormat,
    pub compounding: Compounding,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8088)),
            seed_path: None,
            cors_allow_origins: Vec::new(),
            request_timeout: Duration::from_millis(30_000),
            log_format: LogFormat::Pretty,
            compounding: Compounding::Monthly,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from `lookup`, which returns the raw value of a
    /// `WF_*` variable.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let listen_addr = match get("WF_LISTEN_ADDR") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("WF_LISTEN_ADDR '{}' is not a socket address", raw))?,
            None => defaults.listen_addr,
        };

        let cors_allow_origins = match get("WF_CORS_ALLOW_ORIGINS") {
            Some(raw) if raw != "*" => raw
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
            _ => Vec::new(),
        };

        let request_timeout = match get("WF_REQUEST_TIMEOUT_MS") {
            Some(raw) => Duration::from_millis(
                raw.parse()
                    .with_context(|| format!("WF_REQUEST_TIMEOUT_MS '{}' is not a number", raw))?,
            ),
            None => defaults.request_timeout,
        };

        let log_format = match get("WF_LOG_FORMAT").as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => return Err(anyhow!("WF_LOG_FORMAT '{}' must be 'pretty' or 'json'", other)),
        };

        let compounding = match get("WF_PROJECTION_COMPOUNDING") {
            Some(raw) => raw.parse().map_err(|e: String| anyhow!("WF_PROJECTION_COMPOUNDING: {}", e))?,
            None => defaults.compounding,
        };

        Ok(Self {
            listen_addr,
            seed_path: get("WF_SEED_PATH").map(PathBuf::from),
            cors_allow_origins,
            request_timeout,
            log_format,
            compounding,
        })
    }
}
