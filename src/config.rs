//! Configuration module - endpoint and session settings

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::strategy::{INITIAL_CHUNK, MAX_CHUNK, MIN_CHUNK};

/// Default retry bound per chunk
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default per-attempt timeout in seconds
pub const DEFAULT_ATTEMPT_TIMEOUT_SECS: u64 = 30;

/// Default description sent in the creation request
pub const DEFAULT_DESCRIPTION: &str = "Resumable upload";

/// Default distributor sent in the creation request
pub const DEFAULT_DISTRIBUTOR: &str = env!("CARGO_PKG_NAME");

/// Optional configuration parameters for Config::new()
#[derive(Debug, Clone, Default)]
pub struct ConfigOptions {
    pub token: Option<String>,
    pub max_retries: Option<u32>,
    pub attempt_timeout_secs: Option<u64>,
    pub initial_chunk_size: Option<u64>,
    pub no_adaptive: bool,
    pub description: Option<String>,
    pub distributor: Option<String>,
}

/// Main configuration struct
#[derive(Debug, Clone)]
pub struct Config {
    /// Upload endpoint; creation is POSTed here, chunks go to `<endpoint>/<id>`
    pub endpoint: String,
    pub token: Option<String>,
    pub max_retries: u32,
    pub attempt_timeout_secs: u64,
    pub initial_chunk_size: u64,
    pub no_adaptive: bool,
    pub description: String,
    pub distributor: String,
}

impl Config {
    /// Create a new Config with the required endpoint plus optional settings
    pub fn new(endpoint: String, options: ConfigOptions) -> Result<Arc<Self>> {
        let endpoint = endpoint.trim();
        if endpoint.is_empty() {
            return Err(anyhow!("endpoint cannot be empty"));
        }

        // Only add a scheme when none is given
        let endpoint = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            format!("https://{}", endpoint)
        };
        let endpoint = endpoint.trim_end_matches('/').to_string();

        let attempt_timeout_secs = options
            .attempt_timeout_secs
            .unwrap_or(DEFAULT_ATTEMPT_TIMEOUT_SECS);
        if attempt_timeout_secs == 0 {
            return Err(anyhow!("attempt timeout must be at least 1 second"));
        }

        let token = options
            .token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        Ok(Arc::new(Self {
            endpoint,
            token,
            max_retries: options.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            attempt_timeout_secs,
            initial_chunk_size: options
                .initial_chunk_size
                .unwrap_or(INITIAL_CHUNK)
                .clamp(MIN_CHUNK, MAX_CHUNK),
            no_adaptive: options.no_adaptive,
            description: options
                .description
                .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
            distributor: options
                .distributor
                .unwrap_or_else(|| DEFAULT_DISTRIBUTOR.to_string()),
        }))
    }

    /// Per-attempt request timeout
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    /// URL addressing one upload resource
    pub fn resource_url(&self, resource_id: &str) -> String {
        format!("{}/{}", self.endpoint, resource_id)
    }
}
