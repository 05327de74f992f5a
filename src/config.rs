use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Server configuration beyond the command line.
///
/// Today that is just the bind-retry policy: how often to re-attempt binding
/// when the address is in use, and whether to ever give up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Seconds to wait between bind attempts when the address is in use
    #[serde(default = "default_retry_interval_secs")]
    pub retry_interval_secs: u64,

    /// How many times to retry binding; absent means retry forever
    #[serde(default)]
    pub max_bind_retries: Option<u32>,
}

fn default_retry_interval_secs() -> u64 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            retry_interval_secs: default_retry_interval_secs(),
            max_bind_retries: None,
        }
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }
}
