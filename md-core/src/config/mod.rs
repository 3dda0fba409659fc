//! Configuration
//!
//! A single TOML file describes the whole engine: one block per shard
//! (its thread name), the display timezone, and the subscriber's tuning.
//! Channel definitions live in a separate CSV named by
//! `subscriber.channels`.
//!
//! ```toml
//! timezone = "America/New_York"
//!
//! [[shards]]
//! thread = "md-shard-0"
//!
//! [[shards]]
//! thread = "md-shard-1"
//!
//! [subscriber]
//! max_queue_size = 100000
//! login_timeout_secs = 3
//! timeout_secs = 3
//! reconnect_freq_secs = 10
//! re_req_interval_secs = 1
//! re_req_max_gap = 10
//! channels = "config/channels.csv"
//! ```

pub mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Config = toml::from_str(&text)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.shards.is_empty() {
            anyhow::bail!("config must declare at least one shard");
        }
        Ok(())
    }
}
