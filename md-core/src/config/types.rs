//! Configuration record types. Plain, serde-friendly shapes (duration
//! fields as `_secs: u64`, matching the teacher's `replay_end_timeout_secs`
//! convention) that `SubscriberFileConfig::resolve` turns into the runtime
//! types the shard/subscriber code actually uses.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::subscriber::{csv, ChannelConfig, SubscriberConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShardConfig {
    /// OS thread name for this shard, e.g. `md-shard-0`.
    pub thread: String,
}

/// Tuning for the subscriber's underlying tokio reactor — the Rust-native
/// analogue of the original engine's I/O multiplexer thread pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MxConfig {
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
}

impl Default for MxConfig {
    fn default() -> Self {
        Self { worker_threads: default_worker_threads() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriberFileConfig {
    #[serde(default)]
    pub mx: MxConfig,
    #[serde(default)]
    pub interface: Option<String>,
    #[serde(default)]
    pub filter: bool,
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,
    #[serde(default = "default_login_timeout_secs")]
    pub login_timeout_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_reconnect_freq_secs")]
    pub reconnect_freq_secs: u64,
    #[serde(default = "default_re_req_interval_secs")]
    pub re_req_interval_secs: u64,
    #[serde(default = "default_re_req_max_gap")]
    pub re_req_max_gap: u64,
    /// Path to the 16-column channel CSV.
    pub channels: PathBuf,
}

impl SubscriberFileConfig {
    /// Resolves this file config into the runtime [`SubscriberConfig`],
    /// reading and parsing the channel CSV it names.
    pub fn resolve(&self) -> anyhow::Result<SubscriberConfig> {
        let csv_text = std::fs::read_to_string(&self.channels)
            .with_context(|| format!("reading channel CSV {}", self.channels.display()))?;
        let channels: Vec<ChannelConfig> = csv::parse_channels(&csv_text)?;
        Ok(SubscriberConfig {
            interface: self.interface.clone(),
            filter: self.filter,
            max_queue_size: self.max_queue_size,
            login_timeout: Duration::from_secs(self.login_timeout_secs),
            timeout: Duration::from_secs(self.timeout_secs),
            reconn_interval: Duration::from_secs(self.reconnect_freq_secs),
            re_req_interval: Duration::from_secs(self.re_req_interval_secs),
            re_req_max_gap: self.re_req_max_gap,
            channels,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub shards: Vec<ShardConfig>,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    pub subscriber: SubscriberFileConfig,
}

fn default_worker_threads() -> usize {
    2
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_max_queue_size() -> usize {
    100_000
}

fn default_login_timeout_secs() -> u64 {
    3
}

fn default_timeout_secs() -> u64 {
    3
}

fn default_reconnect_freq_secs() -> u64 {
    10
}

fn default_re_req_interval_secs() -> u64 {
    1
}

fn default_re_req_max_gap() -> u64 {
    10
}
