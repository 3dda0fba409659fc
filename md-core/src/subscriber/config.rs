//! Per-link configuration, as loaded from a channel CSV row, plus the
//! subscriber-engine-wide tunables from §4.9.

use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub id: String,
    pub tcp_primary: SocketAddr,
    pub tcp_backup: SocketAddr,
    pub udp_primary: SocketAddr,
    pub udp_backup: SocketAddr,
    pub resend_primary: SocketAddr,
    pub resend_backup: SocketAddr,
    pub username: String,
    pub password: String,
    pub enabled: bool,
}

#[derive(Debug, Clone)]
pub struct SubscriberConfig {
    pub interface: Option<String>,
    pub filter: bool,
    pub max_queue_size: usize,
    pub login_timeout: Duration,
    pub timeout: Duration,
    pub reconn_interval: Duration,
    pub re_req_interval: Duration,
    pub re_req_max_gap: u64,
    pub channels: Vec<ChannelConfig>,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            interface: None,
            filter: false,
            max_queue_size: 100_000,
            login_timeout: Duration::from_secs(3),
            timeout: Duration::from_secs(3),
            reconn_interval: Duration::from_secs(10),
            re_req_interval: Duration::from_secs(1),
            re_req_max_gap: 10,
            channels: Vec::new(),
        }
    }
}
