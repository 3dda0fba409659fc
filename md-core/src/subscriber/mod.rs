//! Multicast/TCP subscriber: per-channel links, each driving the
//! connect/login/snapshot/live cycle independently and forwarding decoded
//! wire frames for application against a [`crate::library::Library`].

pub mod config;
pub mod csv;
pub mod gap;
pub mod link;
pub mod resend;
pub mod transport;

pub use config::{ChannelConfig, SubscriberConfig};
pub use gap::{Gap, GapDetector};
pub use link::{Link, LinkState, LinkStats, TcpSubState};
pub use resend::PendingResend;

use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::wire::Frame;

/// Spawns one task per enabled channel, each running its [`Link`] forever,
/// and returns a single merged stream of decoded frames plus the handles to
/// each link's live state (for `subscriber.status`).
pub fn spawn_links(config: SubscriberConfig) -> (UnboundedReceiver<Frame>, Vec<std::sync::Arc<tokio::sync::RwLock<Link>>>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let mut handles = Vec::new();

    for channel in config.channels.iter().filter(|c| c.enabled).cloned() {
        let link = std::sync::Arc::new(tokio::sync::RwLock::new(Link::new(channel, &config)));
        handles.push(link.clone());
        let tx = tx.clone();
        tokio::spawn(async move {
            // `run` needs `&mut Link`; the lock is only ever held by this
            // task while driving the link, and briefly by `subscriber.status`.
            loop {
                let mut guard = link.write().await;
                // `run` never returns while `tx` stays open; this loop only
                // exists to re-acquire the lock if a future revision makes
                // `run` return early (e.g. on shutdown).
                guard.run(tx.clone()).await;
                drop(guard);
                if tx.is_closed() {
                    return;
                }
            }
        });
    }

    (rx, handles)
}
