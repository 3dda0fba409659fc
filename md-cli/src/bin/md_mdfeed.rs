//! `md-mdfeed`: the subscriber-facing CLI.
//!
//! - `run` starts the engine (one shard per configured thread, plus the
//!   subscriber links and the Prometheus `/metrics` server) and blocks
//!   until Ctrl-C.
//! - `subscriber status` spawns the configured links and prints each
//!   link's state/stats once a second.
//! - `subscriber resend LINK SEQNO COUNT` sends a one-off `ResendReq` at a
//!   channel's resend endpoint, independent of any running engine.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use md_cli::common::{init_logging, load_config, pin_if_requested};
use md_core::config::Config;
use md_core::monitoring::{MetricsRegistry, MetricsServer, MetricsServerConfig};
use md_core::subscriber::{self, Gap, LinkState, PendingResend};
use tokio::net::UdpSocket;

#[derive(Parser, Debug)]
#[command(author, version, about = "Market data engine CLI")]
struct Cli {
    /// Path to the engine's TOML config file.
    #[arg(short, long, default_value = "config/md.toml")]
    config: PathBuf,

    /// CPU core to pin this process's main thread to.
    #[arg(short = 'c', long)]
    cpu_core: Option<usize>,

    /// Log level.
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the engine: shards, subscriber links, and the metrics server.
    Run {
        /// Address to serve Prometheus metrics on.
        #[arg(long, default_value = "127.0.0.1:9090")]
        metrics_addr: std::net::SocketAddr,
    },
    /// Subscriber link inspection and gap-fill commands.
    #[command(subcommand)]
    Subscriber(SubscriberCommand),
}

#[derive(Subcommand, Debug)]
enum SubscriberCommand {
    /// Print each configured link's connection state and stats once a
    /// second until interrupted.
    Status,
    /// Request a resend of `count` records starting at `seqno` from
    /// `link`'s resend endpoint.
    Resend {
        /// Channel id, as it appears in the channel CSV's first column.
        link: String,
        seqno: u64,
        count: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;
    pin_if_requested(cli.cpu_core)?;

    let config = load_config(&cli.config)?;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.subscriber.mx.worker_threads)
        .enable_all()
        .build()
        .context("building tokio runtime")?;

    match cli.command {
        Command::Run { metrics_addr } => rt.block_on(run(config, metrics_addr)),
        Command::Subscriber(SubscriberCommand::Status) => rt.block_on(subscriber_status(config)),
        Command::Subscriber(SubscriberCommand::Resend { link, seqno, count }) => {
            rt.block_on(subscriber_resend(config, &link, seqno, count))
        }
    }
}

async fn run(config: Config, metrics_addr: std::net::SocketAddr) -> Result<()> {
    let num_shards = config.shards.len();
    let library = Arc::new(md_core::Library::new(num_shards, None));
    tracing::info!(num_shards, "shards started");

    let registry = Arc::new(MetricsRegistry::new()?);
    let metrics_server = MetricsServer::new(
        MetricsServerConfig { listen_addr: metrics_addr, metrics_path: "/metrics".to_string() },
        registry.clone(),
    );
    tokio::spawn(metrics_server.serve());

    let sub_config = config.subscriber.resolve()?;
    let (mut rx, _links) = subscriber::spawn_links(sub_config);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let mut shutdown_tx = Some(shutdown_tx);
    ctrlc::set_handler(move || {
        if let Some(tx) = shutdown_tx.take() {
            let _ = tx.send(());
        }
    })
    .context("installing Ctrl-C handler")?;

    tokio::select! {
        _ = shutdown_rx => {
            tracing::info!("shutdown requested");
        }
        _ = async {
            while let Some(frame) = rx.recv().await {
                let op = format!("{:?}", frame.record_type);
                registry.book().operations_total.with_label_values(&[&op]).inc();
                if let Err(e) = library.apply(&frame) {
                    tracing::warn!(record_type = ?frame.record_type, error = %e, "failed to apply record");
                    registry.system().errors_total.with_label_values(&[e.kind()]).inc();
                }
            }
        } => {}
    }

    drop(library);
    Ok(())
}

async fn subscriber_status(config: Config) -> Result<()> {
    let sub_config = config.subscriber.resolve()?;
    if sub_config.channels.is_empty() {
        bail!("no enabled channels in {}", config.subscriber.channels.display());
    }
    let (_rx, links) = subscriber::spawn_links(sub_config);

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel();
    let mut shutdown_tx = Some(shutdown_tx);
    ctrlc::set_handler(move || {
        if let Some(tx) = shutdown_tx.take() {
            let _ = tx.send(());
        }
    })
    .context("installing Ctrl-C handler")?;

    loop {
        println!(
            "{:<12} {:<18} {:>10} {:>10} {:>8} {:>10}",
            "link", "state", "rx_seq", "tx_seq", "queue", "reconnects"
        );
        for link in &links {
            let guard = link.read().await;
            let stats = guard.stats();
            println!(
                "{:<12} {:<18} {:>10} {:>10} {:>8} {:>10}",
                guard.id(),
                state_name(guard.state()),
                stats.rx_seq_no,
                stats.tx_seq_no,
                stats.queue_len,
                stats.reconnect_count,
            );
        }
        println!();

        tokio::select! {
            _ = &mut shutdown_rx => return Ok(()),
            _ = tokio::time::sleep(Duration::from_secs(1)) => {}
        }
    }
}

fn state_name(state: LinkState) -> &'static str {
    match state {
        LinkState::Disconnected => "disconnected",
        LinkState::ConnectingTcp => "connecting_tcp",
        LinkState::UdpBinding => "udp_binding",
        LinkState::LoginSent => "login_sent",
        LinkState::SnapshotStreaming => "snapshot_streaming",
        LinkState::Live => "live",
    }
}

async fn subscriber_resend(config: Config, link: &str, seqno: u64, count: u64) -> Result<()> {
    let sub_config = config.subscriber.resolve()?;
    let channel = sub_config
        .channels
        .iter()
        .find(|c| c.id == link)
        .with_context(|| format!("no channel named {link} in {}", config.subscriber.channels.display()))?;

    let local_addr: std::net::SocketAddr = if channel.resend_primary.is_ipv4() {
        "0.0.0.0:0".parse().unwrap()
    } else {
        "[::]:0".parse().unwrap()
    };
    let socket = UdpSocket::bind(local_addr)
        .await
        .context("binding resend socket")?;

    let pending = PendingResend::new(Gap { from_seq_no: seqno, count }, std::time::Instant::now());
    let frame = pending.encode(0, 0);
    socket
        .send_to(&frame, channel.resend_primary)
        .await
        .with_context(|| format!("sending resend request to {}", channel.resend_primary))?;

    println!("requested {count} records from {link} starting at seqno {seqno}");
    Ok(())
}
