//! Per-link connection state machine.
//!
//! `Disconnected -> ConnectingTcp -> TcpConnected -> UdpBinding ->
//! UdpConnected -> LoginSent -> SnapshotStreaming -> Live -> [Disconnected]`,
//! per the subscriber link lifecycle. A link is a long-running task: `run`
//! drives the whole cycle and reconnects with the alternate endpoint on any
//! socket error or idle timeout, forwarding every decoded frame to `tx`.
//!
//! The per-leg typestate pattern (a distinct Rust type per state) doesn't
//! fit here — the state must live across `.await` points inside a single
//! `select!` loop — so this is a plain runtime enum instead, the way the
//! teacher models engine run-state elsewhere.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};
use zerocopy::byteorder::little_endian::U64;
use zerocopy::FromBytes;

use crate::wire::{Frame, LoginBody, RecordType};

use super::config::ChannelConfig;
use super::gap::GapDetector;
use super::resend::PendingResend;
use super::transport::{TcpTransport, UdpTransport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcpSubState {
    Login,
    Receiving,
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    ConnectingTcp,
    UdpBinding,
    LoginSent,
    SnapshotStreaming,
    Live,
}

#[derive(Debug, Clone, Default)]
pub struct LinkStats {
    pub reconnect_count: u64,
    pub rx_seq_no: u64,
    pub tx_seq_no: u64,
    pub queue_len: usize,
    pub last_gap: Option<u64>,
}

pub struct Link {
    config: ChannelConfig,
    max_queue_size: usize,
    login_timeout: Duration,
    idle_timeout: Duration,
    reconn_interval: Duration,
    re_req_interval: Duration,
    re_req_max_gap: u64,
    state: LinkState,
    tcp_sub_state: TcpSubState,
    stats: LinkStats,
    use_backup: bool,
}

impl Link {
    pub fn new(config: ChannelConfig, sub: &super::config::SubscriberConfig) -> Self {
        Self {
            config,
            max_queue_size: sub.max_queue_size,
            login_timeout: sub.login_timeout,
            idle_timeout: sub.timeout,
            reconn_interval: sub.reconn_interval,
            re_req_interval: sub.re_req_interval,
            re_req_max_gap: sub.re_req_max_gap,
            state: LinkState::Disconnected,
            tcp_sub_state: TcpSubState::Disconnected,
            stats: LinkStats::default(),
            use_backup: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn stats(&self) -> &LinkStats {
        &self.stats
    }

    fn tcp_addr(&self) -> std::net::SocketAddr {
        if self.use_backup { self.config.tcp_backup } else { self.config.tcp_primary }
    }

    fn udp_addr(&self) -> std::net::SocketAddr {
        if self.use_backup { self.config.udp_backup } else { self.config.udp_primary }
    }

    fn resend_addr(&self) -> std::net::SocketAddr {
        if self.use_backup { self.config.resend_backup } else { self.config.resend_primary }
    }

    /// Drives the link forever, reconnecting after any failure, forwarding
    /// every decoded frame (TCP and UDP alike) to `tx`. Returns only if
    /// `tx`'s receiver is dropped.
    pub async fn run(&mut self, tx: UnboundedSender<Frame>) {
        loop {
            if let Err(e) = self.run_once(&tx).await {
                warn!(link = %self.config.id, error = %e, "link cycle ended, reconnecting");
            }
            if tx.is_closed() {
                return;
            }
            self.state = LinkState::Disconnected;
            self.tcp_sub_state = TcpSubState::Disconnected;
            self.stats.reconnect_count += 1;
            self.use_backup = self.stats.reconnect_count % 2 == 1;
            tokio::time::sleep(self.reconn_interval).await;
        }
    }

    async fn run_once(&mut self, tx: &UnboundedSender<Frame>) -> anyhow::Result<()> {
        self.state = LinkState::ConnectingTcp;
        let mut tcp = TcpTransport::connect(self.tcp_addr()).await?;

        self.state = LinkState::UdpBinding;
        let udp = UdpTransport::bind(self.udp_addr()).await?;

        self.state = LinkState::LoginSent;
        self.tcp_sub_state = TcpSubState::Login;
        self.send_login(&mut tcp).await?;

        // The first valid frame received after Login is treated as the
        // ack — there is no dedicated LoginAck record.
        let first = tokio::time::timeout(self.login_timeout, tcp.recv_frame()).await??;
        self.tcp_sub_state = TcpSubState::Receiving;
        self.state = LinkState::SnapshotStreaming;
        info!(link = %self.config.id, "login acked, streaming snapshot");

        let mut gap = GapDetector::new();
        let mut pending_resend: Option<PendingResend> = None;
        let mut queue: VecDeque<Frame> = VecDeque::new();
        let mut end_of_snapshot: Option<u64> = None;

        self.dispatch_tcp_frame(first, tx, &mut end_of_snapshot)?;

        loop {
            tokio::select! {
                tcp_frame = tokio::time::timeout(self.idle_timeout, tcp.recv_frame()) => {
                    let frame = tcp_frame??;
                    self.dispatch_tcp_frame(frame, tx, &mut end_of_snapshot)?;
                }
                udp_frame = udp.recv_frame() => {
                    let frame = udp_frame?;
                    self.stats.rx_seq_no = frame.hdr.seq_no();
                    if end_of_snapshot.is_some() {
                        self.dispatch_live(frame, tx)?;
                    } else {
                        queue.push_back(frame);
                        if queue.len() > self.max_queue_size {
                            anyhow::bail!("rx queue exceeded maxQueueSize ({})", self.max_queue_size);
                        }
                    }

                    if let Some(g) = gap.check(self.stats.rx_seq_no) {
                        self.stats.last_gap = Some(g.count);
                        if g.count > self.re_req_max_gap {
                            anyhow::bail!("gap of {} exceeds reReqMaxGap ({})", g.count, self.re_req_max_gap);
                        }
                        let mut req = PendingResend::new(g, Instant::now());
                        self.send_resend(&udp, &req).await?;
                        req.mark_sent(Instant::now());
                        pending_resend = Some(req);
                    }
                }
            }

            if let Some(x) = end_of_snapshot.take() {
                while let Some(queued) = queue.pop_front() {
                    if queued.hdr.seq_no() > x {
                        self.dispatch_live(queued, tx)?;
                    }
                }
                self.state = LinkState::Live;
                info!(link = %self.config.id, end_of_snapshot = x, "switched to live stream");
            }

            if let Some(req) = pending_resend.as_mut() {
                if req.should_retry(self.re_req_interval, Instant::now()) {
                    self.send_resend(&udp, req).await?;
                    req.mark_sent(Instant::now());
                }
            }
            self.stats.queue_len = queue.len();
        }
    }

    fn dispatch_tcp_frame(
        &mut self,
        frame: Frame,
        tx: &UnboundedSender<Frame>,
        end_of_snapshot: &mut Option<u64>,
    ) -> anyhow::Result<()> {
        if frame.record_type == RecordType::EndOfSnapshot {
            let seq_no = U64::read_from_bytes(&frame.body[..8]).expect("body_len validated on decode").get();
            *end_of_snapshot = Some(seq_no);
            return Ok(());
        }
        self.stats.tx_seq_no = frame.hdr.seq_no();
        if tx.send(frame).is_err() {
            anyhow::bail!("frame receiver dropped");
        }
        Ok(())
    }

    fn dispatch_live(&self, frame: Frame, tx: &UnboundedSender<Frame>) -> anyhow::Result<()> {
        if tx.send(frame).is_err() {
            anyhow::bail!("frame receiver dropped");
        }
        Ok(())
    }

    async fn send_login(&self, tcp: &mut TcpTransport) -> anyhow::Result<()> {
        let mut body = LoginBody { user: [0u8; 16], password: [0u8; 16] };
        let user = self.config.username.as_bytes();
        let pass = self.config.password.as_bytes();
        body.user[..user.len().min(16)].copy_from_slice(&user[..user.len().min(16)]);
        body.password[..pass.len().min(16)].copy_from_slice(&pass[..pass.len().min(16)]);
        let frame = crate::wire::encode(0, 0, RecordType::Login, &body);
        tcp.send(&frame).await?;
        Ok(())
    }

    /// Sends a `ResendReq` to the channel's UDP resend endpoint. The
    /// gap-fill reply comes back as ordinary records on the same multicast
    /// stream the live feed uses, not over this socket.
    async fn send_resend(&self, udp: &UdpTransport, req: &PendingResend) -> anyhow::Result<()> {
        let frame = req.encode(0, 0);
        udp.send_to(&frame, self.resend_addr()).await?;
        Ok(())
    }
}
