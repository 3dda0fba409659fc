//! Thin tokio wrappers around the link's three socket roles: a TCP
//! connection for login/snapshot/resend replies, and a UDP socket for the
//! live multicast stream. Framing (header length + `bodyLen`) is shared
//! with the broadcast side via [`crate::wire`].

use std::net::SocketAddr;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};

use crate::core::MdError;
use crate::wire::{self, Frame, HDR_LEN};

pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    pub async fn connect(addr: SocketAddr) -> std::io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Self { stream })
    }

    pub async fn send(&mut self, frame: &Bytes) -> std::io::Result<()> {
        self.stream.write_all(frame).await
    }

    /// Reads exactly one frame: the fixed header, then whatever `bodyLen`
    /// declares. Matches `MxMDSubLink::TCP::process`'s read-header-then-body
    /// shape rather than relying on a fixed-size read.
    pub async fn recv_frame(&mut self) -> Result<Frame, MdError> {
        let mut hdr_buf = [0u8; HDR_LEN];
        self.stream
            .read_exact(&mut hdr_buf)
            .await
            .map_err(|e| MdError::Malformed { reason: format!("tcp header read failed: {e}") })?;

        let body_len = u16::from_le_bytes([hdr_buf[12], hdr_buf[13]]) as usize;
        let mut buf = BytesMut::with_capacity(HDR_LEN + body_len);
        buf.extend_from_slice(&hdr_buf);
        buf.resize(HDR_LEN + body_len, 0);
        self.stream
            .read_exact(&mut buf[HDR_LEN..])
            .await
            .map_err(|e| MdError::Malformed { reason: format!("tcp body read failed: {e}") })?;

        wire::decode(&buf.freeze())
    }
}

pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    pub async fn bind(local: SocketAddr) -> std::io::Result<Self> {
        Ok(Self { socket: UdpSocket::bind(local).await? })
    }

    /// Sends one datagram to `addr` — used for the control-plane messages
    /// (`ResendReq`) that travel over the same UDP socket as the live
    /// stream rather than a separate TCP control channel.
    pub async fn send_to(&self, frame: &Bytes, addr: SocketAddr) -> std::io::Result<()> {
        self.socket.send_to(frame, addr).await?;
        Ok(())
    }

    pub async fn join_multicast(&self, group: SocketAddr, local: SocketAddr) -> std::io::Result<()> {
        match (group, local) {
            (SocketAddr::V4(g), SocketAddr::V4(l)) => {
                self.socket.join_multicast_v4(*g.ip(), *l.ip())
            }
            _ => Ok(()), // IPv6 multicast groups carry an interface index, not an address; unsupported here.
        }
    }

    /// Receives one UDP datagram and decodes it as a single frame — each
    /// datagram on this feed carries exactly one record.
    pub async fn recv_frame(&self) -> Result<Frame, MdError> {
        let mut buf = vec![0u8; 64 * 1024];
        let n = self
            .socket
            .recv(&mut buf)
            .await
            .map_err(|e| MdError::Malformed { reason: format!("udp recv failed: {e}") })?;
        buf.truncate(n);
        wire::decode(&Bytes::from(buf))
    }
}
