//! TCP side of the bridge: the listening socket and the single active client.
//!
//! # Responsibilities
//!
//! 1. Bind the listener on the configured `{ip, port}` with the configured
//!    backlog.
//! 2. Accept one client at a time and keep its stream split into a read half
//!    (used only by InterfaceRx) and a write half (used only by InterfaceTx).
//! 3. Perform exactly one read or one write per call, in relay-buffer units.
//!
//! # Read outcomes
//!
//! ```text
//! read() → n > 0                       ReadOutcome::Data(frame of n bytes)
//! read() → 0                           ReadOutcome::PeerClosed
//! read() → ECONNRESET / ECONNABORTED   ReadOutcome::PeerClosed
//! read() → any other error             Err(SocketError::Read)   (fatal)
//! no client installed                  ReadOutcome::NotConnected
//! ```
//!
//! A reset or abort is the client going away without a clean close, so it
//! ends the session the same way a zero-length read does and the service
//! waits for the next client.  Any other read error is fatal.
//!
//! Writes are best effort: one `write` call, a short write is logged and the
//! remainder is not retried.

use std::net::{IpAddr, SocketAddr};
use std::sync::Mutex as StdMutex;

use serial_core::{Frame, FRAME_SIZE};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpSocket};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Errors raised by the socket channel.
#[derive(Debug, Error)]
pub enum SocketError {
    /// The configured listen address is not an IP literal.
    #[error("invalid listen address: {0}")]
    InvalidAddress(String),

    /// Creating, binding or listening on the socket failed.
    #[error("bind failed on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// `accept` on the listener failed.
    #[error("accept failed: {0}")]
    Accept(#[source] std::io::Error),

    /// Reading from the client failed for a reason other than a peer close.
    #[error("read from interface client failed: {0}")]
    Read(#[source] std::io::Error),

    /// Writing to the client failed.
    #[error("write to interface client failed: {0}")]
    Write(#[source] std::io::Error),

    /// A write was attempted with no client attached.
    #[error("no interface client connected")]
    NotConnected,
}

/// Result of a single [`SocketChannel::read_once`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    Data(Frame),
    PeerClosed,
    NotConnected,
}

/// Identity of the currently attached client, for log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub id: Uuid,
    pub peer: SocketAddr,
}

/// Listening socket plus the (at most one) active client connection.
///
/// The two halves sit behind separate async mutexes so a read blocked waiting
/// for the client never delays a write in the other direction.
pub struct SocketChannel {
    listener: TcpListener,
    local_addr: SocketAddr,
    reader: Mutex<Option<OwnedReadHalf>>,
    writer: Mutex<Option<OwnedWriteHalf>>,
    active: StdMutex<Option<ConnectionInfo>>,
}

impl SocketChannel {
    /// Parses `address`, then binds and listens on `address:port`.
    ///
    /// Must be called from within a Tokio runtime.  Port `0` asks the OS for
    /// a free port; see [`local_addr`](Self::local_addr).
    ///
    /// # Errors
    ///
    /// [`SocketError::InvalidAddress`] if `address` is not an IP literal,
    /// [`SocketError::Bind`] if the socket cannot be created, bound (e.g. the
    /// port is in use) or put into listening mode.
    pub fn bind(address: &str, port: u16, backlog: u32) -> Result<Self, SocketError> {
        let ip: IpAddr = address
            .trim()
            .parse()
            .map_err(|_| SocketError::InvalidAddress(address.to_string()))?;
        let addr = SocketAddr::new(ip, port);
        let bind_err = |source: std::io::Error| SocketError::Bind { addr, source };

        let socket = match addr {
            SocketAddr::V4(_) => TcpSocket::new_v4(),
            SocketAddr::V6(_) => TcpSocket::new_v6(),
        }
        .map_err(bind_err)?;

        // Lets a restarted service rebind while old connections sit in
        // TIME_WAIT; an active listener on the port still makes bind fail.
        #[cfg(unix)]
        socket.set_reuseaddr(true).map_err(bind_err)?;

        socket.bind(addr).map_err(bind_err)?;
        let listener = socket.listen(backlog).map_err(bind_err)?;
        let local_addr = listener.local_addr().map_err(bind_err)?;

        info!(address = %local_addr, backlog, "interface listener bound");

        Ok(Self {
            listener,
            local_addr,
            reader: Mutex::new(None),
            writer: Mutex::new(None),
            active: StdMutex::new(None),
        })
    }

    /// Address the listener is actually bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Waits for the next client and installs it as the active connection.
    ///
    /// Any previous connection must already have been closed with
    /// [`close_connection`](Self::close_connection); it is replaced otherwise.
    ///
    /// # Errors
    ///
    /// [`SocketError::Accept`] if `accept` fails.
    pub async fn accept_next(&self) -> Result<SocketAddr, SocketError> {
        let (stream, peer) = self.listener.accept().await.map_err(SocketError::Accept)?;
        if let Err(e) = stream.set_nodelay(true) {
            debug!(peer = %peer, error = %e, "could not disable Nagle on client socket");
        }

        let (read_half, write_half) = stream.into_split();
        *self.reader.lock().await = Some(read_half);
        *self.writer.lock().await = Some(write_half);

        let info = ConnectionInfo {
            id: Uuid::new_v4(),
            peer,
        };
        *self.active_slot() = Some(info);

        info!(peer = %peer, connection_id = %info.id, "interface client connected");
        Ok(peer)
    }

    /// Reads at most one relay buffer from the active client.
    ///
    /// # Errors
    ///
    /// [`SocketError::Read`] for read failures other than a peer close or
    /// reset.  The caller treats these as fatal.
    pub async fn read_once(&self) -> Result<ReadOutcome, SocketError> {
        let mut guard = self.reader.lock().await;
        let Some(reader) = guard.as_mut() else {
            return Ok(ReadOutcome::NotConnected);
        };

        let mut buf = [0u8; FRAME_SIZE];
        match reader.read(&mut buf).await {
            Ok(0) => Ok(ReadOutcome::PeerClosed),
            Ok(n) => Frame::new(&buf[..n])
                .map(ReadOutcome::Data)
                .map_err(|e| SocketError::Read(std::io::Error::new(std::io::ErrorKind::InvalidData, e))),
            Err(e) if is_peer_reset(&e) => {
                debug!(error = %e, "interface client reset the connection");
                Ok(ReadOutcome::PeerClosed)
            }
            Err(e) => Err(SocketError::Read(e)),
        }
    }

    /// Writes `frame` to the active client with a single `write` call.
    ///
    /// Returns the number of bytes the kernel accepted.  A short write is
    /// logged and not retried.
    ///
    /// # Errors
    ///
    /// [`SocketError::NotConnected`] with no client attached,
    /// [`SocketError::Write`] if the write fails.
    pub async fn write_once(&self, frame: &Frame) -> Result<usize, SocketError> {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(SocketError::NotConnected)?;

        let written = writer
            .write(frame.as_bytes())
            .await
            .map_err(SocketError::Write)?;
        if written < frame.len() {
            warn!(
                written,
                expected = frame.len(),
                "short write to interface client; remainder discarded"
            );
        }
        Ok(written)
    }

    /// Closes the active connection, if any.  Returns whether one was open.
    pub async fn close_connection(&self) -> bool {
        let writer = self.writer.lock().await.take();
        let reader = self.reader.lock().await.take();
        let info = self.active_slot().take();

        if let Some(mut writer) = writer {
            // Sends FIN; the client may already be gone, which is fine.
            let _ = writer.shutdown().await;
        }
        drop(reader);

        match info {
            Some(info) => {
                info!(peer = %info.peer, connection_id = %info.id, "interface connection closed");
                true
            }
            None => false,
        }
    }

    /// The currently attached client, if any.
    pub fn active_connection(&self) -> Option<ConnectionInfo> {
        *self.active_slot()
    }

    fn active_slot(&self) -> std::sync::MutexGuard<'_, Option<ConnectionInfo>> {
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// A reset or abort from the peer ends the session the same way an orderly
/// close does.
fn is_peer_reset(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::ConnectionAborted
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
