//! Raw TCP transport with explicit length-prefixed framing.
//!
//! A single `read()` on a TCP socket can return half a message or two
//! messages at once, so a byte stream is never used as its own framing.
//! Each frame on the wire is:
//!
//! ```text
//! ┌──────────────────────┬──────────────────────────┐
//! │ len: u32 big-endian  │ len bytes of payload     │
//! └──────────────────────┴──────────────────────────┘
//! ```
//!
//! Reads loop until the whole header and the whole payload have arrived,
//! so a frame straddling several segments is reassembled and two frames
//! arriving in one segment are returned one at a time.

use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

use crate::{Connection, ConnectionId, Transport, TransportError};

/// Default upper bound on a single frame's payload (64 KiB).
pub const DEFAULT_MAX_FRAME_LEN: usize = 64 * 1024;

/// A length-prefixed TCP [`Transport`].
pub struct FramedTcpTransport {
    listener: TcpListener,
    max_frame_len: usize,
}

impl FramedTcpTransport {
    /// Binds a new framed TCP transport to the given address.
    pub async fn bind(
        addr: &str,
        max_frame_len: usize,
    ) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, max_frame_len, "framed TCP transport listening");
        Ok(Self {
            listener,
            max_frame_len,
        })
    }
}

impl Transport for FramedTcpTransport {
    type Connection = FramedTcpConnection;

    async fn accept(&mut self) -> Result<Self::Connection, TransportError> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;
        let conn = FramedTcpConnection::new(
            ConnectionId::from_peer(addr),
            stream,
            self.max_frame_len,
        );
        tracing::debug!(id = %conn.id, "accepted TCP connection");
        Ok(conn)
    }

    fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

/// A single length-prefixed TCP connection.
///
/// Also usable from the client side via [`FramedTcpConnection::connect`].
pub struct FramedTcpConnection {
    id: ConnectionId,
    reader: Mutex<OwnedReadHalf>,
    writer: Mutex<OwnedWriteHalf>,
    max_frame_len: usize,
}

impl FramedTcpConnection {
    fn new(id: ConnectionId, stream: TcpStream, max_frame_len: usize) -> Self {
        let (reader, writer) = stream.into_split();
        Self {
            id,
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
            max_frame_len,
        }
    }

    /// Opens a client-side framed connection to `addr`.
    pub async fn connect(
        addr: &str,
        max_frame_len: usize,
    ) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        let peer = stream.peer_addr().map_err(TransportError::AcceptFailed)?;
        Ok(Self::new(ConnectionId::from_peer(peer), stream, max_frame_len))
    }
}

impl Connection for FramedTcpConnection {
    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        if data.len() > self.max_frame_len {
            return Err(TransportError::FrameTooLarge {
                len: data.len(),
                max: self.max_frame_len,
            });
        }
        let len = u32::try_from(data.len()).map_err(|_| {
            TransportError::FrameTooLarge {
                len: data.len(),
                max: self.max_frame_len,
            }
        })?;

        let mut writer = self.writer.lock().await;
        writer
            .write_u32(len)
            .await
            .map_err(TransportError::SendFailed)?;
        writer
            .write_all(data)
            .await
            .map_err(TransportError::SendFailed)?;
        writer.flush().await.map_err(TransportError::SendFailed)
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        let mut reader = self.reader.lock().await;

        let mut header = [0u8; 4];
        let mut filled = 0;
        while filled < header.len() {
            let n = reader
                .read(&mut header[filled..])
                .await
                .map_err(TransportError::ReceiveFailed)?;
            if n == 0 {
                if filled == 0 {
                    // EOF on a frame boundary: clean close.
                    return Ok(None);
                }
                return Err(TransportError::ConnectionClosed(
                    "eof inside frame header".into(),
                ));
            }
            filled += n;
        }

        let len = u32::from_be_bytes(header) as usize;
        if len > self.max_frame_len {
            return Err(TransportError::FrameTooLarge {
                len,
                max: self.max_frame_len,
            });
        }

        let mut payload = vec![0u8; len];
        reader
            .read_exact(&mut payload)
            .await
            .map_err(TransportError::ReceiveFailed)?;
        Ok(Some(payload))
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.writer
            .lock()
            .await
            .shutdown()
            .await
            .map_err(TransportError::SendFailed)
    }

    fn id(&self) -> &ConnectionId {
        &self.id
    }
}
