//! Accepted stream connection

use crate::protocol::{read_frame, ByteSource, ReadCodec, ReadOutcome};
use bytes::BytesMut;
use eventsock_core::ConnectionId;
use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

const READ_CHUNK: usize = 4096;

struct StreamReader {
    half: OwnedReadHalf,
    /// Bytes received past the end of the previous frame
    pending: BytesMut,
}

impl ByteSource for OwnedReadHalf {
    async fn fill(&mut self, buf: &mut BytesMut) -> io::Result<usize> {
        buf.reserve(READ_CHUNK);
        self.read_buf(buf).await
    }
}

/// One accepted TCP connection
///
/// The read and write halves are locked independently, so a read and a send
/// may be in flight at the same time.
pub struct StreamConnection {
    id: ConnectionId,
    peer_addr: SocketAddr,
    local_addr: SocketAddr,
    reader: Mutex<StreamReader>,
    writer: Mutex<OwnedWriteHalf>,
    closed: AtomicBool,
}

impl StreamConnection {
    pub(crate) fn new(id: ConnectionId, stream: TcpStream, peer_addr: SocketAddr) -> io::Result<Self> {
        let local_addr = stream.local_addr()?;
        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            id,
            peer_addr,
            local_addr,
            reader: Mutex::new(StreamReader {
                half: read_half,
                pending: BytesMut::new(),
            }),
            writer: Mutex::new(write_half),
            closed: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn mark_closed(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub(crate) async fn read(&self, mut codec: ReadCodec) -> ReadOutcome {
        let mut guard = self.reader.lock().await;
        let StreamReader { half, pending } = &mut *guard;
        read_frame(half, pending, &mut codec).await
    }

    /// Write all of `data`, returning the bytes written and the error that
    /// stopped the write early, if any.
    pub(crate) async fn write(&self, data: &[u8]) -> (usize, Option<io::Error>) {
        let mut writer = self.writer.lock().await;
        let mut written = 0;
        while written < data.len() {
            match writer.write(&data[written..]).await {
                Ok(0) => {
                    return (
                        written,
                        Some(io::Error::new(io::ErrorKind::WriteZero, "connection closed during write")),
                    );
                }
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return (written, Some(e)),
            }
        }
        (written, None)
    }
}

impl fmt::Debug for StreamConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamConnection")
            .field("id", &self.id)
            .field("peer_addr", &self.peer_addr)
            .field("local_addr", &self.local_addr)
            .field("closed", &self.is_closed())
            .finish()
    }
}
