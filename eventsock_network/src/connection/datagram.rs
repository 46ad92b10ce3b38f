//! Bound datagram endpoint

use crate::protocol::{read_frame, ByteSource, ReadCodec, ReadOutcome};
use bytes::BytesMut;
use eventsock_core::ConnectionId;
use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex as StdMutex;
use tokio::net::UdpSocket;
use tokio::runtime::Runtime;
use tokio::sync::Mutex;

/// Largest payload a UDP datagram can carry
const MAX_DATAGRAM: usize = 65536;

struct DatagramReader {
    pending: BytesMut,
    scratch: Vec<u8>,
}

struct DatagramSource<'a> {
    socket: &'a UdpSocket,
    scratch: &'a mut Vec<u8>,
    peer: &'a StdMutex<Option<SocketAddr>>,
}

impl ByteSource for DatagramSource<'_> {
    async fn fill(&mut self, buf: &mut BytesMut) -> io::Result<usize> {
        let (n, from) = self.socket.recv_from(&mut self.scratch[..]).await?;
        buf.extend_from_slice(&self.scratch[..n]);
        *lock(self.peer) = Some(from);
        Ok(n)
    }
}

fn lock(peer: &StdMutex<Option<SocketAddr>>) -> std::sync::MutexGuard<'_, Option<SocketAddr>> {
    peer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// The one socket of a datagram server
///
/// Sends go to the sender of the most recently received datagram, or to the
/// peer set with [`set_peer`](Self::set_peer).
pub struct DatagramConnection {
    id: ConnectionId,
    local_addr: SocketAddr,
    socket: UdpSocket,
    reader: Mutex<DatagramReader>,
    peer: StdMutex<Option<SocketAddr>>,
    closed: AtomicBool,
}

impl DatagramConnection {
    /// Bind to `host:port`, registering the socket with `runtime`
    pub(crate) fn bind(runtime: &Runtime, host: &str, port: u16, id: ConnectionId) -> io::Result<Self> {
        let socket = std::net::UdpSocket::bind((host, port))?;
        socket.set_nonblocking(true)?;
        let _guard = runtime.enter();
        let socket = UdpSocket::from_std(socket)?;
        let local_addr = socket.local_addr()?;

        Ok(Self {
            id,
            local_addr,
            socket,
            reader: Mutex::new(DatagramReader {
                pending: BytesMut::new(),
                scratch: vec![0; MAX_DATAGRAM],
            }),
            peer: StdMutex::new(None),
            closed: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Current send target
    pub fn peer(&self) -> Option<SocketAddr> {
        *lock(&self.peer)
    }

    pub fn set_peer(&self, peer: SocketAddr) {
        *lock(&self.peer) = Some(peer);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn mark_closed(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub(crate) async fn read(&self, mut codec: ReadCodec) -> ReadOutcome {
        let mut guard = self.reader.lock().await;
        let DatagramReader { pending, scratch } = &mut *guard;
        let mut source = DatagramSource {
            socket: &self.socket,
            scratch,
            peer: &self.peer,
        };
        read_frame(&mut source, pending, &mut codec).await
    }

    /// Send `data` as one datagram to the current peer
    pub(crate) async fn write(&self, data: &[u8]) -> (usize, Option<io::Error>) {
        let Some(peer) = self.peer() else {
            return (
                0,
                Some(io::Error::new(io::ErrorKind::NotConnected, "no datagram peer to send to")),
            );
        };
        match self.socket.send_to(data, peer).await {
            Ok(n) => (n, None),
            Err(e) => (0, Some(e)),
        }
    }
}

impl fmt::Debug for DatagramConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatagramConnection")
            .field("id", &self.id)
            .field("local_addr", &self.local_addr)
            .field("peer", &self.peer())
            .field("closed", &self.is_closed())
            .finish()
    }
}
