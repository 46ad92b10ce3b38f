//! Connections
//!
//! Connection handles for both transports and the lifecycle manager that
//! arms operations on them.

pub mod datagram;
pub mod manager;
pub mod metrics;
pub mod stream;

pub use datagram::DatagramConnection;
pub use manager::{LifecycleManager, ServerEvent};
pub use metrics::ConnectionMetrics;
pub use stream::StreamConnection;

use crate::protocol::{ReadCodec, ReadOutcome};
use eventsock_core::{ConnectionId, TransportKind};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

/// Shared handle to one transport endpoint
///
/// Cloning is cheap and every clone refers to the same endpoint, which is
/// released when the last clone (held by events or in-flight operations)
/// is dropped.
#[derive(Debug, Clone)]
pub enum ConnectionHandle {
    Stream(Arc<StreamConnection>),
    Datagram(Arc<DatagramConnection>),
}

impl ConnectionHandle {
    pub fn id(&self) -> ConnectionId {
        match self {
            ConnectionHandle::Stream(conn) => conn.id(),
            ConnectionHandle::Datagram(conn) => conn.id(),
        }
    }

    pub fn transport(&self) -> TransportKind {
        match self {
            ConnectionHandle::Stream(_) => TransportKind::Stream,
            ConnectionHandle::Datagram(_) => TransportKind::Datagram,
        }
    }

    /// Remote address; for a datagram socket, the current send target
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        match self {
            ConnectionHandle::Stream(conn) => Some(conn.peer_addr()),
            ConnectionHandle::Datagram(conn) => conn.peer(),
        }
    }

    pub fn local_addr(&self) -> SocketAddr {
        match self {
            ConnectionHandle::Stream(conn) => conn.local_addr(),
            ConnectionHandle::Datagram(conn) => conn.local_addr(),
        }
    }

    /// Whether a CLOSE_HANDLE has been produced for this endpoint
    pub fn is_closed(&self) -> bool {
        match self {
            ConnectionHandle::Stream(conn) => conn.is_closed(),
            ConnectionHandle::Datagram(conn) => conn.is_closed(),
        }
    }

    pub fn as_stream(&self) -> Option<&Arc<StreamConnection>> {
        match self {
            ConnectionHandle::Stream(conn) => Some(conn),
            ConnectionHandle::Datagram(_) => None,
        }
    }

    pub fn as_datagram(&self) -> Option<&Arc<DatagramConnection>> {
        match self {
            ConnectionHandle::Datagram(conn) => Some(conn),
            ConnectionHandle::Stream(_) => None,
        }
    }

    pub(crate) fn mark_closed(&self) {
        match self {
            ConnectionHandle::Stream(conn) => conn.mark_closed(),
            ConnectionHandle::Datagram(conn) => conn.mark_closed(),
        }
    }

    pub(crate) async fn read(&self, codec: ReadCodec) -> ReadOutcome {
        match self {
            ConnectionHandle::Stream(conn) => conn.read(codec).await,
            ConnectionHandle::Datagram(conn) => conn.read(codec).await,
        }
    }

    pub(crate) async fn write(&self, data: &[u8]) -> (usize, Option<io::Error>) {
        match self {
            ConnectionHandle::Stream(conn) => conn.write(data).await,
            ConnectionHandle::Datagram(conn) => conn.write(data).await,
        }
    }
}

impl PartialEq for ConnectionHandle {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ConnectionHandle::Stream(a), ConnectionHandle::Stream(b)) => Arc::ptr_eq(a, b),
            (ConnectionHandle::Datagram(a), ConnectionHandle::Datagram(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for ConnectionHandle {}

impl From<Arc<StreamConnection>> for ConnectionHandle {
    fn from(conn: Arc<StreamConnection>) -> Self {
        ConnectionHandle::Stream(conn)
    }
}

impl From<Arc<DatagramConnection>> for ConnectionHandle {
    fn from(conn: Arc<DatagramConnection>) -> Self {
        ConnectionHandle::Datagram(conn)
    }
}
