//! EventSock network layer
//!
//! Turns completion-based socket operations into a pollable queue of
//! lifecycle events, for TCP and UDP.

pub mod connection;
pub mod protocol;
pub mod reactor;
pub mod server;

pub use crate::connection::{
    ConnectionHandle, ConnectionMetrics, DatagramConnection, LifecycleManager, ServerEvent,
    StreamConnection,
};
pub use crate::protocol::{ReadCodec, ReadOutcome};
pub use crate::reactor::{Acceptor, Completion, ReactorError, SharedRuntime, TokioReactor};
pub use crate::server::{
    DatagramTransport, Server, StepSummary, StreamTransport, TcpServer, Transport, UdpServer,
};
pub use eventsock_core::{EventSockError, Result};

pub mod prelude {
    pub use crate::connection::{ConnectionHandle, ServerEvent};
    pub use crate::server::{StepSummary, TcpServer, UdpServer};
    pub use eventsock_config::ReadMode;
    pub use eventsock_core::{EventKind, EventSockError, Result};
}
