//! # EventSock
//!
//! Completion-based socket I/O exposed as a pollable queue of lifecycle
//! events. The application drives everything from one control loop: call
//! `update()` to advance the reactor, then `poll()` until the null event.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use eventsock::prelude::*;
//!
//! fn main() -> eventsock::Result<()> {
//!     let mut server = TcpServer::bind("127.0.0.1", 7000)?;
//!     loop {
//!         server.update();
//!         loop {
//!             let event = server.poll();
//!             match event.kind() {
//!                 EventKind::None => break,
//!                 EventKind::ReadHandle => {
//!                     if let (Some(conn), Some(read)) = (event.connection(), event.read()) {
//!                         server.send_buffer(conn, read.buffer.clone());
//!                     }
//!                 }
//!                 _ => {}
//!             }
//!         }
//!     }
//! }
//! ```
//!
//! ## Crates
//!
//! - `eventsock_config`: `ServerConfig`, `ReadMode`, `ReadModeConfig`
//! - `eventsock_core`: correlation ids, events, the event queue, errors
//! - `eventsock_network`: the reactor, connections, `TcpServer`, `UdpServer`

pub use eventsock_config;
pub use eventsock_core;
pub use eventsock_network;

pub use bytes::Bytes;
pub use eventsock_config::{ConfigError, ReadMode, ReadModeConfig, ServerConfig};
pub use eventsock_core::{
    CorrelationId, CorrelationIdGenerator, Event, EventError, EventErrorKind, EventKind,
    EventSockError, TransportKind,
};
pub use eventsock_network::{
    ConnectionHandle, ConnectionMetrics, ServerEvent, SharedRuntime, StepSummary, TcpServer,
    TokioReactor, UdpServer,
};

/// Common imports
///
/// `use eventsock::prelude::*;`
pub mod prelude {
    pub use bytes::Bytes;
    pub use eventsock_config::{ReadMode, ServerConfig};
    pub use eventsock_core::{CorrelationId, EventErrorKind, EventKind, TransportKind};
    pub use eventsock_network::{
        ConnectionHandle, ServerEvent, StepSummary, TcpServer, TokioReactor, UdpServer,
    };
}

pub type Result<T> = std::result::Result<T, Error>;

/// Unified error
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] eventsock_core::EventSockError),

    #[error(transparent)]
    Config(#[from] eventsock_config::ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Custom(String),
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversions() {
        let err: Error = EventSockError::validation("bad").into();
        assert!(matches!(err, Error::Core(_)));
        assert_eq!(err.to_string(), "validation failed: bad");

        let err: Error = std::io::Error::from(std::io::ErrorKind::AddrInUse).into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_question_mark_across_crates() {
        fn load() -> Result<ServerConfig> {
            let config = ServerConfig::from_toml_str("port = 0\nbind_address = \"127.0.0.1\"")?;
            config.validate()?;
            Ok(config)
        }
        assert_eq!(load().unwrap().port, 0);
    }

    #[test]
    fn test_version_info() {
        assert_eq!(NAME, "eventsock");
        assert!(!VERSION.is_empty());
    }
}
