//! Event-queue servers
//!
//! A [`Server`] owns a reactor, a lifecycle manager and one transport. The
//! application drives it by calling [`Server::update`] and drains the
//! resulting events with [`Server::poll`]:
//!
//! ```no_run
//! use eventsock_core::EventKind;
//! use eventsock_network::TcpServer;
//!
//! let mut server = TcpServer::bind("127.0.0.1", 7000)?;
//! loop {
//!     server.update();
//!     loop {
//!         let event = server.poll();
//!         match event.kind() {
//!             EventKind::None => break,
//!             EventKind::ReadHandle => {
//!                 if let (Some(conn), Some(read)) = (event.connection(), event.read()) {
//!                     server.send_buffer(conn, read.buffer.clone());
//!                 }
//!             }
//!             _ => {}
//!         }
//!     }
//! }
//! # Ok::<(), eventsock_core::EventSockError>(())
//! ```

pub mod driver;
pub mod tcp;
pub mod transport;
pub mod udp;

pub use driver::{StepClock, StepSummary};
pub use tcp::TcpServer;
pub use transport::{DatagramTransport, StreamTransport, Transport};
pub use udp::UdpServer;

use crate::connection::{ConnectionHandle, ConnectionMetrics, LifecycleManager, ServerEvent};
use crate::reactor::{SharedRuntime, TokioReactor};
use bytes::Bytes;
use eventsock_config::{ConfigError, ReadMode, ReadModeConfig};
use eventsock_core::{CorrelationId, CorrelationIdGenerator, EventSockError, Result, TransportKind};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Validation failures keep their own kind
pub(crate) fn config_error(err: ConfigError) -> EventSockError {
    match err {
        ConfigError::Validation(msg) => EventSockError::validation(msg),
        other => EventSockError::config(other.to_string()),
    }
}

pub(crate) fn runtime_error(err: std::io::Error) -> EventSockError {
    EventSockError::reactor(format!("failed to start runtime: {}", err))
}

/// Runtime for a server that does not share one
pub(crate) fn own_runtime() -> Result<SharedRuntime> {
    TokioReactor::new_runtime().map_err(runtime_error)
}

pub struct Server<T: Transport> {
    transport: T,
    manager: LifecycleManager,
    /// Set once the first accept has been armed
    started: bool,
    clock: StepClock,
    reactor: TokioReactor,
}

impl<T: Transport + std::fmt::Debug> std::fmt::Debug for Server<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("transport", &self.transport)
            .field("started", &self.started)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> Server<T> {
    pub(crate) fn assemble(transport: T, manager: LifecycleManager, reactor: TokioReactor) -> Self {
        Self {
            transport,
            manager,
            started: false,
            clock: StepClock::new(),
            reactor,
        }
    }

    /// Oldest event, or the null event when the queue is empty
    pub fn poll(&mut self) -> ServerEvent {
        self.manager.poll()
    }

    /// Events waiting to be polled
    pub fn pending_events(&self) -> usize {
        self.manager.pending_events()
    }

    /// One driver step
    ///
    /// Blocks until one completion has been handled, then handles every
    /// further completion that is already available. Returns at once when
    /// no operation is outstanding.
    pub fn update(&mut self) -> StepSummary {
        self.step(None)
    }

    /// [`update`](Self::update) with the blocking wait bounded by `timeout`
    pub fn update_timeout(&mut self, timeout: Duration) -> StepSummary {
        self.step(Some(timeout))
    }

    fn step(&mut self, timeout: Option<Duration>) -> StepSummary {
        if !self.started {
            self.started = true;
            if let Some(acceptor) = self.transport.acceptor() {
                self.manager.begin_accept(&mut self.reactor, acceptor);
            }
        }

        let manager = &mut self.manager;
        let waited = match timeout {
            Some(limit) => self
                .reactor
                .run_one_timeout(limit, |reactor, completion| manager.handle(reactor, completion)),
            None => self
                .reactor
                .run_one(|reactor, completion| manager.handle(reactor, completion)),
        };

        let (waited, handled, error) = match waited {
            Ok(waited) => match self
                .reactor
                .poll_ready(|reactor, completion| manager.handle(reactor, completion))
            {
                Ok(handled) => (waited, handled, None),
                Err(e) => (waited, 0, Some(e)),
            },
            Err(e) => (0, 0, Some(e)),
        };

        if let Some(e) = &error {
            warn!(transport = %T::KIND, error = %e, "reactor step failed");
        }

        StepSummary {
            handled,
            waited,
            transport: T::KIND,
            error,
            elapsed: self.clock.tick(),
        }
    }

    /// Arm one read on `connection` using the current read mode
    pub fn arm_read(&mut self, connection: &ConnectionHandle) -> CorrelationId {
        self.manager.begin_read(&mut self.reactor, connection)
    }

    /// Arm one read of exactly `n` bytes without changing the read mode
    pub fn arm_read_exact(&mut self, connection: &ConnectionHandle, n: usize) -> CorrelationId {
        self.manager.begin_read_exact(&mut self.reactor, connection, n)
    }

    /// Send a prebuilt buffer; returns the transfer id
    pub fn send_buffer(&mut self, connection: &ConnectionHandle, buffer: impl Into<Bytes>) -> CorrelationId {
        self.manager.begin_send(&mut self.reactor, connection, buffer.into())
    }

    /// Send a copy of `data`; returns the transfer id
    pub fn send_bytes(&mut self, connection: &ConnectionHandle, data: impl AsRef<[u8]>) -> CorrelationId {
        let buffer = Bytes::copy_from_slice(data.as_ref());
        self.manager.begin_send(&mut self.reactor, connection, buffer)
    }

    pub fn set_read_mode(&mut self, mode: ReadMode) {
        self.manager.set_read_mode(mode);
    }

    pub fn set_read_delimiter(&mut self, delimiter: impl Into<String>) {
        self.manager.set_read_delimiter(delimiter);
    }

    pub fn set_read_buffer_size(&mut self, size: usize) {
        self.manager.set_read_buffer_size(size);
    }

    /// Bound every read armed from now on; 0 disables the timeout
    pub fn set_read_timeout_seconds(&mut self, seconds: u64) {
        self.manager.set_read_timeout(Some(Duration::from_secs(seconds)));
    }

    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) {
        self.manager.set_read_timeout(timeout);
    }

    pub fn set_auto_read(&mut self, enabled: bool) {
        self.manager.set_auto_read(enabled);
    }

    /// Largest frame buffered while searching for a delimiter
    pub fn set_max_read_size(&mut self, size: usize) {
        self.manager.set_max_read_size(size);
    }

    /// Draw correlation ids from a shared generator
    ///
    /// Every server starts its own sequence at 0, so two servers in one
    /// process hand out the same ids unless they are given one generator.
    pub fn with_correlation_ids(mut self, ids: Arc<CorrelationIdGenerator>) -> Self {
        self.manager.set_correlation_ids(ids);
        self
    }

    pub fn read_mode(&self) -> &ReadModeConfig {
        self.manager.read_mode()
    }

    pub fn auto_read(&self) -> bool {
        self.manager.auto_read()
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.manager.read_timeout()
    }

    pub fn max_read_size(&self) -> usize {
        self.manager.max_read_size()
    }

    pub fn transport(&self) -> TransportKind {
        T::KIND
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.transport.local_addr()
    }

    pub fn metrics(&self) -> &ConnectionMetrics {
        self.manager.metrics()
    }

    /// Operations armed and not yet completed
    pub fn outstanding(&self) -> usize {
        self.reactor.outstanding()
    }

    pub fn runtime(&self) -> &SharedRuntime {
        self.reactor.runtime()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventsock_core::EventSockErrorKind;

    #[test]
    fn test_config_error_mapping() {
        let err = config_error(ConfigError::Validation("read size must not be 0".to_string()));
        assert_eq!(err.kind(), EventSockErrorKind::Validation);
        assert_eq!(err.to_string(), "validation failed: read size must not be 0");

        let err = config_error(ConfigError::Parse("expected `=`".to_string()));
        assert_eq!(err.kind(), EventSockErrorKind::Config);
        assert!(err.to_string().contains("expected `=`"));
    }

    #[test]
    fn test_runtime_error_is_reactor_kind() {
        let err = runtime_error(std::io::Error::other("too many open files"));
        assert_eq!(err.kind(), EventSockErrorKind::Reactor);
        assert!(err.to_string().contains("too many open files"));
    }
}
