//! Connection lifecycle manager
//!
//! Arms accept, read and send operations on the reactor and turns their
//! completions into lifecycle events.

use crate::connection::metrics::ConnectionMetrics;
use crate::connection::{ConnectionHandle, StreamConnection};
use crate::protocol::ReadCodec;
use crate::reactor::{Acceptor, Completion, TokioReactor};
use bytes::Bytes;
use eventsock_config::{ReadMode, ReadModeConfig, ServerConfig};
use eventsock_core::{
    ConnectionId, ConnectionIdGenerator, CorrelationId, CorrelationIdGenerator, Event, EventError,
    EventKind, EventQueue, TransportKind,
};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::{debug, info, trace, warn};

/// Event produced by a server
pub type ServerEvent = Event<ConnectionHandle>;

/// Connection lifecycle manager
///
/// Owns the event queue and the read settings of one server. Every
/// operation it arms enqueues a BEGIN event at once; the matching HANDLE
/// event is enqueued when [`handle`](Self::handle) receives the completion.
pub struct LifecycleManager {
    transport: TransportKind,
    events: EventQueue<ConnectionHandle>,
    ids: Arc<CorrelationIdGenerator>,
    connection_ids: ConnectionIdGenerator,
    read_mode: ReadModeConfig,
    auto_read: bool,
    read_timeout: Option<Duration>,
    /// Upper bound on bytes buffered while searching for a delimiter
    max_read_size: usize,
    metrics: ConnectionMetrics,
}

impl LifecycleManager {
    /// Manager with default settings
    pub fn new(transport: TransportKind) -> Self {
        Self::from_config(transport, &ServerConfig::default())
    }

    /// Manager taking its read settings from `config`
    ///
    /// Correlation ids come from a fresh generator starting at 0; see
    /// [`set_correlation_ids`](Self::set_correlation_ids) to share one.
    pub fn from_config(transport: TransportKind, config: &ServerConfig) -> Self {
        Self {
            transport,
            events: EventQueue::new(transport),
            ids: Arc::new(CorrelationIdGenerator::new()),
            connection_ids: ConnectionIdGenerator::new(),
            read_mode: config.read.clone(),
            auto_read: config.auto_read,
            read_timeout: config.read_timeout(),
            max_read_size: config.max_read_size,
            metrics: ConnectionMetrics::new(),
        }
    }

    /// Transport tag stamped on every event
    pub fn transport(&self) -> TransportKind {
        self.transport
    }

    pub(crate) fn next_connection_id(&self) -> ConnectionId {
        self.connection_ids.next()
    }

    /// Enqueue ACCEPT_BEGIN and arm one accept
    pub fn begin_accept(&mut self, reactor: &mut TokioReactor, acceptor: &Acceptor) -> CorrelationId {
        let event = ServerEvent::with_fresh_id(EventKind::AcceptBegin, self.transport, &self.ids);
        let id = event.correlation_id();
        self.events.push(event);

        debug!(%id, "accept armed");
        reactor.enqueue_accept(acceptor, id);
        id
    }

    /// Enqueue READ_BEGIN and arm one read using the current read mode
    pub fn begin_read(&mut self, reactor: &mut TokioReactor, connection: &ConnectionHandle) -> CorrelationId {
        let event = ServerEvent::with_fresh_id(EventKind::ReadBegin, self.transport, &self.ids)
            .with_connection(connection.clone());
        let id = event.correlation_id();
        self.events.push(event);

        let codec = ReadCodec::from_config(&self.read_mode, self.max_read_size);
        debug!(%id, connection = %connection.id(), mode = %codec.mode(), "read armed");
        reactor.enqueue_read(connection.clone(), id, codec, self.read_timeout);
        id
    }

    /// Arm one fixed-size read of `n` bytes, leaving the read mode untouched
    pub fn begin_read_exact(
        &mut self,
        reactor: &mut TokioReactor,
        connection: &ConnectionHandle,
        n: usize,
    ) -> CorrelationId {
        let saved = self.read_mode.clone();
        self.read_mode.set_mode(ReadMode::FixedSize);
        self.read_mode.set_size(n);
        let id = self.begin_read(reactor, connection);
        self.read_mode = saved;
        id
    }

    /// Enqueue SEND_BEGIN and write all of `data`; returns the transfer id
    pub fn begin_send(
        &mut self,
        reactor: &mut TokioReactor,
        connection: &ConnectionHandle,
        data: Bytes,
    ) -> CorrelationId {
        let transfer_id = self.ids.next();
        self.events.push(
            ServerEvent::new(EventKind::SendBegin, self.transport, transfer_id)
                .with_connection(connection.clone())
                .with_send(transfer_id, 0),
        );

        debug!(%transfer_id, connection = %connection.id(), len = data.len(), "send armed");
        reactor.enqueue_write(connection.clone(), transfer_id, data);
        transfer_id
    }

    /// Completion handler
    pub fn handle(&mut self, reactor: &mut TokioReactor, completion: Completion) {
        trace!(id = %completion.correlation_id(), "handling completion");
        match completion {
            Completion::Accept {
                acceptor,
                id,
                result,
            } => {
                self.on_accept(reactor, id, result);
                // The accept loop never stops, whatever the outcome.
                self.begin_accept(reactor, &acceptor);
            }
            Completion::Read {
                connection,
                id,
                outcome,
            } => {
                let error = outcome.error.map(EventError::Read);
                if outcome.buffer.is_empty() {
                    self.on_close(connection, id, error);
                } else {
                    self.on_read(reactor, connection, id, outcome.buffer, error);
                }
            }
            Completion::Write {
                connection,
                transfer_id,
                bytes_transferred,
                error,
            } => {
                self.metrics.record_send(bytes_transferred);
                let error = error.map(EventError::Send);
                if let Some(e) = &error {
                    warn!(%transfer_id, connection = %connection.id(), error = %e, "send failed");
                }
                self.events.push(
                    ServerEvent::new(EventKind::SendHandle, self.transport, transfer_id)
                        .with_connection(connection)
                        .with_send(transfer_id, bytes_transferred)
                        .with_error(error),
                );
            }
        }
    }

    fn on_accept(
        &mut self,
        reactor: &mut TokioReactor,
        id: CorrelationId,
        result: io::Result<(TcpStream, SocketAddr)>,
    ) {
        let event = ServerEvent::new(EventKind::AcceptHandle, self.transport, id);
        let accepted = result.and_then(|(stream, peer)| {
            StreamConnection::new(self.connection_ids.next(), stream, peer)
        });

        match accepted {
            Ok(connection) => {
                let connection = ConnectionHandle::Stream(Arc::new(connection));
                self.metrics.record_accept();
                info!(
                    %id,
                    connection = %connection.id(),
                    peer = ?connection.peer_addr(),
                    "connection accepted"
                );
                self.events.push(event.with_connection(connection.clone()));
                if self.auto_read {
                    self.begin_read(reactor, &connection);
                }
            }
            Err(e) => {
                warn!(%id, error = %e, "accept failed");
                self.events.push(event.with_error(Some(EventError::Accept(e))));
            }
        }
    }

    fn on_read(
        &mut self,
        reactor: &mut TokioReactor,
        connection: ConnectionHandle,
        id: CorrelationId,
        buffer: Bytes,
        error: Option<EventError>,
    ) {
        self.metrics.record_read(buffer.len());
        if let Some(e) = &error {
            warn!(%id, connection = %connection.id(), error = %e, "read ended early");
        }
        self.events.push(
            ServerEvent::new(EventKind::ReadHandle, self.transport, id)
                .with_connection(connection.clone())
                .with_read(buffer)
                .with_error(error),
        );

        if self.auto_read {
            self.begin_read(reactor, &connection);
        }
    }

    fn on_close(&mut self, connection: ConnectionHandle, id: CorrelationId, error: Option<EventError>) {
        connection.mark_closed();
        self.metrics
            .record_close(connection.transport().is_connection_oriented());
        match &error {
            Some(e) => warn!(%id, connection = %connection.id(), error = %e, "connection closed on error"),
            None => info!(%id, connection = %connection.id(), "connection closed by peer"),
        }
        self.events.push(
            ServerEvent::new(EventKind::CloseHandle, self.transport, id)
                .with_connection(connection)
                .with_error(error),
        );
    }

    /// Oldest event, or the null event when the queue is empty
    pub fn poll(&mut self) -> ServerEvent {
        self.events.poll()
    }

    /// Events waiting to be polled
    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    /// Read mode applied to reads armed from now on
    pub fn read_mode(&self) -> &ReadModeConfig {
        &self.read_mode
    }

    /// Switch between delimiter and fixed-size reads
    pub fn set_read_mode(&mut self, mode: ReadMode) {
        self.read_mode.set_mode(mode);
    }

    /// Delimiter for `UntilDelimiter` reads; an empty one completes on any data
    pub fn set_read_delimiter(&mut self, delimiter: impl Into<String>) {
        self.read_mode.set_delimiter(delimiter);
    }

    /// Frame length for `FixedSize` reads
    pub fn set_read_buffer_size(&mut self, size: usize) {
        self.read_mode.set_size(size);
    }

    /// Whether a new read is armed after each accept and each read
    pub fn auto_read(&self) -> bool {
        self.auto_read
    }

    /// Enable or disable auto-read
    pub fn set_auto_read(&mut self, enabled: bool) {
        self.auto_read = enabled;
    }

    /// Bound on each armed read; `None` waits forever
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    /// `None` or zero disables the timeout; applies to reads armed afterwards
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) {
        self.read_timeout = timeout.filter(|t| !t.is_zero());
    }

    /// Largest frame buffered while searching for a delimiter
    pub fn max_read_size(&self) -> usize {
        self.max_read_size
    }

    /// Set the delimiter search bound; raised to one byte at least
    pub fn set_max_read_size(&mut self, size: usize) {
        self.max_read_size = size.max(1);
    }

    /// Generator the manager draws correlation ids from
    pub fn correlation_ids(&self) -> &Arc<CorrelationIdGenerator> {
        &self.ids
    }

    /// Draw correlation ids from `ids`, e.g. one sequence shared by several servers
    pub fn set_correlation_ids(&mut self, ids: Arc<CorrelationIdGenerator>) {
        self.ids = ids;
    }

    /// Accept, close and byte counters
    pub fn metrics(&self) -> &ConnectionMetrics {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::DatagramConnection;
    use crate::protocol::ReadOutcome;

    fn setup() -> (LifecycleManager, TokioReactor, ConnectionHandle) {
        let manager = LifecycleManager::new(TransportKind::Datagram);
        let reactor = TokioReactor::new().unwrap();
        let conn = DatagramConnection::bind(reactor.runtime(), "127.0.0.1", 0, manager.next_connection_id()).unwrap();
        (manager, reactor, ConnectionHandle::Datagram(Arc::new(conn)))
    }

    fn read_completion(connection: &ConnectionHandle, id: CorrelationId, outcome: ReadOutcome) -> Completion {
        Completion::Read {
            connection: connection.clone(),
            id,
            outcome,
        }
    }

    #[test]
    fn test_manager_defaults() {
        let manager = LifecycleManager::new(TransportKind::Stream);
        assert_eq!(manager.transport(), TransportKind::Stream);
        assert!(manager.auto_read());
        assert_eq!(manager.read_mode().mode, ReadMode::UntilDelimiter);
        assert_eq!(manager.read_timeout(), None);
        assert_eq!(manager.pending_events(), 0);
    }

    #[test]
    fn test_begin_read_enqueues_read_begin() {
        let (mut manager, mut reactor, conn) = setup();

        let id = manager.begin_read(&mut reactor, &conn);
        assert_eq!(reactor.outstanding(), 1);

        let event = manager.poll();
        assert_eq!(event.kind(), EventKind::ReadBegin);
        assert_eq!(event.correlation_id(), id);
        assert_eq!(event.connection(), Some(&conn));
        assert!(manager.poll().is_none());
    }

    #[test]
    fn test_read_exact_restores_read_mode() {
        let (mut manager, mut reactor, conn) = setup();
        manager.set_read_delimiter("|");
        let before = manager.read_mode().clone();

        manager.begin_read_exact(&mut reactor, &conn, 8);
        assert_eq!(manager.read_mode(), &before);
    }

    #[test]
    fn test_read_completion_rearms_with_auto_read() {
        let (mut manager, mut reactor, conn) = setup();
        let id = CorrelationId::new(100);

        let outcome = ReadOutcome::complete(Bytes::from_static(b"ping\n"));
        manager.handle(&mut reactor, read_completion(&conn, id, outcome));

        let event = manager.poll();
        assert_eq!(event.kind(), EventKind::ReadHandle);
        assert_eq!(event.correlation_id(), id);
        assert_eq!(event.read().unwrap().buffer, Bytes::from_static(b"ping\n"));
        assert!(event.error().is_none());

        assert_eq!(manager.poll().kind(), EventKind::ReadBegin);
        assert_eq!(reactor.outstanding(), 1);
        assert_eq!(manager.metrics().total_bytes_received(), 5);
    }

    #[test]
    fn test_read_completion_without_auto_read() {
        let (mut manager, mut reactor, conn) = setup();
        manager.set_auto_read(false);

        let outcome = ReadOutcome::complete(Bytes::from_static(b"ping\n"));
        manager.handle(&mut reactor, read_completion(&conn, CorrelationId::new(1), outcome));

        assert_eq!(manager.poll().kind(), EventKind::ReadHandle);
        assert!(manager.poll().is_none());
        assert_eq!(reactor.outstanding(), 0);
    }

    #[test]
    fn test_zero_byte_read_is_close() {
        let (mut manager, mut reactor, conn) = setup();
        let id = CorrelationId::new(7);

        manager.handle(&mut reactor, read_completion(&conn, id, ReadOutcome::end_of_stream(Bytes::new())));

        let event = manager.poll();
        assert_eq!(event.kind(), EventKind::CloseHandle);
        assert_eq!(event.correlation_id(), id);
        assert!(event.error().is_none());
        assert!(conn.is_closed());
        // No re-arm after close.
        assert!(manager.poll().is_none());
        assert_eq!(reactor.outstanding(), 0);
    }

    #[test]
    fn test_read_error_is_close_with_error() {
        let (mut manager, mut reactor, conn) = setup();
        let outcome = ReadOutcome::failed(Bytes::new(), io::Error::from(io::ErrorKind::ConnectionReset));

        manager.handle(&mut reactor, read_completion(&conn, CorrelationId::new(3), outcome));

        let event = manager.poll();
        assert_eq!(event.kind(), EventKind::CloseHandle);
        let error = event.error().unwrap();
        assert_eq!(error.kind(), eventsock_core::EventErrorKind::Read);
        assert_eq!(error.io_kind(), io::ErrorKind::ConnectionReset);
    }

    #[test]
    fn test_partial_read_carries_error() {
        let (mut manager, mut reactor, conn) = setup();
        let outcome = ReadOutcome::end_of_stream(Bytes::from_static(b"tail"));

        manager.handle(&mut reactor, read_completion(&conn, CorrelationId::new(4), outcome));

        let event = manager.poll();
        assert_eq!(event.kind(), EventKind::ReadHandle);
        assert_eq!(event.bytes_transferred(), 4);
        assert_eq!(event.error().unwrap().io_kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_send_uses_transfer_id() {
        let (mut manager, mut reactor, conn) = setup();

        let transfer_id = manager.begin_send(&mut reactor, &conn, Bytes::from_static(b"data"));
        let begin = manager.poll();
        assert_eq!(begin.kind(), EventKind::SendBegin);
        assert_eq!(begin.correlation_id(), transfer_id);
        assert_eq!(begin.send().unwrap().transfer_id, transfer_id);
        assert_eq!(begin.bytes_transferred(), 0);

        let completion = Completion::Write {
            connection: conn.clone(),
            transfer_id,
            bytes_transferred: 4,
            error: None,
        };
        manager.handle(&mut reactor, completion);

        let handle = manager.poll();
        assert_eq!(handle.kind(), EventKind::SendHandle);
        assert_eq!(handle.correlation_id(), transfer_id);
        assert_eq!(handle.send().unwrap().bytes_transferred, 4);
        assert_eq!(manager.metrics().total_bytes_sent(), 4);
    }

    #[test]
    fn test_shared_correlation_ids() {
        let (mut manager, mut reactor, conn) = setup();
        let ids = Arc::new(CorrelationIdGenerator::starting_at(500));
        manager.set_correlation_ids(ids.clone());

        let id = manager.begin_read(&mut reactor, &conn);
        assert_eq!(id.value(), 500);
        assert_eq!(ids.peek().value(), 501);
    }

    #[test]
    fn test_accept_error_rearms() {
        let mut manager = LifecycleManager::new(TransportKind::Stream);
        let mut reactor = TokioReactor::new().unwrap();
        let acceptor = Acceptor::bind(reactor.runtime(), "127.0.0.1", 0).unwrap();
        let id = CorrelationId::new(9);

        let completion = Completion::Accept {
            acceptor,
            id,
            result: Err(io::Error::other("accept failed")),
        };
        manager.handle(&mut reactor, completion);

        let event = manager.poll();
        assert_eq!(event.kind(), EventKind::AcceptHandle);
        assert_eq!(event.correlation_id(), id);
        assert_eq!(event.error().unwrap().kind(), eventsock_core::EventErrorKind::Accept);
        assert!(event.connection().is_none());

        // The accept loop keeps going after a failure.
        assert_eq!(manager.poll().kind(), EventKind::AcceptBegin);
        assert_eq!(reactor.outstanding(), 1);
        assert_eq!(manager.metrics().total_connections(), 0);
    }

    #[test]
    fn test_fixed_size_read_mode() {
        let (mut manager, mut reactor, conn) = setup();
        manager.set_read_mode(ReadMode::FixedSize);
        manager.set_read_buffer_size(4);
        manager.set_max_read_size(0);

        manager.begin_read(&mut reactor, &conn);
        assert_eq!(manager.read_mode().mode, ReadMode::FixedSize);
        assert_eq!(manager.read_mode().size, 4);
        assert_eq!(manager.max_read_size(), 1);
        assert_eq!(reactor.outstanding(), 1);
    }

    #[test]
    fn test_zero_read_timeout_disables() {
        let mut manager = LifecycleManager::new(TransportKind::Stream);
        manager.set_read_timeout(Some(Duration::from_secs(3)));
        assert_eq!(manager.read_timeout(), Some(Duration::from_secs(3)));
        manager.set_read_timeout(Some(Duration::ZERO));
        assert_eq!(manager.read_timeout(), None);
    }
}
