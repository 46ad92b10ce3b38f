//! Tokio-backed reactor
//!
//! Every enqueued operation is spawned as a task on a current-thread runtime
//! and reports back through this reactor's own completion channel, so several
//! reactors can share one runtime without seeing each other's completions.

use crate::connection::ConnectionHandle;
use crate::protocol::{ReadCodec, ReadOutcome};
use crate::reactor::{Acceptor, Completion, ReactorError};
use bytes::Bytes;
use eventsock_core::CorrelationId;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tracing::trace;

/// Runtime shared between reactors
pub type SharedRuntime = Arc<Runtime>;

enum Wake {
    Completion(Completion),
    Failed(JoinError),
    Elapsed,
    Idle,
}

pub struct TokioReactor {
    tasks: JoinSet<()>,
    tx: mpsc::UnboundedSender<Completion>,
    completions: mpsc::UnboundedReceiver<Completion>,
    /// Submitted operations whose completion has not been handled
    outstanding: usize,
    // Dropped last: aborted tasks are released by the runtime.
    runtime: SharedRuntime,
}

impl TokioReactor {
    /// Reactor on a runtime of its own
    pub fn new() -> std::io::Result<Self> {
        Ok(Self::with_runtime(Self::new_runtime()?))
    }

    /// Build a runtime suitable for sharing between reactors
    pub fn new_runtime() -> std::io::Result<SharedRuntime> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Arc::new(runtime))
    }

    pub fn with_runtime(runtime: SharedRuntime) -> Self {
        let (tx, completions) = mpsc::unbounded_channel();
        Self {
            tasks: JoinSet::new(),
            tx,
            completions,
            outstanding: 0,
            runtime,
        }
    }

    pub fn runtime(&self) -> &SharedRuntime {
        &self.runtime
    }

    /// Number of operations still awaiting completion handling
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    pub fn enqueue_accept(&mut self, acceptor: &Acceptor, id: CorrelationId) {
        let acceptor = acceptor.clone();
        self.submit(async move {
            let result = acceptor.accept().await;
            Completion::Accept {
                acceptor,
                id,
                result,
            }
        });
    }

    /// Read until `delimiter` has been received, buffering at most `max_length` bytes
    pub fn enqueue_read_until(
        &mut self,
        connection: ConnectionHandle,
        id: CorrelationId,
        delimiter: Vec<u8>,
        max_length: usize,
        timeout: Option<Duration>,
    ) {
        let codec = ReadCodec::delimited(delimiter, max_length);
        self.enqueue_read(connection, id, codec, timeout);
    }

    /// Read exactly `n` bytes
    pub fn enqueue_read_exact(
        &mut self,
        connection: ConnectionHandle,
        id: CorrelationId,
        n: usize,
        timeout: Option<Duration>,
    ) {
        self.enqueue_read(connection, id, ReadCodec::fixed(n), timeout);
    }

    /// Read until `codec` yields one frame, or `timeout` elapses
    pub fn enqueue_read(
        &mut self,
        connection: ConnectionHandle,
        id: CorrelationId,
        codec: ReadCodec,
        timeout: Option<Duration>,
    ) {
        self.submit(async move {
            let outcome = match timeout {
                Some(limit) => tokio::time::timeout(limit, connection.read(codec))
                    .await
                    .unwrap_or_else(|_| ReadOutcome::timed_out()),
                None => connection.read(codec).await,
            };
            Completion::Read {
                connection,
                id,
                outcome,
            }
        });
    }

    pub fn enqueue_write(&mut self, connection: ConnectionHandle, transfer_id: CorrelationId, data: Bytes) {
        self.submit(async move {
            let (bytes_transferred, error) = connection.write(&data).await;
            Completion::Write {
                connection,
                transfer_id,
                bytes_transferred,
                error,
            }
        });
    }

    fn submit<F>(&mut self, operation: F)
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        let tx = self.tx.clone();
        self.outstanding += 1;
        self.tasks.spawn_on(
            async move {
                // The receiver lives as long as the reactor; a failed send
                // means the reactor is gone and nobody wants the result.
                let _ = tx.send(operation.await);
            },
            self.runtime.handle(),
        );
    }

    /// Block until one completion is available and hand it to `handler`.
    ///
    /// Returns the number of completions handled: 0 when nothing is
    /// outstanding, otherwise 1. Must not be called from async code.
    pub fn run_one<F>(&mut self, handler: F) -> Result<usize, ReactorError>
    where
        F: FnOnce(&mut Self, Completion),
    {
        self.wait_one(None, handler)
    }

    /// Like [`run_one`](Self::run_one) but give up after `timeout`
    pub fn run_one_timeout<F>(&mut self, timeout: Duration, handler: F) -> Result<usize, ReactorError>
    where
        F: FnOnce(&mut Self, Completion),
    {
        self.wait_one(Some(timeout), handler)
    }

    fn wait_one<F>(&mut self, timeout: Option<Duration>, handler: F) -> Result<usize, ReactorError>
    where
        F: FnOnce(&mut Self, Completion),
    {
        if self.outstanding == 0 {
            return Ok(0);
        }

        let runtime = Arc::clone(&self.runtime);
        let completions = &mut self.completions;
        let tasks = &mut self.tasks;
        let wake = runtime.block_on(async move {
            let deadline = async move {
                match timeout {
                    Some(limit) => tokio::time::sleep(limit).await,
                    None => std::future::pending::<()>().await,
                }
            };
            tokio::pin!(deadline);

            loop {
                tokio::select! {
                    biased;
                    Some(completion) = completions.recv() => return Wake::Completion(completion),
                    Some(joined) = tasks.join_next() => {
                        if let Err(e) = joined {
                            return Wake::Failed(e);
                        }
                    }
                    _ = &mut deadline => return Wake::Elapsed,
                    else => return Wake::Idle,
                }
            }
        });

        match wake {
            Wake::Completion(completion) => {
                self.outstanding = self.outstanding.saturating_sub(1);
                trace!(id = %completion.correlation_id(), "completion ready");
                handler(self, completion);
                Ok(1)
            }
            Wake::Failed(e) => {
                self.outstanding = self.outstanding.saturating_sub(1);
                Err(ReactorError::Task(e))
            }
            Wake::Elapsed => Ok(0),
            Wake::Idle => Err(ReactorError::Disconnected),
        }
    }

    /// Hand every completion that is already available to `handler`
    /// without blocking; returns how many were handled.
    pub fn poll_ready<F>(&mut self, mut handler: F) -> Result<usize, ReactorError>
    where
        F: FnMut(&mut Self, Completion),
    {
        if self.outstanding == 0 {
            return Ok(0);
        }

        // First pass runs tasks already woken; the second runs those the
        // I/O driver woke in between.
        let runtime = Arc::clone(&self.runtime);
        runtime.block_on(async {
            tokio::task::yield_now().await;
            tokio::task::yield_now().await;
        });

        while let Some(joined) = self.tasks.try_join_next() {
            if let Err(e) = joined {
                self.outstanding = self.outstanding.saturating_sub(1);
                return Err(ReactorError::Task(e));
            }
        }

        let mut handled = 0;
        while let Ok(completion) = self.completions.try_recv() {
            self.outstanding = self.outstanding.saturating_sub(1);
            trace!(id = %completion.correlation_id(), "completion drained");
            handler(self, completion);
            handled += 1;
        }
        Ok(handled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{ConnectionHandle, DatagramConnection};
    use eventsock_core::ConnectionId;

    fn datagram(reactor: &TokioReactor) -> ConnectionHandle {
        let conn = DatagramConnection::bind(reactor.runtime(), "127.0.0.1", 0, ConnectionId::new(1)).unwrap();
        ConnectionHandle::Datagram(Arc::new(conn))
    }

    #[test]
    fn test_idle_reactor_returns_immediately() {
        let mut reactor = TokioReactor::new().unwrap();
        assert_eq!(reactor.outstanding(), 0);
        assert_eq!(reactor.run_one(|_, _| panic!("no completion expected")).unwrap(), 0);
        assert_eq!(reactor.poll_ready(|_, _| panic!("no completion expected")).unwrap(), 0);
    }

    #[test]
    fn test_run_one_timeout_elapses() {
        let mut reactor = TokioReactor::new().unwrap();
        let conn = datagram(&reactor);
        reactor.enqueue_read_until(conn, CorrelationId::new(0), b"\n".to_vec(), 1024, None);

        let handled = reactor
            .run_one_timeout(Duration::from_millis(20), |_, _| panic!("nothing was sent"))
            .unwrap();
        assert_eq!(handled, 0);
        assert_eq!(reactor.outstanding(), 1);
    }

    #[test]
    fn test_write_without_peer_completes_with_error() {
        let mut reactor = TokioReactor::new().unwrap();
        let conn = datagram(&reactor);
        reactor.enqueue_write(conn, CorrelationId::new(5), Bytes::from_static(b"x"));

        let mut seen = None;
        let handled = reactor
            .run_one_timeout(Duration::from_secs(5), |_, completion| seen = Some(completion))
            .unwrap();
        assert_eq!(handled, 1);
        assert_eq!(reactor.outstanding(), 0);

        match seen {
            Some(Completion::Write {
                transfer_id,
                bytes_transferred,
                error,
                ..
            }) => {
                assert_eq!(transfer_id, CorrelationId::new(5));
                assert_eq!(bytes_transferred, 0);
                assert_eq!(error.unwrap().kind(), std::io::ErrorKind::NotConnected);
            }
            other => panic!("unexpected completion: {:?}", other),
        }
    }

    #[test]
    fn test_read_timeout_completes_read() {
        let mut reactor = TokioReactor::new().unwrap();
        let conn = datagram(&reactor);
        reactor.enqueue_read_exact(conn, CorrelationId::new(2), 4, Some(Duration::from_millis(20)));

        let mut seen = None;
        reactor
            .run_one_timeout(Duration::from_secs(5), |_, completion| seen = Some(completion))
            .unwrap();
        match seen {
            Some(Completion::Read { id, outcome, .. }) => {
                assert_eq!(id, CorrelationId::new(2));
                assert_eq!(outcome.bytes_transferred(), 0);
                assert_eq!(outcome.error.unwrap().kind(), std::io::ErrorKind::TimedOut);
            }
            other => panic!("unexpected completion: {:?}", other),
        }
    }

    #[test]
    fn test_reactors_sharing_a_runtime_keep_their_completions() {
        let runtime = TokioReactor::new_runtime().unwrap();
        let mut first = TokioReactor::with_runtime(runtime.clone());
        let mut second = TokioReactor::with_runtime(runtime);

        let conn = datagram(&first);
        first.enqueue_write(conn, CorrelationId::new(1), Bytes::from_static(b"x"));

        assert_eq!(second.poll_ready(|_, _| panic!("wrong reactor")).unwrap(), 0);
        let handled = first
            .run_one_timeout(Duration::from_secs(5), |_, _| {})
            .unwrap();
        assert_eq!(handled, 1);
    }

    #[test]
    fn test_handler_can_rearm() {
        let mut reactor = TokioReactor::new().unwrap();
        let conn = datagram(&reactor);
        reactor.enqueue_write(conn.clone(), CorrelationId::new(0), Bytes::from_static(b"x"));

        reactor
            .run_one_timeout(Duration::from_secs(5), |reactor, _| {
                reactor.enqueue_write(conn, CorrelationId::new(1), Bytes::from_static(b"y"));
            })
            .unwrap();
        assert_eq!(reactor.outstanding(), 1);
    }
}
