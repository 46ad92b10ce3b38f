//! Reactor
//!
//! Completion-based execution of accept, read and write operations on a
//! single-threaded tokio runtime. Operations only make progress while the
//! owner is inside [`TokioReactor::run_one`] or [`TokioReactor::poll_ready`].

pub mod acceptor;
pub mod reactor;

pub use acceptor::Acceptor;
pub use reactor::{SharedRuntime, TokioReactor};

use crate::connection::ConnectionHandle;
use crate::protocol::ReadOutcome;
use eventsock_core::CorrelationId;
use std::io;
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::task::JoinError;

/// A finished operation, handed to the completion handler
#[derive(Debug)]
pub enum Completion {
    Accept {
        acceptor: Acceptor,
        id: CorrelationId,
        result: io::Result<(TcpStream, SocketAddr)>,
    },
    Read {
        connection: ConnectionHandle,
        id: CorrelationId,
        outcome: ReadOutcome,
    },
    Write {
        connection: ConnectionHandle,
        transfer_id: CorrelationId,
        bytes_transferred: usize,
        error: Option<io::Error>,
    },
}

impl Completion {
    pub fn correlation_id(&self) -> CorrelationId {
        match self {
            Completion::Accept { id, .. } | Completion::Read { id, .. } => *id,
            Completion::Write { transfer_id, .. } => *transfer_id,
        }
    }
}

/// Reactor-level failure reported on a step summary
#[derive(Error, Debug)]
pub enum ReactorError {
    /// An operation task panicked or was cancelled before completing
    #[error("operation task failed: {0}")]
    Task(#[from] JoinError),

    #[error("completion channel disconnected")]
    Disconnected,
}
