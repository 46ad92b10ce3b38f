//! Lifecycle events
//!
//! Every asynchronous operation produces a BEGIN event when it is armed and a
//! HANDLE event when its completion is observed; both carry the same
//! [`CorrelationId`]. A read that completes with zero bytes produces
//! CLOSE_HANDLE in place of READ_HANDLE.
//!
//! `Event` is generic over the connection handle so this crate stays free of
//! any socket type; the network layer fixes `C` to its own handle.

use crate::error::EventError;
use crate::id::{CorrelationId, CorrelationIdGenerator};
use crate::transport::TransportKind;
use bytes::Bytes;
use std::time::SystemTime;

const ACCEPT: u8 = 0x01;
const CLOSE: u8 = 0x02;
const READ: u8 = 0x03;
const SEND: u8 = 0x04;
const BEGIN: u8 = 0x10;
const HANDLE: u8 = 0x30;

/// Event type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EventKind {
    /// Null event returned by polling an empty queue
    None = 0,
    AcceptBegin = ACCEPT | BEGIN,
    AcceptHandle = ACCEPT | HANDLE,
    ReadBegin = READ | BEGIN,
    ReadHandle = READ | HANDLE,
    SendBegin = SEND | BEGIN,
    SendHandle = SEND | HANDLE,
    CloseHandle = CLOSE | HANDLE,
}

/// Operation an event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Accept,
    Read,
    Send,
    Close,
}

impl EventKind {
    /// Legacy numeric code; 0 for the null event
    pub fn code(&self) -> u8 {
        *self as u8
    }

    pub fn is_begin(&self) -> bool {
        self.code() & 0xF0 == BEGIN
    }

    pub fn is_handle(&self) -> bool {
        self.code() & 0xF0 == HANDLE
    }

    pub fn operation(&self) -> Option<Operation> {
        match self.code() & 0x0F {
            ACCEPT => Some(Operation::Accept),
            CLOSE => Some(Operation::Close),
            READ => Some(Operation::Read),
            SEND => Some(Operation::Send),
            _ => None,
        }
    }
}

/// Payload of a READ_HANDLE event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadPayload {
    /// Received bytes (delimiter included in delimited mode)
    pub buffer: Bytes,
    pub bytes_transferred: usize,
}

/// Payload of a SEND_BEGIN or SEND_HANDLE event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendPayload {
    pub transfer_id: CorrelationId,
    /// Zero on SEND_BEGIN
    pub bytes_transferred: usize,
}

/// Extra data carried by the read and send specializations
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Payload {
    #[default]
    Empty,
    Read(ReadPayload),
    Send(SendPayload),
}

/// One lifecycle record
///
/// Immutable once built. The connection is a shared handle: holding an event
/// keeps the endpoint alive, but the event never owns it exclusively.
#[derive(Debug)]
pub struct Event<C> {
    kind: EventKind,
    transport: TransportKind,
    correlation_id: CorrelationId,
    error: Option<EventError>,
    timestamp: SystemTime,
    connection: Option<C>,
    payload: Payload,
}

impl<C> Event<C> {
    /// Build an event with an explicit (propagated) correlation id
    pub fn new(kind: EventKind, transport: TransportKind, correlation_id: CorrelationId) -> Self {
        Self {
            kind,
            transport,
            correlation_id,
            error: None,
            timestamp: SystemTime::now(),
            connection: None,
            payload: Payload::Empty,
        }
    }

    /// Build an event with a fresh correlation id
    pub fn with_fresh_id(
        kind: EventKind,
        transport: TransportKind,
        ids: &CorrelationIdGenerator,
    ) -> Self {
        Self::new(kind, transport, ids.next())
    }

    /// Null event; its correlation id carries no meaning
    pub fn none(transport: TransportKind) -> Self {
        Self::new(EventKind::None, transport, CorrelationId::default())
    }

    pub fn with_connection(mut self, connection: C) -> Self {
        self.connection = Some(connection);
        self
    }

    pub fn with_error(mut self, error: Option<EventError>) -> Self {
        self.error = error;
        self
    }

    pub fn with_read(mut self, buffer: Bytes) -> Self {
        self.payload = Payload::Read(ReadPayload {
            bytes_transferred: buffer.len(),
            buffer,
        });
        self
    }

    pub fn with_send(mut self, transfer_id: CorrelationId, bytes_transferred: usize) -> Self {
        self.payload = Payload::Send(SendPayload {
            transfer_id,
            bytes_transferred,
        });
        self
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn transport(&self) -> TransportKind {
        self.transport
    }

    pub fn correlation_id(&self) -> CorrelationId {
        self.correlation_id
    }

    pub fn error(&self) -> Option<&EventError> {
        self.error.as_ref()
    }

    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    pub fn connection(&self) -> Option<&C> {
        self.connection.as_ref()
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Read specialization, if this is a READ_HANDLE event
    pub fn read(&self) -> Option<&ReadPayload> {
        match &self.payload {
            Payload::Read(read) => Some(read),
            _ => None,
        }
    }

    /// Send specialization, if this is a SEND_BEGIN or SEND_HANDLE event
    pub fn send(&self) -> Option<&SendPayload> {
        match &self.payload {
            Payload::Send(send) => Some(send),
            _ => None,
        }
    }

    /// Bytes moved by the operation; zero for events without a payload
    pub fn bytes_transferred(&self) -> usize {
        match &self.payload {
            Payload::Read(read) => read.bytes_transferred,
            Payload::Send(send) => send.bytes_transferred,
            Payload::Empty => 0,
        }
    }

    pub fn is_none(&self) -> bool {
        self.kind == EventKind::None
    }

    pub fn is_some(&self) -> bool {
        !self.is_none()
    }

    /// Take the connection out of the event
    pub fn into_connection(self) -> Option<C> {
        self.connection
    }
}
