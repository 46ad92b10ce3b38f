//! EventSock core types
//!
//! Correlation ids, the lifecycle event model, the event queue and the error
//! types shared by every EventSock crate.

pub mod error;
pub mod event;
pub mod id;
pub mod queue;
pub mod transport;

pub use crate::error::{
    ErrorContext, EventError, EventErrorKind, EventSockError, EventSockErrorKind, Result,
};
pub use crate::event::{Event, EventKind, Operation, Payload, ReadPayload, SendPayload};
pub use crate::id::{ConnectionId, ConnectionIdGenerator, CorrelationId, CorrelationIdGenerator};
pub use crate::queue::EventQueue;
pub use crate::transport::TransportKind;

pub mod prelude {
    pub use crate::error::{EventError, EventErrorKind, EventSockError, Result};
    pub use crate::event::{Event, EventKind, ReadPayload, SendPayload};
    pub use crate::id::{CorrelationId, CorrelationIdGenerator};
    pub use crate::transport::TransportKind;
}
