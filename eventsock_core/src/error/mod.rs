//! Unified error handling
//!
//! `EventSockError` covers fallible construction paths. `EventError` is data:
//! it rides on HANDLE events and is never returned from the polling API.

pub mod context;
pub mod event;
pub mod framework;

pub use context::ErrorContext;
pub use event::{EventError, EventErrorKind};
pub use framework::{EventSockError, EventSockErrorKind};

/// EventSock Result type
pub type Result<T> = std::result::Result<T, EventSockError>;
