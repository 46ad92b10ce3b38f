//! Framework error type
//!
//! Returned by constructors and configuration loading. Nothing on the
//! polling path (`poll`, `update`, sends, reads) produces one.

use super::context::ErrorContext;
use std::io;
use thiserror::Error;

/// EventSock framework error
#[derive(Error, Debug)]
pub enum EventSockError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Reactor could not be created or driven
    #[error("reactor error: {0}")]
    Reactor(String),

    /// Validation error
    #[error("validation failed: {0}")]
    Validation(String),

    /// Error with context
    #[error("{1}: {0}")]
    WithContext(#[source] Box<EventSockError>, ErrorContext),
}

impl EventSockError {
    /// Error category; context wrappers report their inner kind
    pub fn kind(&self) -> EventSockErrorKind {
        match self {
            EventSockError::Io(_) => EventSockErrorKind::Io,
            EventSockError::Config(_) => EventSockErrorKind::Config,
            EventSockError::Reactor(_) => EventSockErrorKind::Reactor,
            EventSockError::Validation(_) => EventSockErrorKind::Validation,
            EventSockError::WithContext(inner, _) => inner.kind(),
        }
    }

    /// Attach context
    pub fn with_context<C>(self, context: C) -> Self
    where
        C: Into<ErrorContext>,
    {
        EventSockError::WithContext(Box::new(self), context.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        EventSockError::Config(msg.into())
    }

    pub fn reactor(msg: impl Into<String>) -> Self {
        EventSockError::Reactor(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        EventSockError::Validation(msg.into())
    }
}

/// Error category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventSockErrorKind {
    Io,
    Config,
    Reactor,
    Validation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = EventSockError::config("bad delimiter");
        assert!(matches!(err, EventSockError::Config(_)));
        assert_eq!(err.kind(), EventSockErrorKind::Config);
    }

    #[test]
    fn test_error_with_context_keeps_kind() {
        let err = EventSockError::from(io::Error::from(io::ErrorKind::AddrInUse))
            .with_context(ErrorContext::endpoint("127.0.0.1:8080"));
        assert!(matches!(err, EventSockError::WithContext(_, _)));
        assert_eq!(err.kind(), EventSockErrorKind::Io);
        assert!(err.to_string().starts_with("endpoint 127.0.0.1:8080: IO error"));
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(EventSockError::reactor("").kind(), EventSockErrorKind::Reactor);
        assert_eq!(EventSockError::validation("").kind(), EventSockErrorKind::Validation);
    }
}
