//! Error context
//!
//! Extra information attached to a construction error on its way up.

use crate::transport::TransportKind;
use std::fmt;

/// Error context information
#[derive(Debug, Clone)]
pub enum ErrorContext {
    /// Address a server tried to bind or resolve
    Endpoint(String),
    /// Transport the failing server was built for
    Transport(TransportKind),
    /// Key/value context
    KeyValue(String, String),
    /// Free-form context
    Custom(String),
}

impl ErrorContext {
    pub fn endpoint(addr: impl Into<String>) -> Self {
        ErrorContext::Endpoint(addr.into())
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorContext::Endpoint(addr) => write!(f, "endpoint {}", addr),
            ErrorContext::Transport(kind) => write!(f, "{} transport", kind),
            ErrorContext::KeyValue(key, value) => write!(f, "{}: {}", key, value),
            ErrorContext::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl From<TransportKind> for ErrorContext {
    fn from(kind: TransportKind) -> Self {
        ErrorContext::Transport(kind)
    }
}

impl From<(&str, String)> for ErrorContext {
    fn from((key, value): (&str, String)) -> Self {
        ErrorContext::KeyValue(key.to_string(), value)
    }
}

impl From<(&str, &str)> for ErrorContext {
    fn from((key, value): (&str, &str)) -> Self {
        ErrorContext::KeyValue(key.to_string(), value.to_string())
    }
}

impl From<&str> for ErrorContext {
    fn from(msg: &str) -> Self {
        ErrorContext::Custom(msg.to_string())
    }
}
