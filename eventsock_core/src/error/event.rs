//! Errors carried on HANDLE events

use std::io;
use thiserror::Error;

/// Failure attached to an ACCEPT_HANDLE, READ_HANDLE, CLOSE_HANDLE or
/// SEND_HANDLE event
#[derive(Error, Debug)]
pub enum EventError {
    #[error("accept failed: {0}")]
    Accept(#[source] io::Error),

    #[error("read failed: {0}")]
    Read(#[source] io::Error),

    #[error("send failed: {0}")]
    Send(#[source] io::Error),
}

impl EventError {
    pub fn kind(&self) -> EventErrorKind {
        match self {
            EventError::Accept(_) => EventErrorKind::Accept,
            EventError::Read(_) => EventErrorKind::Read,
            EventError::Send(_) => EventErrorKind::Send,
        }
    }

    /// Underlying I/O error
    pub fn io_error(&self) -> &io::Error {
        match self {
            EventError::Accept(e) | EventError::Read(e) | EventError::Send(e) => e,
        }
    }

    /// Shorthand for `self.io_error().kind()`
    pub fn io_kind(&self) -> io::ErrorKind {
        self.io_error().kind()
    }
}

/// Error category of an [`EventError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventErrorKind {
    Accept,
    Read,
    Send,
}

impl EventErrorKind {
    /// Legacy numeric code (`ERROR_ACCEPT = 0x1A`, `ERROR_READ = 0x2A`,
    /// `ERROR_SEND = 0x3A`); "no error" is `0x00`, i.e. `None`.
    pub fn code(&self) -> u8 {
        match self {
            EventErrorKind::Accept => 0x1A,
            EventErrorKind::Read => 0x2A,
            EventErrorKind::Send => 0x3A,
        }
    }
}
