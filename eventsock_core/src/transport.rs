//! Transport tag carried by every event

use std::fmt;

/// Communication mode of a server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// Connection-oriented (TCP)
    Stream,
    /// Connectionless (UDP)
    Datagram,
}

impl TransportKind {
    /// Legacy numeric code (`TCP = 1`, `UDP = 2`)
    pub fn code(&self) -> u8 {
        match self {
            TransportKind::Stream => 1,
            TransportKind::Datagram => 2,
        }
    }

    /// Whether connections must be accepted before they can be read
    pub fn is_connection_oriented(&self) -> bool {
        matches!(self, TransportKind::Stream)
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Stream => write!(f, "tcp"),
            TransportKind::Datagram => write!(f, "udp"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_codes() {
        assert_eq!(TransportKind::Stream.code(), 1);
        assert_eq!(TransportKind::Datagram.code(), 2);
        assert!(TransportKind::Stream.is_connection_oriented());
        assert!(!TransportKind::Datagram.is_connection_oriented());
        assert_eq!(TransportKind::Datagram.to_string(), "udp");
    }
}
