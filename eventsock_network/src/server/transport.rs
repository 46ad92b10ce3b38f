//! Transport capabilities
//!
//! A stream transport owns an acceptor; a datagram transport owns the one
//! socket, ready as soon as it is bound.

use crate::connection::ConnectionHandle;
use crate::reactor::Acceptor;
use eventsock_core::TransportKind;
use std::net::SocketAddr;

pub trait Transport {
    const KIND: TransportKind;

    /// Acceptor to keep armed, for connection-oriented transports
    fn acceptor(&self) -> Option<&Acceptor> {
        None
    }

    fn local_addr(&self) -> SocketAddr;
}

#[derive(Debug)]
pub struct StreamTransport {
    pub(crate) acceptor: Acceptor,
}

impl Transport for StreamTransport {
    const KIND: TransportKind = TransportKind::Stream;

    fn acceptor(&self) -> Option<&Acceptor> {
        Some(&self.acceptor)
    }

    fn local_addr(&self) -> SocketAddr {
        self.acceptor.local_addr()
    }
}

#[derive(Debug)]
pub struct DatagramTransport {
    pub(crate) socket: ConnectionHandle,
}

impl Transport for DatagramTransport {
    const KIND: TransportKind = TransportKind::Datagram;

    fn local_addr(&self) -> SocketAddr {
        self.socket.local_addr()
    }
}
