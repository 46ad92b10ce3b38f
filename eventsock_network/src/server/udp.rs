//! Connectionless server

use crate::connection::{ConnectionHandle, DatagramConnection, LifecycleManager};
use crate::reactor::{SharedRuntime, TokioReactor};
use crate::server::{DatagramTransport, Server, config_error, own_runtime};
use eventsock_config::ServerConfig;
use eventsock_core::{ErrorContext, EventSockError, Result, TransportKind};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

/// UDP server
///
/// Produces no accept events. Nothing is read until the application arms
/// the first read on [`socket`](Server::socket); auto-read keeps it going.
pub type UdpServer = Server<DatagramTransport>;

impl Server<DatagramTransport> {
    /// Bind with default settings on a runtime of its own
    pub fn bind(host: &str, port: u16) -> Result<Self> {
        Self::bind_with_runtime(host, port, own_runtime()?)
    }

    /// Bind with default settings on a shared runtime
    pub fn bind_with_runtime(host: &str, port: u16, runtime: SharedRuntime) -> Result<Self> {
        let config = ServerConfig {
            bind_address: host.to_string(),
            port,
            ..ServerConfig::default()
        };
        Self::from_config_with_runtime(&config, runtime)
    }

    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        Self::from_config_with_runtime(config, own_runtime()?)
    }

    pub fn from_config_with_runtime(config: &ServerConfig, runtime: SharedRuntime) -> Result<Self> {
        config.validate().map_err(config_error)?;

        let manager = LifecycleManager::from_config(TransportKind::Datagram, config);
        let socket = DatagramConnection::bind(
            &runtime,
            &config.bind_address,
            config.port,
            manager.next_connection_id(),
        )
        .map_err(|e| {
            EventSockError::from(e)
                .with_context(ErrorContext::endpoint(config.bind_addr()))
                .with_context(TransportKind::Datagram)
        })?;
        info!(local_addr = %socket.local_addr(), "udp socket bound");

        let socket = ConnectionHandle::Datagram(Arc::new(socket));
        let reactor = TokioReactor::with_runtime(runtime);
        Ok(Server::assemble(DatagramTransport { socket }, manager, reactor))
    }

    /// Handle to the bound socket, for arming reads and sending
    pub fn socket(&self) -> &ConnectionHandle {
        &self.transport.socket
    }

    /// Send subsequent datagrams to `peer` until another datagram arrives
    pub fn set_peer(&self, peer: SocketAddr) {
        if let Some(socket) = self.transport.socket.as_datagram() {
            socket.set_peer(peer);
        }
    }
}
