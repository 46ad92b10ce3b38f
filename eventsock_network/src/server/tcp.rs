//! Connection-oriented server

use crate::connection::LifecycleManager;
use crate::reactor::{Acceptor, SharedRuntime, TokioReactor};
use crate::server::{Server, StreamTransport, config_error, own_runtime};
use eventsock_config::ServerConfig;
use eventsock_core::{ErrorContext, EventSockError, Result, TransportKind};

/// TCP server; accepting starts on the first call to `update`
pub type TcpServer = Server<StreamTransport>;

impl Server<StreamTransport> {
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

        let acceptor = Acceptor::bind(&runtime, &config.bind_address, config.port).map_err(|e| {
            EventSockError::from(e)
                .with_context(ErrorContext::endpoint(config.bind_addr()))
                .with_context(TransportKind::Stream)
        })?;

        let manager = LifecycleManager::from_config(TransportKind::Stream, config);
        let reactor = TokioReactor::with_runtime(runtime);
        Ok(Server::assemble(StreamTransport { acceptor }, manager, reactor))
    }
}
