//! TCP acceptor
//!
//! Wraps the listening socket of a stream server.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Runtime;
use tracing::info;

/// Listening socket, cheap to clone into accept operations
#[derive(Debug, Clone)]
pub struct Acceptor {
    listener: Arc<TcpListener>,
    local_addr: SocketAddr,
}

impl Acceptor {
    /// Bind to `host:port`, registering the listener with `runtime`
    ///
    /// Binding is synchronous so a bad address fails at construction.
    pub fn bind(runtime: &Runtime, host: &str, port: u16) -> io::Result<Self> {
        let listener = std::net::TcpListener::bind((host, port))?;
        listener.set_nonblocking(true)?;
        let _guard = runtime.enter();
        let listener = TcpListener::from_std(listener)?;
        let local_addr = listener.local_addr()?;

        info!(%local_addr, "tcp acceptor listening");
        Ok(Self {
            listener: Arc::new(listener),
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub(crate) async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        self.listener.accept().await
    }
}
