//! TCP line echo server
//!
//! Every line received is sent back to its connection.
//!
//! ```bash
//! cargo run --example echo_server -- [config.toml]
//! printf 'hello\n' | nc 127.0.0.1 8080
//! ```

use eventsock::prelude::*;
use eventsock::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> eventsock::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "echo_server=info,eventsock_network=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => ServerConfig::from_file_with_env(path)?,
        None => ServerConfig::default().load_with_env_override()?,
    };
    tracing::info!("{}", config.summary());

    let mut server = TcpServer::from_config(&config)?;
    tracing::info!(addr = %server.local_addr(), "echo server ready");

    loop {
        let step = server.update();
        if let Some(e) = step.error {
            return Err(Error::Custom(e.to_string()));
        }

        loop {
            let event = server.poll();
            match event.kind() {
                EventKind::None => break,
                EventKind::AcceptHandle => {
                    if let Some(e) = event.error() {
                        tracing::warn!(error = %e, "accept failed");
                    }
                }
                EventKind::ReadHandle => {
                    if let (Some(conn), Some(read)) = (event.connection(), event.read()) {
                        server.send_buffer(conn, read.buffer.clone());
                    }
                }
                EventKind::CloseHandle => {
                    if let Some(conn) = event.connection() {
                        tracing::info!(connection = %conn.id(), "client left");
                    }
                }
                _ => {}
            }
        }
    }
}
