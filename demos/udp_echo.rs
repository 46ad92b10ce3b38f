//! UDP echo server
//!
//! Replies to the sender of every datagram. The first read has to be armed
//! by hand; auto-read keeps reading afterwards.
//!
//! ```bash
//! cargo run --example udp_echo
//! printf 'ping\n' | nc -u 127.0.0.1 9090
//! ```

use eventsock::prelude::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> eventsock::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "udp_echo=info,eventsock_network=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut server = UdpServer::bind("127.0.0.1", 9090)?;
    // Deliver each datagram as it arrives.
    server.set_read_delimiter("");

    let socket = server.socket().clone();
    server.arm_read(&socket);
    tracing::info!(addr = %server.local_addr(), "udp echo ready");

    loop {
        server.update();
        loop {
            let event = server.poll();
            match event.kind() {
                EventKind::None => break,
                EventKind::ReadHandle => {
                    if let Some(read) = event.read() {
                        tracing::info!(bytes = read.bytes_transferred, peer = ?socket.peer_addr(), "datagram");
                        server.send_buffer(&socket, read.buffer.clone());
                    }
                }
                EventKind::SendHandle => {
                    if let Some(e) = event.error() {
                        tracing::warn!(error = %e, "reply failed");
                    }
                }
                EventKind::CloseHandle => {
                    // A failed read retires the socket; start reading again.
                    server.arm_read(&socket);
                }
                _ => {}
            }
        }
    }
}
