//! Length-prefixed frames on top of fixed-size reads
//!
//! Each message is a 2-byte big-endian length followed by the body. The
//! server keeps the default mode at 2-byte reads and arms one exact read for
//! each body, so the header size never changes.
//!
//! ```bash
//! cargo run --example fixed_frames
//! ```

use eventsock::prelude::*;
use std::collections::HashSet;
use std::io::Write;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const HEADER: usize = 2;

fn main() -> eventsock::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fixed_frames=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut server = TcpServer::bind("127.0.0.1", 0)?;
    server.set_auto_read(false);
    server.set_read_mode(ReadMode::FixedSize);
    server.set_read_buffer_size(HEADER);
    let addr = server.local_addr();

    let client = std::thread::spawn(move || -> std::io::Result<()> {
        let mut stream = std::net::TcpStream::connect(addr)?;
        for body in ["first", "second frame", "third"] {
            stream.write_all(&(body.len() as u16).to_be_bytes())?;
            stream.write_all(body.as_bytes())?;
        }
        Ok(())
    });

    // Correlation ids of reads armed for a body rather than a header
    let mut body_reads = HashSet::new();
    let mut frames = 0;

    while frames < 3 {
        server.update_timeout(Duration::from_secs(5));
        loop {
            let event = server.poll();
            match event.kind() {
                EventKind::None => break,
                EventKind::AcceptHandle => {
                    if let Some(conn) = event.connection() {
                        server.arm_read(conn);
                    }
                }
                EventKind::ReadHandle => {
                    let (Some(conn), Some(read)) = (event.connection(), event.read()) else {
                        continue;
                    };
                    if body_reads.remove(&event.correlation_id()) {
                        frames += 1;
                        tracing::info!(body = %String::from_utf8_lossy(&read.buffer), "frame");
                        server.arm_read(conn);
                    } else if read.bytes_transferred == HEADER {
                        let len = u16::from_be_bytes([read.buffer[0], read.buffer[1]]) as usize;
                        body_reads.insert(server.arm_read_exact(conn, len));
                    }
                }
                EventKind::CloseHandle => {
                    tracing::info!("client closed");
                    frames = 3;
                }
                _ => {}
            }
        }
    }

    if let Ok(Err(e)) = client.join() {
        tracing::warn!(error = %e, "client failed");
    }
    tracing::info!(metrics = %server.metrics().summary(), "done");
    Ok(())
}
