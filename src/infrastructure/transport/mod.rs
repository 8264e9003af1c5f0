//! Record transport adapters
//!
//! - `framed`: length-prefixed frames over files, pipes and stdio
//! - `memory`: in-process channel transport

pub mod framed;
pub mod memory;

pub use framed::{encode_frame, record_frame, schema_frame, FramedSink, FramedSource, TAG_DATA, TAG_SCHEMA};
pub use memory::{memory_channel, MemoryFeeder, MemorySink, MemorySource, Outbound};

use anyhow::{Context, Result};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};

/// Path value selecting stdin / stdout
pub const STDIO: &str = "-";

/// Boxed reader behind an input interface
pub type InputStream = Box<dyn AsyncRead + Unpin + Send>;
/// Boxed writer behind an output interface
pub type OutputStream = Box<dyn AsyncWrite + Unpin + Send>;

/// Convert a millisecond setting, where 0 disables the timeout
pub fn timeout_from_ms(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

/// Open an input interface on a file or stdin
pub async fn open_source(path: &str, recv_timeout: Option<Duration>) -> Result<FramedSource<InputStream>> {
    let reader: InputStream = if path == STDIO {
        Box::new(tokio::io::stdin())
    } else {
        Box::new(
            tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open input {path}"))?,
        )
    };
    Ok(FramedSource::new(reader).with_recv_timeout(recv_timeout))
}

/// Open an output interface on a file or stdout
pub async fn open_sink(path: &str, send_timeout: Option<Duration>) -> Result<FramedSink<OutputStream>> {
    let writer: OutputStream = if path == STDIO {
        Box::new(tokio::io::stdout())
    } else {
        Box::new(
            tokio::fs::File::create(path)
                .await
                .with_context(|| format!("Failed to create output {path}"))?,
        )
    };
    Ok(FramedSink::new(writer).with_send_timeout(send_timeout))
}
