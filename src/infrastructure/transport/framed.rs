//! Length-prefixed record framing over async byte streams
//!
//! Wire format, one frame per message:
//!
//! ```text
//! +--------+---------------+------------------+
//! | tag u8 | len u16 (LE)  | payload[len]     |
//! +--------+---------------+------------------+
//! ```
//!
//! `S` frames carry the UTF-8 schema text, `D` frames carry a record payload.
//! A `D` frame of zero or one byte is the end-of-stream marker.

use async_trait::async_trait;
use byteorder::{ByteOrder, LittleEndian};
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::trace;

use crate::domain::error::TransportError;
use crate::domain::models::{Record, Schema, MAX_RECORD_SIZE};
use crate::domain::ports::{Inbound, RecordSink, RecordSource};

/// Tag of a schema announcement frame
pub const TAG_SCHEMA: u8 = b'S';
/// Tag of a data record frame
pub const TAG_DATA: u8 = b'D';

const HEADER_LEN: usize = 3;
const READ_CHUNK: usize = 8192;

/// Encode one frame
pub fn encode_frame(tag: u8, payload: &[u8]) -> Result<Vec<u8>, TransportError> {
    let len = u16::try_from(payload.len())
        .map_err(|_| TransportError::Frame(format!("payload of {} bytes exceeds {MAX_RECORD_SIZE}", payload.len())))?;

    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.push(tag);
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Encode a schema announcement frame
pub fn schema_frame(schema: &Schema) -> Result<Vec<u8>, TransportError> {
    encode_frame(TAG_SCHEMA, schema.to_string().as_bytes())
}

/// Encode a data record frame
pub fn record_frame(record: &Record) -> Result<Vec<u8>, TransportError> {
    encode_frame(TAG_DATA, record.payload())
}

fn map_write_error(err: io::Error) -> TransportError {
    match err.kind() {
        io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset => TransportError::Closed,
        _ => TransportError::Io(err),
    }
}

/// Record source decoding frames from an async reader
///
/// Bytes are buffered internally, so a `recv` cancelled mid-frame resumes
/// where it stopped on the next call.
pub struct FramedSource<R> {
    reader: R,
    buffer: Vec<u8>,
    recv_timeout: Option<Duration>,
}

impl<R: AsyncRead + Unpin + Send> FramedSource<R> {
    /// Decode frames from `reader`, without a receive timeout
    pub const fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::new(),
            recv_timeout: None,
        }
    }

    /// Fail a `recv` with [`TransportError::Timeout`] when no complete frame arrives in time
    #[must_use]
    pub const fn with_recv_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.recv_timeout = timeout;
        self
    }

    fn decode(&mut self) -> Result<Option<Inbound>, TransportError> {
        if self.buffer.len() < HEADER_LEN {
            return Ok(None);
        }

        let tag = self.buffer[0];
        if tag != TAG_SCHEMA && tag != TAG_DATA {
            return Err(TransportError::Frame(format!("unknown frame tag 0x{tag:02x}")));
        }

        let len = usize::from(LittleEndian::read_u16(&self.buffer[1..HEADER_LEN]));
        if self.buffer.len() < HEADER_LEN + len {
            return Ok(None);
        }

        let payload: Vec<u8> = self.buffer.drain(..HEADER_LEN + len).skip(HEADER_LEN).collect();
        trace!(tag = %char::from(tag), len, "frame decoded");

        if tag == TAG_SCHEMA {
            let text = String::from_utf8(payload)
                .map_err(|_| TransportError::Frame("schema announcement is not valid UTF-8".to_string()))?;
            Ok(Some(Inbound::Schema(Schema::parse(&text)?)))
        } else {
            Ok(Some(Inbound::Record(Record::new(payload))))
        }
    }

    async fn next_frame(&mut self) -> Result<Inbound, TransportError> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if let Some(inbound) = self.decode()? {
                return Ok(inbound);
            }

            let n = self.reader.read(&mut chunk).await?;
            if n == 0 {
                return if self.buffer.is_empty() {
                    Err(TransportError::Closed)
                } else {
                    Err(TransportError::Frame(format!(
                        "stream ended inside a frame ({} bytes pending)",
                        self.buffer.len()
                    )))
                };
            }
            self.buffer.extend_from_slice(&chunk[..n]);
        }
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> RecordSource for FramedSource<R> {
    async fn recv(&mut self) -> Result<Inbound, TransportError> {
        match self.recv_timeout {
            Some(limit) => tokio::time::timeout(limit, self.next_frame())
                .await
                .map_err(|_| TransportError::Timeout)?,
            None => self.next_frame().await,
        }
    }
}

/// Record sink encoding frames onto an async writer
pub struct FramedSink<W: AsyncWrite> {
    writer: BufWriter<W>,
    send_timeout: Option<Duration>,
}

impl<W: AsyncWrite + Unpin + Send> FramedSink<W> {
    /// Encode frames onto a buffered `writer`
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            send_timeout: None,
        }
    }

    /// Fail a send with [`TransportError::Timeout`] when the write stalls
    #[must_use]
    pub const fn with_send_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Unwrap the writer; unflushed bytes are discarded
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    async fn write_frame(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        let write = self.writer.write_all(frame);
        match self.send_timeout {
            Some(limit) => tokio::time::timeout(limit, write)
                .await
                .map_err(|_| TransportError::Timeout)?
                .map_err(map_write_error),
            None => write.await.map_err(map_write_error),
        }
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> RecordSink for FramedSink<W> {
    async fn announce_schema(&mut self, schema: &Schema) -> Result<(), TransportError> {
        let frame = schema_frame(schema)?;
        self.write_frame(&frame).await
    }

    async fn send(&mut self, record: &Record) -> Result<(), TransportError> {
        let frame = record_frame(record)?;
        self.write_frame(&frame).await
    }

    async fn flush(&mut self) -> Result<(), TransportError> {
        self.writer.flush().await.map_err(map_write_error)
    }
}
