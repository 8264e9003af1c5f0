use async_trait::async_trait;

use crate::domain::error::TransportError;
use crate::domain::models::{Record, Schema};

/// One message pulled from the input interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// The upstream announced a new record layout; earlier field offsets are void
    Schema(Schema),
    /// A data record, possibly the end-of-stream marker
    Record(Record),
}

/// Port for the input interface
///
/// Implementations deliver messages strictly in arrival order. `recv` must be
/// cancel safe: dropping the future before it resolves loses no message.
#[async_trait]
pub trait RecordSource: Send {
    /// Receive the next message
    ///
    /// # Returns
    ///
    /// * `Ok(Inbound)` - The next schema announcement or record
    /// * `Err(TransportError::Timeout)` - Nothing arrived within the receive timeout
    /// * `Err(TransportError::Closed)` - The upstream terminated cleanly
    async fn recv(&mut self) -> Result<Inbound, TransportError>;
}

/// Port for an output interface
#[async_trait]
pub trait RecordSink: Send {
    /// Announce the layout of the records that follow
    async fn announce_schema(&mut self, schema: &Schema) -> Result<(), TransportError>;

    /// Send one complete record
    async fn send(&mut self, record: &Record) -> Result<(), TransportError>;

    /// Flush buffered records downstream
    async fn flush(&mut self) -> Result<(), TransportError>;
}

#[async_trait]
impl<T: RecordSource + ?Sized> RecordSource for Box<T> {
    async fn recv(&mut self) -> Result<Inbound, TransportError> {
        (**self).recv().await
    }
}

#[async_trait]
impl<T: RecordSink + ?Sized> RecordSink for Box<T> {
    async fn announce_schema(&mut self, schema: &Schema) -> Result<(), TransportError> {
        (**self).announce_schema(schema).await
    }

    async fn send(&mut self, record: &Record) -> Result<(), TransportError> {
        (**self).send(record).await
    }

    async fn flush(&mut self) -> Result<(), TransportError> {
        (**self).flush().await
    }
}
