//! In-process transport backed by a tokio channel
//!
//! Used to drive the engines from the same process, e.g. in tests or when
//! embedding the filter as a library.

use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::mpsc;

use crate::domain::error::TransportError;
use crate::domain::models::{Record, Schema};
use crate::domain::ports::{Inbound, RecordSink, RecordSource};

/// Create a connected feeder / source pair
pub fn memory_channel(capacity: usize) -> (MemoryFeeder, MemorySource) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (MemoryFeeder { tx }, MemorySource { rx })
}

/// Producer side of an in-memory source
#[derive(Clone)]
pub struct MemoryFeeder {
    tx: mpsc::Sender<Result<Inbound, TransportError>>,
}

impl MemoryFeeder {
    /// Announce a schema; false once the source is gone
    pub async fn schema(&self, schema: Schema) -> bool {
        self.tx.send(Ok(Inbound::Schema(schema))).await.is_ok()
    }

    /// Deliver a record; false once the source is gone
    pub async fn record(&self, record: Record) -> bool {
        self.tx.send(Ok(Inbound::Record(record))).await.is_ok()
    }

    /// Deliver a transport error, e.g. a receive timeout
    pub async fn error(&self, err: TransportError) -> bool {
        self.tx.send(Err(err)).await.is_ok()
    }
}

/// Consumer side; reports [`TransportError::Closed`] once every feeder is dropped
pub struct MemorySource {
    rx: mpsc::Receiver<Result<Inbound, TransportError>>,
}

#[async_trait]
impl RecordSource for MemorySource {
    async fn recv(&mut self) -> Result<Inbound, TransportError> {
        self.rx.recv().await.unwrap_or(Err(TransportError::Closed))
    }
}

/// Message captured by a [`MemorySink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Schema(Schema),
    Record(Record),
}

/// Sink collecting everything sent to it
#[derive(Debug, Default)]
pub struct MemorySink {
    sent: Vec<Outbound>,
    scripted_failures: VecDeque<TransportError>,
    flushes: usize,
    stall_sends: bool,
    announce_failures: VecDeque<TransportError>,
}

impl MemorySink {
    /// An empty sink that accepts everything
    pub fn new() -> Self {
        Self::default()
    }

    /// The next sends fail with `failures`, in order
    pub fn failing_with(failures: impl IntoIterator<Item = TransportError>) -> Self {
        Self {
            scripted_failures: failures.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Record sends never complete, like a peer that stopped reading
    pub fn stalling_sends() -> Self {
        Self {
            stall_sends: true,
            ..Self::default()
        }
    }

    /// The next schema announcements fail with `failures`, in order
    #[must_use]
    pub fn failing_announcements(mut self, failures: impl IntoIterator<Item = TransportError>) -> Self {
        self.announce_failures = failures.into_iter().collect();
        self
    }

    /// Everything accepted, in order
    pub fn sent(&self) -> &[Outbound] {
        &self.sent
    }

    /// Records sent, schema announcements excluded
    pub fn records(&self) -> Vec<&Record> {
        self.sent
            .iter()
            .filter_map(|o| match o {
                Outbound::Record(r) => Some(r),
                Outbound::Schema(_) => None,
            })
            .collect()
    }

    /// Number of flush calls
    pub const fn flushes(&self) -> usize {
        self.flushes
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn announce_schema(&mut self, schema: &Schema) -> Result<(), TransportError> {
        if let Some(err) = self.announce_failures.pop_front() {
            return Err(err);
        }
        self.sent.push(Outbound::Schema(schema.clone()));
        Ok(())
    }

    async fn send(&mut self, record: &Record) -> Result<(), TransportError> {
        if self.stall_sends {
            std::future::pending::<()>().await;
        }
        if let Some(err) = self.scripted_failures.pop_front() {
            return Err(err);
        }
        self.sent.push(Outbound::Record(record.clone()));
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), TransportError> {
        self.flushes += 1;
        Ok(())
    }
}
