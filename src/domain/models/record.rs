//! Opaque records as carried between interfaces.

/// One opaque record as delivered by the transport
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    payload: Vec<u8>,
}

impl Record {
    /// Wrap a raw payload
    pub const fn new(payload: Vec<u8>) -> Self {
        Self { payload }
    }

    /// The end-of-stream marker: a record carrying a single zero byte
    pub fn end_of_stream() -> Self {
        Self { payload: vec![0] }
    }

    /// Raw bytes in the layout of the last announced schema
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Payload size in bytes
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Whether the payload has no bytes at all
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Payloads of zero or one byte signal the end of the stream
    pub fn is_end_of_stream(&self) -> bool {
        self.payload.len() <= 1
    }
}

impl From<Vec<u8>> for Record {
    fn from(payload: Vec<u8>) -> Self {
        Self::new(payload)
    }
}
