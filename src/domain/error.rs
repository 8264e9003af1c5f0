use thiserror::Error;

use super::models::schema::FieldKind;

/// Errors raised while parsing a schema announcement or resolving a field in it
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Schema is empty")]
    Empty,

    #[error("Malformed schema entry: {0:?} (expected \"<type> <name>\")")]
    MalformedEntry(String),

    #[error("Unknown field type {kind:?} for field {field:?}")]
    UnknownKind { kind: String, field: String },

    #[error("Duplicate field name in schema: {0}")]
    DuplicateField(String),

    #[error("Field {0:?} is not present in the schema")]
    MissingField(String),

    #[error("Field {field:?} has type {actual}, expected one of {expected:?}")]
    KindMismatch {
        field: String,
        actual: FieldKind,
        expected: Vec<FieldKind>,
    },

    #[error("Schema record size {0} exceeds the maximum frame payload")]
    TooLarge(usize),
}

/// Transport-level failures reported by record sources and sinks
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Transport operation timed out")]
    Timeout,

    #[error("Transport closed by peer")]
    Closed,

    #[error("Transport I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed frame: {0}")]
    Frame(String),

    #[error("Invalid schema announcement: {0}")]
    Schema(#[from] SchemaError),
}

/// Fatal errors of the selection engine
#[derive(Error, Debug)]
pub enum SelectionError {
    #[error("Record received before any schema was announced")]
    MissingSchema,

    #[error("Probability field cannot be resolved: {0}")]
    UnresolvableField(#[source] SchemaError),

    #[error("Transport failure: {0}")]
    Transport(#[from] TransportError),
}

/// Errors of the blacklist filter
#[derive(Error, Debug)]
pub enum BlacklistError {
    #[error("Failed to read blacklist file {path}: {source}")]
    Load {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Record received before any schema was announced")]
    MissingSchema,

    #[error("Blacklist field cannot be resolved: {0}")]
    UnresolvableField(#[source] SchemaError),

    #[error("Transport failure: {0}")]
    Transport(#[from] TransportError),
}
