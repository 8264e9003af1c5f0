//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines the interfaces that infrastructure adapters implement:
//! - RecordSource / RecordSink: the record transport
//! - UniformSource: uniform randomness consumed by the query strategies

pub mod random;
pub mod transport;

pub use random::UniformSource;
pub use transport::{Inbound, RecordSink, RecordSource};
