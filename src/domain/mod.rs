//! Domain layer for the selection filter
//!
//! This module contains the record model, strategy state and the port traits
//! the engines are written against.

pub mod error;
pub mod models;
pub mod ports;

// Re-export error types for convenient access
pub use error::{BlacklistError, SchemaError, SelectionError, TransportError};
