//! Domain models
//!
//! Records and their schema, strategy identifiers and adaptive state,
//! configuration, and the engines' run statistics.

pub mod config;
pub mod record;
pub mod report;
pub mod schema;
pub mod strategy;

pub use config::{BlacklistConfig, Config, LoggingConfig, SelectionConfig, TransportConfig};
pub use record::Record;
pub use report::{EngineReport, EngineState, EngineStats, FilterReport};
pub use schema::{FieldAccessor, FieldKind, FieldSpec, Schema, MAX_RECORD_SIZE};
pub use strategy::{StrategyKind, StrategyState, T_MAX};
