//! salf - Stream Active-Learning Filter
//!
//! Reads a stream of fixed-layout records carrying a classifier's
//! predicted-class probability and forwards a budget-limited subset of them
//! to a labeling oracle, following one of four query strategies. A sibling
//! blacklist filter routes records by destination address and port.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): records, schemas, strategy state, errors and ports
//! - **Service Layer** (`services`): query strategies, selection engine, blacklist filter
//! - **Infrastructure Layer** (`infrastructure`): configuration, logging, randomness, transports
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use salf::infrastructure::transport::{memory_channel, MemorySink};
//! use salf::{SelectionConfig, SelectionEngine};
//!
//! let (feeder, source) = memory_channel(64);
//! let mut engine = SelectionEngine::from_config(source, MemorySink::new(), &SelectionConfig::default());
//! let report = engine.run(std::future::pending()).await?;
//! ```

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::error::{BlacklistError, SchemaError, SelectionError, TransportError};
pub use domain::models::{
    Config, EngineReport, EngineState, EngineStats, FieldAccessor, FieldKind, FilterReport, Record, Schema,
    SelectionConfig, StrategyKind, StrategyState,
};
pub use domain::ports::{Inbound, RecordSink, RecordSource, UniformSource};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{Blacklist, BlacklistFilter, QueryStrategy, SelectionEngine};
