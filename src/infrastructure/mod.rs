//! Infrastructure layer: configuration, logging, randomness and record transports

pub mod config;
pub mod logging;
pub mod random;
pub mod transport;
