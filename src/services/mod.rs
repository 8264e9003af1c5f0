//! Record selection and routing services

pub mod blacklist;
pub mod gaussian;
pub mod lifecycle;
pub mod query_strategy;
pub mod selection_engine;

pub use blacklist::{Blacklist, BlacklistFilter};
pub use gaussian::GaussianGenerator;
pub use query_strategy::QueryStrategy;
pub use selection_engine::SelectionEngine;
