pub mod config;
pub mod engines;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod types;

pub use error::{EvolveError, Result};
pub use pipeline::{Pipeline, RunSummary};
