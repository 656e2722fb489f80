//! Schema module - Configuration and result types for design optimization.

mod config;
mod evolution;

pub use config::*;
pub use evolution::*;
