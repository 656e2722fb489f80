//! Design Evo - Continuous-parameter evolutionary optimization.
//!
//! This crate searches a small set of real-valued design variables (a panel
//! tilt angle, a mounting height, ...) for the values that maximize a
//! caller-supplied scalar objective.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Configuration, design variables and result types
//! - `compute`: The population engine and a generation-loop driver
//!
//! # Example
//!
//! ```rust,no_run
//! use design_evo::{
//!     compute::Optimizer,
//!     schema::{DesignVariable, EvolutionConfig},
//! };
//!
//! let config = EvolutionConfig {
//!     variables: vec![DesignVariable::new("tilt", 0.0, 90.0)],
//!     random_seed: Some(42),
//!     ..Default::default()
//! };
//!
//! let mut optimizer = Optimizer::new(config).unwrap();
//! let result = optimizer.run(&|values: &[f64]| -(values[0] - 32.0).powi(2)).unwrap();
//!
//! println!("Best tilt: {:.2} deg", result.best.values[0]);
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::{EvolutionError, Individual, Objective, Optimizer, Population};
pub use schema::{DesignVariable, EvolutionConfig, SelectionMethod};
