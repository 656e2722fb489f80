//! Design variable definitions and configuration errors.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A physical design knob mapped onto one normalized gene.
///
/// Genes live in [0, 1); `decode` scales them linearly into `[min, max)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignVariable {
    /// Display name (e.g. "tilt").
    pub name: String,
    /// Lower physical bound (inclusive).
    pub min: f64,
    /// Upper physical bound.
    pub max: f64,
    /// Unit label used when printing results.
    #[serde(default)]
    pub unit: String,
}

impl DesignVariable {
    /// Create a variable without a unit label.
    pub fn new(name: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            name: name.into(),
            min,
            max,
            unit: String::new(),
        }
    }

    /// Attach a unit label.
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    /// Map a normalized gene to physical units.
    #[inline]
    pub fn decode(&self, gene: f64) -> f64 {
        self.min + gene * (self.max - self.min)
    }

    /// Map a physical value back to a normalized gene, clamped into [0, 1).
    pub fn encode(&self, value: f64) -> f64 {
        let span = self.max - self.min;
        if span <= 0.0 {
            return 0.0;
        }
        ((value - self.min) / span).clamp(0.0, 1.0 - f64::EPSILON)
    }
}

impl Default for DesignVariable {
    fn default() -> Self {
        Self::new("tilt", 0.0, 90.0).with_unit("deg")
    }
}

/// Decode a whole chromosome against its variable table.
pub fn decode_genes(variables: &[DesignVariable], genes: &[f64]) -> Vec<f64> {
    assert_eq!(
        variables.len(),
        genes.len(),
        "chromosome length does not match variable count"
    );
    variables
        .iter()
        .zip(genes)
        .map(|(v, &g)| v.decode(g))
        .collect()
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Population size {size} outside [{min}, {max}]")]
    PopulationSize { size: usize, min: usize, max: usize },
    #[error("{name} rate {value} must be within [0, 1]")]
    InvalidRate { name: &'static str, value: f64 },
    #[error("Selection rate {0} keeps fewer than two survivors")]
    TooFewSurvivors(f64),
    #[error("Convergence threshold {value} outside [0, {max}]")]
    InvalidThreshold { value: f64, max: f64 },
    #[error("Discretization needs at least 2 steps, got {0}")]
    InvalidDiscretization(usize),
    #[error("No design variables specified")]
    NoVariables,
    #[error("Variable {name}: min ({min}) must be below max ({max})")]
    InvalidBounds { name: String, min: f64, max: f64 },
    #[error("Maximum generation count must be positive")]
    InvalidGenerations,
    #[error("Search method {0} is not supported")]
    UnsupportedSearchMethod(&'static str),
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}
