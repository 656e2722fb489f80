//! Objective function capability.
//!
//! The population never calls an objective. Drivers decode genes into
//! physical units and ask the objective for one scalar to maximize.

use crate::schema::ObjectiveType;

/// Scalar fitness of a decoded design, higher is better.
pub trait Objective: Sync {
    /// Fitness of `values` (physical units, one per design variable).
    fn evaluate(&self, values: &[f64]) -> f64;

    /// Whether `values` satisfy the caller's constraints.
    fn is_feasible(&self, _values: &[f64]) -> bool {
        true
    }
}

impl<F> Objective for F
where
    F: Fn(&[f64]) -> f64 + Sync,
{
    fn evaluate(&self, values: &[f64]) -> f64 {
        self(values)
    }
}

/// Solar declination in degrees for a day of the year (Cooper's equation).
pub fn declination_deg(day_of_year: u16) -> f64 {
    let angle = 360.0 / 365.0 * (284.0 + f64::from(day_of_year));
    23.45 * angle.to_radians().sin()
}

/// Closed-form stand-in for an energy-yield simulation: cosine of the solar
/// noon incidence angle on an equator-facing panel.
///
/// `values[0]` is the tilt in degrees.
#[derive(Debug, Clone)]
pub struct NoonIncidence {
    /// Site latitude in degrees (positive north).
    pub latitude_deg: f64,
    /// Single day or full-year average.
    pub objective: ObjectiveType,
    /// Tilts above this are infeasible.
    pub max_tilt_deg: Option<f64>,
}

impl NoonIncidence {
    pub fn new(latitude_deg: f64, objective: ObjectiveType) -> Self {
        Self {
            latitude_deg,
            objective,
            max_tilt_deg: None,
        }
    }

    /// Reject designs tilted beyond `max_tilt_deg`.
    pub fn with_max_tilt(mut self, max_tilt_deg: f64) -> Self {
        self.max_tilt_deg = Some(max_tilt_deg);
        self
    }

    fn day_score(&self, tilt_deg: f64, day_of_year: u16) -> f64 {
        let declination = declination_deg(day_of_year) * self.latitude_deg.signum();
        let incidence = self.latitude_deg.abs() - declination - tilt_deg;
        incidence.to_radians().cos().max(0.0)
    }
}

impl Objective for NoonIncidence {
    fn evaluate(&self, values: &[f64]) -> f64 {
        let tilt = values[0];
        match self.objective {
            ObjectiveType::SingleDay { day_of_year } => self.day_score(tilt, day_of_year),
            ObjectiveType::FullYear => {
                (1..=365u16).map(|d| self.day_score(tilt, d)).sum::<f64>() / 365.0
            }
        }
    }

    fn is_feasible(&self, values: &[f64]) -> bool {
        self.max_tilt_deg.is_none_or(|max| values[0] <= max)
    }
}
