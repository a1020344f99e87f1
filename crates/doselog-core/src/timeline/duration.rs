//! Duration ranges for pharmacokinetic phases.

use serde::{Deserialize, Serialize};

/// Unit a duration range is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl DurationUnit {
    /// Number of seconds in one unit.
    pub fn in_seconds(&self) -> f64 {
        match self {
            Self::Seconds => 1.0,
            Self::Minutes => 60.0,
            Self::Hours => 3_600.0,
            Self::Days => 86_400.0,
        }
    }
}

/// A duration range as it appears in the substance dataset.
///
/// Either end may be missing; only complete ranges take part in timelines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationRange {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    pub units: DurationUnit,
}

impl DurationRange {
    pub fn new(min: Option<f64>, max: Option<f64>, units: DurationUnit) -> Self {
        Self { min, max, units }
    }

    /// Convert to a [`FullDurationRange`] if both ends are known.
    pub fn to_full(&self) -> Option<FullDurationRange> {
        let min = self.min?;
        let max = self.max?;
        Some(FullDurationRange::new(min, max, self.units))
    }
}

/// A duration range with both ends known.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FullDurationRange {
    pub min: f64,
    pub max: f64,
    pub units: DurationUnit,
}

impl FullDurationRange {
    pub fn new(min: f64, max: f64, units: DurationUnit) -> Self {
        Self { min, max, units }
    }

    /// Range given directly in seconds.
    pub fn seconds(min: f64, max: f64) -> Self {
        Self::new(min, max, DurationUnit::Seconds)
    }

    pub fn min_in_seconds(&self) -> f64 {
        self.min * self.units.in_seconds()
    }

    pub fn max_in_seconds(&self) -> f64 {
        self.max * self.units.in_seconds()
    }

    /// Linear blend of min and max at `weight` (0 = min, 1 = max), in seconds.
    pub fn interpolate_at_value_in_seconds(&self, weight: f64) -> f64 {
        let min = self.min_in_seconds();
        let max = self.max_in_seconds();
        min + (max - min) * weight
    }
}
