//! Dose ranges and dose classification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Weight used when a dose cannot be placed within its common range.
pub const DEFAULT_HORIZONTAL_WEIGHT: f64 = 0.5;

/// Effective dose category, from weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoseClass {
    Threshold,
    Light,
    Common,
    Strong,
    Heavy,
}

impl DoseClass {
    pub const ALL: [DoseClass; 5] = [
        Self::Threshold,
        Self::Light,
        Self::Common,
        Self::Strong,
        Self::Heavy,
    ];

    /// Number of filled dots in the dose indicator (out of five).
    pub fn num_dots(&self) -> usize {
        match self {
            Self::Threshold => 1,
            Self::Light => 2,
            Self::Common => 3,
            Self::Strong => 4,
            Self::Heavy => 5,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Threshold => {
                "A threshold dose is the minimum dose at which the effects of a substance \
                 begin to be noticeable. Effects are faint and easy to mistake for placebo."
            }
            Self::Light => {
                "A light dose produces mild effects that are clearly noticeable but do not \
                 take over. Ordinary thinking and functioning remain largely intact."
            }
            Self::Common => {
                "A common dose produces the effects the substance is usually taken for. \
                 They are distinct and stable, and most people can still manage them."
            }
            Self::Strong => {
                "A strong dose produces intense effects that can be hard to handle. \
                 Negative side effects become more likely and coordination may suffer."
            }
            Self::Heavy => {
                "A heavy dose produces overwhelming effects. The risk of serious adverse \
                 reactions rises sharply and it is generally considered unsafe."
            }
        }
    }

    /// Dot indicator such as `●●●○○`.
    pub fn dot_string(&self) -> String {
        let filled = self.num_dots();
        let empty = Self::ALL.len() - filled;
        format!("{}{}", "●".repeat(filled), "○".repeat(empty))
    }
}

impl fmt::Display for DoseClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Threshold => "threshold",
            Self::Light => "light",
            Self::Common => "common",
            Self::Strong => "strong",
            Self::Heavy => "heavy",
        };
        f.write_str(name)
    }
}

/// A dose range with optional ends.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DoseRange {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

impl DoseRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }
}

/// Dose boundaries for one route of one substance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoaDose {
    pub units: String,
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub light: Option<DoseRange>,
    #[serde(default)]
    pub common: Option<DoseRange>,
    #[serde(default)]
    pub strong: Option<DoseRange>,
    /// Doses at or above this are heavy.
    #[serde(default)]
    pub heavy: Option<f64>,
}

impl RoaDose {
    fn units_match(&self, units: &str) -> bool {
        self.units.trim().eq_ignore_ascii_case(units.trim())
    }

    /// Lower bound of each class that the dataset defines.
    fn lower_bounds(&self) -> [(DoseClass, Option<f64>); 5] {
        [
            (DoseClass::Threshold, self.threshold),
            (DoseClass::Light, self.light.and_then(|r| r.min)),
            (DoseClass::Common, self.common.and_then(|r| r.min)),
            (DoseClass::Strong, self.strong.and_then(|r| r.min)),
            (DoseClass::Heavy, self.heavy),
        ]
    }

    /// Classify `dose` given in `units`.
    ///
    /// Returns `None` when the units differ from the dataset's or the dose is
    /// below every known boundary.
    pub fn classify(&self, dose: f64, units: &str) -> Option<DoseClass> {
        if !self.units_match(units) {
            return None;
        }
        self.lower_bounds()
            .into_iter()
            .rev()
            .find_map(|(class, bound)| bound.filter(|&b| dose >= b).map(|_| class))
    }

    /// Where a dose sits within the common range, 0.0..=1.0.
    ///
    /// Unknown doses, foreign units and missing common ranges give
    /// [`DEFAULT_HORIZONTAL_WEIGHT`].
    pub fn horizontal_weight(&self, dose: Option<f64>, units: &str) -> f64 {
        let (Some(dose), Some(DoseRange { min: Some(min), max: Some(max) })) = (dose, self.common)
        else {
            return DEFAULT_HORIZONTAL_WEIGHT;
        };
        if !self.units_match(units) {
            return DEFAULT_HORIZONTAL_WEIGHT;
        }
        if dose < min {
            0.0
        } else if dose >= max || max <= min {
            1.0
        } else {
            ((dose - min) / (max - min)).clamp(0.0, 1.0)
        }
    }
}
