//! Substance reference model.
//!
//! Substances come from a bundled JSON dataset. Each substance lists the
//! routes it can be taken by, with optional dose boundaries and phase
//! durations per route.

mod catalog;
mod dose;
mod route;
pub mod search;

pub use catalog::SubstanceCatalog;
pub use dose::{DoseClass, DoseRange, RoaDose, DEFAULT_HORIZONTAL_WEIGHT};
pub use route::AdministrationRoute;

use serde::{Deserialize, Serialize};

use crate::timeline::DurationRange;

/// Phase durations for one route. Any phase may be unknown.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RoaDuration {
    #[serde(default)]
    pub onset: Option<DurationRange>,
    #[serde(default)]
    pub comeup: Option<DurationRange>,
    #[serde(default)]
    pub peak: Option<DurationRange>,
    #[serde(default)]
    pub offset: Option<DurationRange>,
    #[serde(default)]
    pub total: Option<DurationRange>,
    #[serde(default)]
    pub afterglow: Option<DurationRange>,
}

/// One route of administration of a substance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roa {
    pub route: AdministrationRoute,
    #[serde(default)]
    pub dose: Option<RoaDose>,
    #[serde(default)]
    pub duration: Option<RoaDuration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Substance {
    pub name: String,
    #[serde(default)]
    pub common_names: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub roas: Vec<Roa>,
    #[serde(default)]
    pub url: Option<String>,
}

impl Substance {
    pub fn get_roa(&self, route: AdministrationRoute) -> Option<&Roa> {
        self.roas.iter().find(|roa| roa.route == route)
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.categories
            .iter()
            .any(|c| c.eq_ignore_ascii_case(category))
    }
}

/// Read access to substance reference data.
pub trait SubstanceLookup {
    fn get_substance(&self, name: &str) -> Option<&Substance>;

    fn all_substances(&self) -> &[Substance];

    fn get_roa(&self, name: &str, route: AdministrationRoute) -> Option<&Roa> {
        self.get_substance(name)?.get_roa(route)
    }

    /// Every category used by any substance, sorted and deduplicated.
    fn all_categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = self
            .all_substances()
            .iter()
            .flat_map(|s| s.categories.iter().map(|c| c.to_lowercase()))
            .collect();
        categories.sort();
        categories.dedup();
        categories
    }
}
