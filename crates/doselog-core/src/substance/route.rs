use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Route of administration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdministrationRoute {
    Oral,
    Sublingual,
    Buccal,
    Insufflated,
    Rectal,
    Transdermal,
    Subcutaneous,
    Intramuscular,
    Intravenous,
    Smoked,
    Inhaled,
}

impl AdministrationRoute {
    pub const ALL: [AdministrationRoute; 11] = [
        Self::Oral,
        Self::Sublingual,
        Self::Buccal,
        Self::Insufflated,
        Self::Rectal,
        Self::Transdermal,
        Self::Subcutaneous,
        Self::Intramuscular,
        Self::Intravenous,
        Self::Smoked,
        Self::Inhaled,
    ];

    pub fn display_text(&self) -> &'static str {
        match self {
            Self::Oral => "oral",
            Self::Sublingual => "sublingual",
            Self::Buccal => "buccal",
            Self::Insufflated => "insufflated",
            Self::Rectal => "rectal",
            Self::Transdermal => "transdermal",
            Self::Subcutaneous => "subcutaneous",
            Self::Intramuscular => "intramuscular",
            Self::Intravenous => "intravenous",
            Self::Smoked => "smoked",
            Self::Inhaled => "inhaled",
        }
    }
}

impl fmt::Display for AdministrationRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_text())
    }
}

impl FromStr for AdministrationRoute {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|route| route.display_text() == lower)
            .ok_or_else(|| ValidationError::InvalidValue {
                field: "route".into(),
                message: format!("unknown route '{s}'"),
            })
    }
}
