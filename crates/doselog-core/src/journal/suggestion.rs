//! Quick-add suggestions built from past ingestions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Ingestion;
use crate::substance::AdministrationRoute;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoseSuggestion {
    pub dose: Option<f64>,
    pub units: String,
    pub is_estimate: bool,
    pub estimated_dose_standard_deviation: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubstanceRouteSuggestion {
    pub substance_name: String,
    pub route: AdministrationRoute,
    /// Distinct doses, most recent first.
    pub doses: Vec<DoseSuggestion>,
    pub last_ingested_time: DateTime<Utc>,
}

/// One suggestion per substance and route, most recently used first.
pub fn dose_suggestions(ingestions: &[Ingestion], max_doses: usize) -> Vec<SubstanceRouteSuggestion> {
    let mut recent: Vec<&Ingestion> = ingestions.iter().collect();
    recent.sort_by(|a, b| b.time.cmp(&a.time));

    let mut suggestions: Vec<SubstanceRouteSuggestion> = Vec::new();
    for ingestion in recent {
        let dose = DoseSuggestion {
            dose: ingestion.dose,
            units: ingestion.units.clone(),
            is_estimate: ingestion.is_dose_an_estimate,
            estimated_dose_standard_deviation: ingestion.estimated_dose_standard_deviation,
        };
        let existing = suggestions.iter_mut().find(|s| {
            s.route == ingestion.route
                && s.substance_name.eq_ignore_ascii_case(&ingestion.substance_name)
        });
        match existing {
            Some(suggestion) => {
                if suggestion.doses.len() < max_doses && !suggestion.doses.contains(&dose) {
                    suggestion.doses.push(dose);
                }
            }
            None => suggestions.push(SubstanceRouteSuggestion {
                substance_name: ingestion.substance_name.clone(),
                route: ingestion.route,
                doses: if max_doses > 0 { vec![dose] } else { Vec::new() },
                last_ingested_time: ingestion.time,
            }),
        }
    }
    suggestions
}
