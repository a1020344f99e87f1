//! Journal records: experiences and the ingestions logged in them.

mod grouping;
mod suggestion;

pub use grouping::{
    experience_to_add_to, is_current_experience, separation_window, ExperienceCandidate,
    SavedTimeDisplayOption, TimeDisplayOption, HOURS_TO_SEPARATE_INGESTIONS,
    MAX_HOURS_TO_SEPARATE_INGESTIONS,
};
pub use suggestion::{dose_suggestions, DoseSuggestion, SubstanceRouteSuggestion};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::substance::AdministrationRoute;

/// Consumer name that stands for the journal owner.
pub const YOU: &str = "you";

/// A session of one or more ingestions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    pub id: i64,
    pub title: String,
    pub text: String,
    pub creation_date: DateTime<Utc>,
    pub sort_date: DateTime<Utc>,
    pub is_favorite: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExperience {
    pub title: String,
    #[serde(default)]
    pub text: String,
    pub sort_date: DateTime<Utc>,
}

impl NewExperience {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::Empty("title".into()));
        }
        Ok(())
    }
}

/// One recorded instance of taking a substance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingestion {
    pub id: i64,
    pub experience_id: i64,
    pub substance_name: String,
    pub time: DateTime<Utc>,
    pub route: AdministrationRoute,
    pub dose: Option<f64>,
    pub is_dose_an_estimate: bool,
    pub estimated_dose_standard_deviation: Option<f64>,
    pub units: String,
    pub notes: Option<String>,
    /// Who took it; `None` is the journal owner.
    pub consumer_name: Option<String>,
}

impl Ingestion {
    /// Dose with estimate marker and units, e.g. `~100 mg`.
    pub fn dose_text(&self) -> String {
        match self.dose {
            Some(dose) => {
                let estimate = if self.is_dose_an_estimate { "~" } else { "" };
                let deviation = self
                    .estimated_dose_standard_deviation
                    .map(|d| format!("±{}", readable_number(d)))
                    .unwrap_or_default();
                format!("{estimate}{}{deviation} {}", readable_number(dose), self.units)
            }
            None => "Unknown Dose".to_string(),
        }
    }
}

/// Insert form of [`Ingestion`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewIngestion {
    pub experience_id: i64,
    pub substance_name: String,
    pub time: DateTime<Utc>,
    pub route: AdministrationRoute,
    pub dose: Option<f64>,
    #[serde(default)]
    pub is_dose_an_estimate: bool,
    #[serde(default)]
    pub estimated_dose_standard_deviation: Option<f64>,
    pub units: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub consumer_name: Option<String>,
}

impl NewIngestion {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.substance_name.trim().is_empty() {
            return Err(ValidationError::Empty("substance_name".into()));
        }
        if let Some(dose) = self.dose {
            if dose < 0.0 || !dose.is_finite() {
                return Err(ValidationError::NegativeDose(dose));
            }
        }
        if let Some(deviation) = self.estimated_dose_standard_deviation {
            if deviation < 0.0 {
                return Err(ValidationError::InvalidValue {
                    field: "estimated_dose_standard_deviation".into(),
                    message: "must not be negative".into(),
                });
            }
            if !self.is_dose_an_estimate {
                return Err(ValidationError::InvalidValue {
                    field: "estimated_dose_standard_deviation".into(),
                    message: "only allowed for estimated doses".into(),
                });
            }
        }
        Ok(())
    }
}

/// Keep ingestions of one consumer. `None` or [`YOU`] selects the owner's.
pub fn filter_by_consumer(ingestions: &[Ingestion], consumer: Option<&str>) -> Vec<Ingestion> {
    let consumer = consumer.filter(|c| !c.eq_ignore_ascii_case(YOU));
    ingestions
        .iter()
        .filter(|i| i.consumer_name.as_deref() == consumer)
        .cloned()
        .collect()
}

/// Format a number without trailing zeros, e.g. `2.50` -> `2.5`, `10.0` -> `10`.
pub fn readable_number(value: f64) -> String {
    let text = format!("{value:.2}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(consumer: Option<&str>) -> Ingestion {
        Ingestion {
            id: 1,
            experience_id: 1,
            substance_name: "Caffeine".into(),
            time: Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap(),
            route: AdministrationRoute::Oral,
            dose: Some(100.0),
            is_dose_an_estimate: true,
            estimated_dose_standard_deviation: Some(12.5),
            units: "mg".into(),
            notes: None,
            consumer_name: consumer.map(str::to_string),
        }
    }

    #[test]
    fn dose_text_marks_estimates() {
        assert_eq!(sample(None).dose_text(), "~100±12.5 mg");
        let unknown = Ingestion { dose: None, ..sample(None) };
        assert_eq!(unknown.dose_text(), "Unknown Dose");
    }

    #[test]
    fn filters_owner_and_named_consumers() {
        let all = vec![sample(None), sample(Some("Alice")), sample(Some("Bob"))];
        assert_eq!(filter_by_consumer(&all, None).len(), 1);
        assert_eq!(filter_by_consumer(&all, Some("You")).len(), 1);
        let alice = filter_by_consumer(&all, Some("Alice"));
        assert_eq!(alice.len(), 1);
        assert_eq!(alice[0].consumer_name.as_deref(), Some("Alice"));
    }

    #[test]
    fn validation_rejects_bad_input() {
        let valid = NewIngestion {
            experience_id: 1,
            substance_name: "Caffeine".into(),
            time: Utc::now(),
            route: AdministrationRoute::Oral,
            dose: Some(50.0),
            is_dose_an_estimate: false,
            estimated_dose_standard_deviation: None,
            units: "mg".into(),
            notes: None,
            consumer_name: None,
        };
        assert!(valid.validate().is_ok());

        let empty = NewIngestion { substance_name: " ".into(), ..valid.clone() };
        assert!(matches!(empty.validate(), Err(ValidationError::Empty(_))));

        let negative = NewIngestion { dose: Some(-1.0), ..valid.clone() };
        assert!(matches!(negative.validate(), Err(ValidationError::NegativeDose(_))));

        let deviation_without_estimate = NewIngestion {
            estimated_dose_standard_deviation: Some(5.0),
            ..valid
        };
        assert!(deviation_without_estimate.validate().is_err());
    }

    #[test]
    fn readable_number_trims_zeros() {
        assert_eq!(readable_number(10.0), "10");
        assert_eq!(readable_number(2.5), "2.5");
        assert_eq!(readable_number(0.126), "0.13");
        assert_eq!(readable_number(100.0), "100");
    }
}
