//! Grouping ingestions into experiences by time.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::Ingestion;
use crate::error::ValidationError;

/// Ingestions further apart than this belong to different experiences.
pub const HOURS_TO_SEPARATE_INGESTIONS: i64 = 12;

/// Upper bound for the separation window (one year).
pub const MAX_HOURS_TO_SEPARATE_INGESTIONS: i64 = 24 * 365;

/// How ingestion times are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeDisplayOption {
    Regular,
    RelativeToNow,
    RelativeToStart,
    TimeBetween,
}

/// The persisted preference; `Auto` depends on whether the experience is ongoing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SavedTimeDisplayOption {
    #[default]
    Auto,
    Regular,
    RelativeToNow,
    RelativeToStart,
    TimeBetween,
}

impl SavedTimeDisplayOption {
    pub fn resolve(self, is_current_experience: bool) -> TimeDisplayOption {
        match self {
            Self::Auto if is_current_experience => TimeDisplayOption::RelativeToNow,
            Self::Auto => TimeDisplayOption::Regular,
            Self::Regular => TimeDisplayOption::Regular,
            Self::RelativeToNow => TimeDisplayOption::RelativeToNow,
            Self::RelativeToStart => TimeDisplayOption::RelativeToStart,
            Self::TimeBetween => TimeDisplayOption::TimeBetween,
        }
    }
}

/// The separation window for `hour_limit`, rejecting non-positive or oversized limits.
pub fn separation_window(hour_limit: i64) -> Result<TimeDelta, ValidationError> {
    if !(1..=MAX_HOURS_TO_SEPARATE_INGESTIONS).contains(&hour_limit) {
        return Err(ValidationError::InvalidValue {
            field: "hours_to_separate_ingestions".into(),
            message: format!(
                "expected 1..={MAX_HOURS_TO_SEPARATE_INGESTIONS} hours, got {hour_limit}"
            ),
        });
    }
    TimeDelta::try_hours(hour_limit).ok_or_else(|| ValidationError::InvalidValue {
        field: "hours_to_separate_ingestions".into(),
        message: format!("{hour_limit} hours is out of range"),
    })
}

/// True when the latest ingestion happened less than `hour_limit` hours before `now`.
pub fn is_current_experience(
    ingestions: &[Ingestion],
    now: DateTime<Utc>,
    hour_limit: i64,
) -> Result<bool, ValidationError> {
    let window = separation_window(hour_limit)?;
    let Some(last) = ingestions.iter().map(|i| i.time).max() else {
        return Ok(false);
    };
    // A window reaching before the representable range covers everything.
    Ok(now.checked_sub_signed(window).map_or(true, |cutoff| cutoff < last))
}

/// An experience with the time of its latest ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceCandidate {
    pub experience_id: i64,
    pub title: String,
    pub last_ingestion_time: DateTime<Utc>,
}

/// The experience a new ingestion at `time` should join, if any.
///
/// Candidates qualify when their latest ingestion lies within `hour_limit`
/// hours of `time` in either direction; the closest one wins.
pub fn experience_to_add_to(
    candidates: &[ExperienceCandidate],
    time: DateTime<Utc>,
    hour_limit: i64,
) -> Result<Option<&ExperienceCandidate>, ValidationError> {
    let limit = separation_window(hour_limit)?.num_seconds();
    let distance = |c: &ExperienceCandidate| (c.last_ingestion_time - time).num_seconds().abs();
    Ok(candidates
        .iter()
        .filter(|c| distance(*c) <= limit)
        .min_by_key(|c| distance(*c)))
}
