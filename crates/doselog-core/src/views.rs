//! Read-side views over the journal.
//!
//! Each view is plain composition: fetch ingestions from an
//! [`IngestionStore`], filter them, then hand them to a pure computation.

use chrono::{DateTime, TimeDelta, Utc};

use crate::error::{Result, ValidationError};
use crate::journal::{dose_suggestions, filter_by_consumer, SubstanceRouteSuggestion};
use crate::stats::{compute_stats, StatsModel, StatsPeriod};
use crate::storage::IngestionStore;
use crate::substance::search::{search, SearchFilter};
use crate::substance::{Substance, SubstanceLookup};
use crate::timeline::{EffectTimelines, HeightMode};

/// How many recently used names feed the "you used" search filter.
const RECENT_SUBSTANCE_LIMIT: usize = 100;

/// Longest look-back accepted for dose suggestions (a century).
pub const MAX_SUGGESTION_DAYS: i64 = 36_500;

/// Effect timelines of one experience for one consumer.
pub fn experience_timelines<S, L>(
    store: &S,
    lookup: &L,
    experience_id: i64,
    consumer: Option<&str>,
    height_mode: HeightMode,
) -> Result<EffectTimelines>
where
    S: IngestionStore + ?Sized,
    L: SubstanceLookup + ?Sized,
{
    let ingestions = store.ingestions_for_experience(experience_id)?;
    let mine = filter_by_consumer(&ingestions, consumer);
    let timelines = EffectTimelines::build(&mine, lookup, height_mode);
    tracing::debug!(
        experience_id,
        timelines = timelines.timelines.len(),
        skipped = timelines.skipped.len(),
        "built effect timelines"
    );
    Ok(timelines)
}

/// Statistics for `period`, ending at `now`.
pub fn period_stats<S>(store: &S, period: StatsPeriod, now: DateTime<Utc>) -> Result<StatsModel>
where
    S: IngestionStore + ?Sized,
{
    let since = match period {
        StatsPeriod::Years => None,
        _ => Some(period.start(now, &[])),
    };
    let ingestions = store.ingestions_since(since)?;
    Ok(compute_stats(&ingestions, period, now))
}

/// Substance search; consults the store only for the "you used" filter.
pub fn search_substances<'a, S, L>(
    store: &S,
    lookup: &'a L,
    filter: &SearchFilter,
    query: &str,
) -> Result<Vec<&'a Substance>>
where
    S: IngestionStore + ?Sized,
    L: SubstanceLookup + ?Sized,
{
    let recently_used = if filter.only_used {
        store.last_used_substance_names(RECENT_SUBSTANCE_LIMIT)?
    } else {
        Vec::new()
    };
    Ok(search(lookup, filter, query, &recently_used))
}

/// Quick-add suggestions from the last `days` days of ingestions.
pub fn recent_suggestions<S>(
    store: &S,
    now: DateTime<Utc>,
    days: i64,
    max_doses: usize,
) -> Result<Vec<SubstanceRouteSuggestion>>
where
    S: IngestionStore + ?Sized,
{
    let invalid = || ValidationError::InvalidValue {
        field: "days".into(),
        message: format!("expected 1..={MAX_SUGGESTION_DAYS}, got {days}"),
    };
    if !(1..=MAX_SUGGESTION_DAYS).contains(&days) {
        return Err(invalid().into());
    }
    let since = TimeDelta::try_days(days)
        .and_then(|span| now.checked_sub_signed(span))
        .ok_or_else(invalid)?;
    let ingestions = store.ingestions_since(Some(since))?;
    Ok(dose_suggestions(&ingestions, max_doses))
}
