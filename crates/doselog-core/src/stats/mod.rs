//! Usage statistics over a selectable period.
//!
//! Per substance: how often it was taken, by which routes, and the cumulative
//! dose when that can be summed. Chart buckets count ingestions, and
//! separately experiences (a substance counts once per experience).

mod buckets;

pub use buckets::{ChartBucket, SubstanceCount};

use chrono::{DateTime, Datelike, Days, Months, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::journal::Ingestion;
use crate::substance::AdministrationRoute;
use buckets::BucketLayout;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatsPeriod {
    #[default]
    Days30,
    Days365,
    Years,
}

impl StatsPeriod {
    pub fn display_text(&self) -> &'static str {
        match self {
            Self::Days30 => "30 Days",
            Self::Days365 => "365 Days",
            Self::Years => "Years",
        }
    }

    /// Start of the period, aligned with the first chart bucket.
    ///
    /// `Days30` starts at midnight (UTC) 29 days before today, `Days365` on the
    /// first of the month eleven months back. `Years` starts at the earliest
    /// ingestion.
    pub fn start(&self, now: DateTime<Utc>, ingestions: &[Ingestion]) -> DateTime<Utc> {
        let today = now.date_naive();
        let first_day = match self {
            Self::Days30 => today.checked_sub_days(Days::new(29)),
            Self::Days365 => today
                .with_day(1)
                .and_then(|first| first.checked_sub_months(Months::new(11))),
            Self::Years => return ingestions.iter().map(|i| i.time).min().unwrap_or(now),
        };
        first_day.unwrap_or(today).and_time(NaiveTime::MIN).and_utc()
    }
}

impl fmt::Display for StatsPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_text())
    }
}

impl FromStr for StatsPeriod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "days30" | "30" | "30d" | "month" => Ok(Self::Days30),
            "days365" | "365" | "365d" | "year" => Ok(Self::Days365),
            "years" | "all" => Ok(Self::Years),
            other => Err(ValidationError::InvalidValue {
                field: "period".into(),
                message: format!("unknown period '{other}' (use days30, days365 or years)"),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteCount {
    pub route: AdministrationRoute,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TotalDose {
    pub dose: f64,
    pub units: String,
    pub is_estimate: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubstanceStats {
    pub substance_name: String,
    pub ingestion_count: u64,
    pub route_counts: Vec<RouteCount>,
    /// `None` when any dose is unknown or units differ.
    pub total_dose: Option<TotalDose>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsModel {
    pub period: StatsPeriod,
    pub start: DateTime<Utc>,
    pub ingestion_stats: Vec<SubstanceStats>,
    pub ingestion_chart_buckets: Vec<ChartBucket>,
    pub experience_chart_buckets: Vec<ChartBucket>,
}

impl StatsModel {
    pub fn is_empty(&self) -> bool {
        self.ingestion_stats.is_empty()
    }
}

fn total_dose(ingestions: &[&Ingestion]) -> Option<TotalDose> {
    let units = &ingestions.first()?.units;
    let mut dose = 0.0;
    let mut is_estimate = false;
    for ingestion in ingestions {
        if !ingestion.units.eq_ignore_ascii_case(units) {
            return None;
        }
        dose += ingestion.dose?;
        is_estimate |= ingestion.is_dose_an_estimate;
    }
    Some(TotalDose {
        dose,
        units: units.clone(),
        is_estimate,
    })
}

fn substance_stats(substance_name: &str, ingestions: &[&Ingestion]) -> SubstanceStats {
    let mut route_counts: Vec<RouteCount> = Vec::new();
    for ingestion in ingestions {
        match route_counts.iter_mut().find(|r| r.route == ingestion.route) {
            Some(route_count) => route_count.count += 1,
            None => route_counts.push(RouteCount {
                route: ingestion.route,
                count: 1,
            }),
        }
    }
    route_counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.route.cmp(&b.route)));
    SubstanceStats {
        substance_name: substance_name.to_string(),
        ingestion_count: ingestions.len() as u64,
        route_counts,
        total_dose: total_dose(ingestions),
    }
}

/// Compute statistics for ingestions that fall into one of the period's chart buckets.
pub fn compute_stats(ingestions: &[Ingestion], period: StatsPeriod, now: DateTime<Utc>) -> StatsModel {
    let start = period.start(now, ingestions);
    let layout = BucketLayout::new(period, now, start);
    let mut in_period: Vec<&Ingestion> = ingestions
        .iter()
        .filter(|i| i.time >= start && layout.index_of(i.time).is_some())
        .collect();
    in_period.sort_by_key(|i| i.time);

    // substance name (lowercase) -> (display name, ingestions)
    let mut by_substance: Vec<(String, Vec<&Ingestion>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for ingestion in in_period.iter().copied() {
        let key = ingestion.substance_name.to_lowercase();
        match index.get(&key) {
            Some(&i) => by_substance[i].1.push(ingestion),
            None => {
                index.insert(key, by_substance.len());
                by_substance.push((ingestion.substance_name.clone(), vec![ingestion]));
            }
        }
    }

    let mut ingestion_stats: Vec<SubstanceStats> = by_substance
        .iter()
        .map(|(name, list)| substance_stats(name, list))
        .collect();
    ingestion_stats.sort_by(|a, b| {
        b.ingestion_count
            .cmp(&a.ingestion_count)
            .then_with(|| a.substance_name.cmp(&b.substance_name))
    });

    let ingestion_chart_buckets = layout.fill(
        in_period
            .iter()
            .map(|i| (i.time, i.substance_name.as_str())),
    );

    // First ingestion of each substance per experience.
    let mut firsts: Vec<(i64, String, DateTime<Utc>, &str)> = Vec::new();
    for ingestion in in_period.iter().copied() {
        let key = ingestion.substance_name.to_lowercase();
        if !firsts
            .iter()
            .any(|(experience, name, _, _)| *experience == ingestion.experience_id && *name == key)
        {
            firsts.push((ingestion.experience_id, key, ingestion.time, ingestion.substance_name.as_str()));
        }
    }
    let experience_chart_buckets =
        layout.fill(firsts.iter().map(|(_, _, time, name)| (*time, *name)));

    StatsModel {
        period,
        start,
        ingestion_stats,
        ingestion_chart_buckets,
        experience_chart_buckets,
    }
}
