//! Time buckets for usage charts.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::StatsPeriod;

/// How many ingestions (or experiences) of one substance fall in a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstanceCount {
    pub substance_name: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartBucket {
    pub label: String,
    /// Sorted by count descending, then name.
    pub counts: Vec<SubstanceCount>,
}

impl ChartBucket {
    pub fn total(&self) -> u64 {
        self.counts.iter().map(|c| c.count).sum()
    }

    fn add(&mut self, substance_name: &str) {
        match self
            .counts
            .iter_mut()
            .find(|c| c.substance_name.eq_ignore_ascii_case(substance_name))
        {
            Some(count) => count.count += 1,
            None => self.counts.push(SubstanceCount {
                substance_name: substance_name.to_string(),
                count: 1,
            }),
        }
    }
}

fn month_index(date: NaiveDate) -> i64 {
    date.year() as i64 * 12 + date.month0() as i64
}

/// Bucket layout for one period, anchored at `now`.
pub(crate) struct BucketLayout {
    period: StatsPeriod,
    first_day: NaiveDate,
    first_month: i64,
    first_year: i32,
    len: usize,
}

impl BucketLayout {
    pub(crate) fn new(period: StatsPeriod, now: DateTime<Utc>, start: DateTime<Utc>) -> Self {
        let today = now.date_naive();
        match period {
            StatsPeriod::Days30 => Self {
                period,
                first_day: today - Duration::days(29),
                first_month: 0,
                first_year: 0,
                len: 30,
            },
            StatsPeriod::Days365 => Self {
                period,
                first_day: today,
                first_month: month_index(today) - 11,
                first_year: 0,
                len: 12,
            },
            StatsPeriod::Years => {
                let first_year = start.year().min(today.year());
                Self {
                    period,
                    first_day: today,
                    first_month: 0,
                    first_year,
                    len: (today.year() - first_year + 1) as usize,
                }
            }
        }
    }

    pub(crate) fn index_of(&self, time: DateTime<Utc>) -> Option<usize> {
        let date = time.date_naive();
        let index = match self.period {
            StatsPeriod::Days30 => (date - self.first_day).num_days(),
            StatsPeriod::Days365 => month_index(date) - self.first_month,
            StatsPeriod::Years => (date.year() - self.first_year) as i64,
        };
        usize::try_from(index).ok().filter(|&i| i < self.len)
    }

    fn label(&self, index: usize) -> String {
        match self.period {
            StatsPeriod::Days30 => (self.first_day + Duration::days(index as i64))
                .format("%m-%d")
                .to_string(),
            StatsPeriod::Days365 => {
                let month = self.first_month + index as i64;
                format!("{}-{:02}", month.div_euclid(12), month.rem_euclid(12) + 1)
            }
            StatsPeriod::Years => (self.first_year + index as i32).to_string(),
        }
    }

    /// Fill buckets from `(time, substance name)` events.
    pub(crate) fn fill<'a>(
        &self,
        events: impl IntoIterator<Item = (DateTime<Utc>, &'a str)>,
    ) -> Vec<ChartBucket> {
        let mut buckets: Vec<ChartBucket> = (0..self.len)
            .map(|i| ChartBucket {
                label: self.label(i),
                counts: Vec::new(),
            })
            .collect();
        for (time, substance_name) in events {
            if let Some(index) = self.index_of(time) {
                buckets[index].add(substance_name);
            }
        }
        for bucket in &mut buckets {
            bucket
                .counts
                .sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.substance_name.cmp(&b.substance_name)));
        }
        buckets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn daily_buckets_end_today() {
        let layout = BucketLayout::new(StatsPeriod::Days30, now(), now() - Duration::days(30));
        assert_eq!(layout.index_of(now()), Some(29));
        assert_eq!(layout.index_of(now() - Duration::days(29)), Some(0));
        assert_eq!(layout.index_of(now() - Duration::days(30)), None);
        assert_eq!(layout.label(29), "03-15");
    }

    #[test]
    fn monthly_buckets_wrap_years() {
        let layout = BucketLayout::new(StatsPeriod::Days365, now(), now() - Duration::days(365));
        assert_eq!(layout.label(0), "2023-04");
        assert_eq!(layout.label(11), "2024-03");
        let january = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        assert_eq!(layout.index_of(january), Some(9));
    }

    #[test]
    fn yearly_buckets_start_at_first_year() {
        let start = Utc.with_ymd_and_hms(2021, 7, 1, 0, 0, 0).unwrap();
        let layout = BucketLayout::new(StatsPeriod::Years, now(), start);
        let buckets = layout.fill([(start, "LSD"), (now(), "Caffeine"), (now(), "caffeine")]);
        let labels: Vec<&str> = buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["2021", "2022", "2023", "2024"]);
        assert_eq!(buckets[0].total(), 1);
        assert_eq!(buckets[3].counts[0].count, 2);
    }
}
