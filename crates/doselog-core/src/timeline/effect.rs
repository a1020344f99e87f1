//! Effect timelines for an experience.
//!
//! Ingestions are grouped by substance and route. Each group whose route has
//! full phase durations becomes one composite [`FullTimeline`]; groups with
//! only onset, comeup and total get one [`OnsetComeupTotalTimeline`] per
//! ingestion. Everything else is reported as skipped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::curve::{seconds_between, FinalPoint, FullTimeline, Normalization, PhaseDurations, WeightedLine};
use super::partial::OnsetComeupTotalTimeline;
use crate::journal::Ingestion;
use crate::substance::{AdministrationRoute, SubstanceLookup, DEFAULT_HORIZONTAL_WEIGHT};

/// Whether curve heights of different substances share one scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeightMode {
    /// Every substance is scaled to its own maximum.
    Independent,
    /// All substances are scaled to the highest curve.
    #[default]
    Shared,
}

impl HeightMode {
    pub fn from_independent_flag(independent: bool) -> Self {
        if independent {
            Self::Independent
        } else {
            Self::Shared
        }
    }
}

/// Drawable shape of one substance/route group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimelineShape {
    Full(FullTimeline),
    OnsetComeupTotal { timelines: Vec<OnsetComeupTotalTimeline> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubstanceTimeline {
    pub substance_name: String,
    pub route: AdministrationRoute,
    pub ingestion_ids: Vec<i64>,
    pub shape: TimelineShape,
}

impl SubstanceTimeline {
    pub fn end_of_line_relative_to_start_in_seconds(&self) -> f64 {
        match &self.shape {
            TimelineShape::Full(full) => full.end_of_line_relative_to_start_in_seconds(),
            TimelineShape::OnsetComeupTotal { timelines } => timelines
                .iter()
                .map(|t| t.end_of_line_relative_to_start_in_seconds())
                .fold(0.0, f64::max),
        }
    }
}

/// Why a group produced no timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    UnknownSubstance,
    UnknownRoute,
    IncompleteDuration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedGroup {
    pub substance_name: String,
    pub route: AdministrationRoute,
    pub ingestion_ids: Vec<i64>,
    pub reason: SkipReason,
}

/// One polyline ready for a renderer, heights in 0.0..=1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedLine {
    pub substance_name: String,
    pub route: AdministrationRoute,
    pub points: Vec<FinalPoint>,
    /// The last segment is an estimate (onset/comeup/total timelines).
    pub uncertain_tail: bool,
}

/// All effect timelines of one set of ingestions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectTimelines {
    /// Graph origin; `None` when there were no ingestions.
    pub start: Option<DateTime<Utc>>,
    pub height_mode: HeightMode,
    /// Highest non-normalised height over all full timelines.
    pub overall_max_height: f64,
    pub timelines: Vec<SubstanceTimeline>,
    pub skipped: Vec<SkippedGroup>,
}

/// Height of one ingestion relative to the largest dose of the same
/// substance (in the same units) among `all`.
///
/// Unknown doses and a zero maximum count as full height.
pub fn relative_height(ingestion: &Ingestion, all: &[Ingestion]) -> f64 {
    let Some(dose) = ingestion.dose else {
        return 1.0;
    };
    let max = all
        .iter()
        .filter(|other| {
            other.substance_name.eq_ignore_ascii_case(&ingestion.substance_name)
                && other.units.eq_ignore_ascii_case(&ingestion.units)
        })
        .filter_map(|other| other.dose)
        .fold(0.0, f64::max);
    if max <= 0.0 {
        1.0
    } else {
        dose / max
    }
}

struct Group<'a> {
    substance_name: &'a str,
    route: AdministrationRoute,
    ingestions: Vec<&'a Ingestion>,
}

fn group_ingestions(sorted: &[Ingestion]) -> Vec<Group<'_>> {
    let mut groups: Vec<Group<'_>> = Vec::new();
    for ingestion in sorted {
        match groups.iter_mut().find(|g| {
            g.route == ingestion.route && g.substance_name.eq_ignore_ascii_case(&ingestion.substance_name)
        }) {
            Some(group) => group.ingestions.push(ingestion),
            None => groups.push(Group {
                substance_name: &ingestion.substance_name,
                route: ingestion.route,
                ingestions: vec![ingestion],
            }),
        }
    }
    groups
}

impl EffectTimelines {
    /// Build timelines for `ingestions`, looking durations and doses up in
    /// `lookup`. The graph starts at the earliest ingestion.
    pub fn build<L: SubstanceLookup + ?Sized>(
        ingestions: &[Ingestion],
        lookup: &L,
        height_mode: HeightMode,
    ) -> Self {
        Self::build_with_start(ingestions, lookup, height_mode, None)
    }

    /// Like [`EffectTimelines::build`] with an explicit graph origin.
    /// Ingestions before `graph_start` get negative offsets.
    pub fn build_with_start<L: SubstanceLookup + ?Sized>(
        ingestions: &[Ingestion],
        lookup: &L,
        height_mode: HeightMode,
        graph_start: Option<DateTime<Utc>>,
    ) -> Self {
        let mut sorted = ingestions.to_vec();
        sorted.sort_by_key(|i| i.time);
        let start = match graph_start {
            Some(start) if !sorted.is_empty() => Some(start),
            _ => sorted.first().map(|i| i.time),
        };

        let mut timelines = Vec::new();
        let mut skipped = Vec::new();

        if let Some(graph_start) = start {
            for group in group_ingestions(&sorted) {
                let ids: Vec<i64> = group.ingestions.iter().map(|i| i.id).collect();
                let skip = |reason| SkippedGroup {
                    substance_name: group.substance_name.to_string(),
                    route: group.route,
                    ingestion_ids: ids.clone(),
                    reason,
                };

                let Some(substance) = lookup.get_substance(group.substance_name) else {
                    tracing::debug!(substance = group.substance_name, "no reference data, skipping timeline");
                    skipped.push(skip(SkipReason::UnknownSubstance));
                    continue;
                };
                let Some(roa) = substance.get_roa(group.route) else {
                    tracing::debug!(substance = group.substance_name, route = %group.route, "route not in reference data");
                    skipped.push(skip(SkipReason::UnknownRoute));
                    continue;
                };
                let Some(duration) = roa.duration.as_ref() else {
                    tracing::debug!(substance = group.substance_name, route = %group.route, "no duration data, skipping timeline");
                    skipped.push(skip(SkipReason::IncompleteDuration));
                    continue;
                };

                let weight_of = |ingestion: &Ingestion| {
                    roa.dose
                        .as_ref()
                        .map(|dose| dose.horizontal_weight(ingestion.dose, &ingestion.units))
                        .unwrap_or(DEFAULT_HORIZONTAL_WEIGHT)
                };

                let shape = if let Some(phases) = PhaseDurations::from_roa_duration(duration) {
                    let lines: Vec<WeightedLine> = group
                        .ingestions
                        .iter()
                        .map(|ingestion| WeightedLine {
                            start_time: ingestion.time,
                            horizontal_weight: weight_of(ingestion),
                            height: relative_height(ingestion, &sorted),
                        })
                        .collect();
                    TimelineShape::Full(FullTimeline::build(phases, &lines, graph_start))
                } else {
                    let partial: Option<Vec<OnsetComeupTotalTimeline>> = group
                        .ingestions
                        .iter()
                        .map(|ingestion| {
                            OnsetComeupTotalTimeline::from_roa_duration(
                                duration,
                                weight_of(ingestion),
                                seconds_between(graph_start, ingestion.time),
                            )
                        })
                        .collect();
                    match partial {
                        Some(timelines) => TimelineShape::OnsetComeupTotal { timelines },
                        None => {
                            tracing::debug!(substance = group.substance_name, route = %group.route, "incomplete durations, skipping timeline");
                            skipped.push(skip(SkipReason::IncompleteDuration));
                            continue;
                        }
                    }
                };

                timelines.push(SubstanceTimeline {
                    substance_name: substance.name.clone(),
                    route: group.route,
                    ingestion_ids: ids.clone(),
                    shape,
                });
            }
        }

        let overall_max_height = timelines
            .iter()
            .filter_map(|t| match &t.shape {
                TimelineShape::Full(full) => Some(full.non_normalised_height()),
                TimelineShape::OnsetComeupTotal { .. } => None,
            })
            .fold(0.0, f64::max);

        Self {
            start,
            height_mode,
            overall_max_height,
            timelines,
            skipped,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.timelines.is_empty()
    }

    /// Latest end offset of any timeline, in seconds since `start`.
    pub fn end_of_all_relative_to_start_in_seconds(&self) -> f64 {
        self.timelines
            .iter()
            .map(|t| t.end_of_line_relative_to_start_in_seconds())
            .fold(0.0, f64::max)
    }

    fn normalization(&self) -> Normalization {
        match self.height_mode {
            HeightMode::Independent => Normalization::Own,
            HeightMode::Shared => Normalization::Group(self.overall_max_height),
        }
    }

    /// Normalised polylines for every timeline.
    pub fn render(&self) -> Vec<RenderedLine> {
        let normalization = self.normalization();
        let mut lines = Vec::new();
        for timeline in &self.timelines {
            match &timeline.shape {
                TimelineShape::Full(full) => lines.push(RenderedLine {
                    substance_name: timeline.substance_name.clone(),
                    route: timeline.route,
                    points: full.normalised_points(normalization),
                    uncertain_tail: false,
                }),
                TimelineShape::OnsetComeupTotal { timelines } => {
                    for partial in timelines {
                        lines.push(RenderedLine {
                            substance_name: timeline.substance_name.clone(),
                            route: timeline.route,
                            points: partial.points().to_vec(),
                            uncertain_tail: true,
                        });
                    }
                }
            }
        }
        lines
    }

    /// Plain-text chart with one row per rendered line.
    pub fn render_ascii_chart(&self, width: usize) -> String {
        const LEVELS: [char; 9] = [' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
        let width = width.max(10);
        let end = self.end_of_all_relative_to_start_in_seconds();
        let mut output = String::new();
        if end <= 0.0 {
            output.push_str("(no timelines)\n");
            return output;
        }
        let lines = self.render();
        let label_width = lines
            .iter()
            .map(|l| l.substance_name.chars().count() + l.route.display_text().len() + 1)
            .max()
            .unwrap_or(0);

        for line in &lines {
            let label = format!("{} {}", line.substance_name, line.route);
            let mut row = String::with_capacity(width);
            for column in 0..width {
                let x = end * column as f64 / (width - 1) as f64;
                let y = height_at_time(&line.points, x).clamp(0.0, 1.0);
                let level = (y * (LEVELS.len() - 1) as f64).round() as usize;
                row.push(LEVELS[level]);
            }
            output.push_str(&format!("{label:<label_width$} |{row}|\n"));
        }
        output.push_str(&format!(
            "{:<label_width$}  0h{:>w$}\n",
            "",
            format!("{:.1}h", end / 3_600.0),
            w = width - 2
        ));
        output
    }
}

/// Height of a polyline at `x`, linearly interpolated; 0 outside it.
pub fn height_at_time(points: &[FinalPoint], x: f64) -> f64 {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return 0.0;
    };
    if x < first.x || x > last.x {
        return 0.0;
    }
    for pair in points.windows(2) {
        let (left, right) = (pair[0], pair[1]);
        if left.x <= x && x <= right.x {
            if right.x == left.x {
                return left.y.max(right.y);
            }
            return left.y + (right.y - left.y) * (x - left.x) / (right.x - left.x);
        }
    }
    first.y
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::substance::SubstanceCatalog;
    use chrono::{Duration, TimeZone};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap()
    }

    fn ingestion(id: i64, name: &str, route: AdministrationRoute, minutes: i64, dose: Option<f64>, units: &str) -> Ingestion {
        Ingestion {
            id,
            experience_id: 1,
            substance_name: name.into(),
            time: base() + Duration::minutes(minutes),
            route,
            dose,
            is_dose_an_estimate: false,
            estimated_dose_standard_deviation: None,
            units: units.into(),
            notes: None,
            consumer_name: None,
        }
    }

    #[test]
    fn relative_height_uses_max_of_same_substance() {
        let all = vec![
            ingestion(1, "MDMA", AdministrationRoute::Oral, 0, Some(100.0), "mg"),
            ingestion(2, "MDMA", AdministrationRoute::Oral, 90, Some(50.0), "mg"),
            ingestion(3, "Caffeine", AdministrationRoute::Oral, 0, Some(200.0), "mg"),
            ingestion(4, "MDMA", AdministrationRoute::Oral, 120, None, "mg"),
        ];
        assert_eq!(relative_height(&all[0], &all), 1.0);
        assert_eq!(relative_height(&all[1], &all), 0.5);
        assert_eq!(relative_height(&all[2], &all), 1.0);
        assert_eq!(relative_height(&all[3], &all), 1.0);
    }

    #[test]
    fn relative_height_with_zero_max_is_full_scale() {
        let all = vec![ingestion(1, "MDMA", AdministrationRoute::Oral, 0, Some(0.0), "mg")];
        assert_eq!(relative_height(&all[0], &all), 1.0);
    }

    #[test]
    fn groups_by_substance_and_route() {
        let catalog = SubstanceCatalog::bundled();
        let ingestions = vec![
            ingestion(1, "Cannabis", AdministrationRoute::Smoked, 0, Some(5.0), "mg"),
            ingestion(2, "caffeine", AdministrationRoute::Oral, 10, Some(100.0), "mg"),
            ingestion(3, "Cannabis", AdministrationRoute::Smoked, 60, Some(5.0), "mg"),
            ingestion(4, "Cannabis", AdministrationRoute::Oral, 120, Some(10.0), "mg"),
        ];
        let result = EffectTimelines::build(&ingestions, &catalog, HeightMode::Shared);

        assert_eq!(result.start, Some(base()));
        assert_eq!(result.timelines.len(), 3);
        assert_eq!(result.timelines[0].ingestion_ids, vec![1, 3]);
        assert_eq!(result.timelines[1].substance_name, "Caffeine");
        assert!(matches!(
            result.timelines[2].shape,
            TimelineShape::OnsetComeupTotal { .. }
        ));
        assert!(result.skipped.is_empty());
    }

    #[test]
    fn unknown_substances_and_routes_are_skipped() {
        let catalog = SubstanceCatalog::bundled();
        let ingestions = vec![
            ingestion(1, "Unobtainium", AdministrationRoute::Oral, 0, None, "mg"),
            ingestion(2, "Caffeine", AdministrationRoute::Intravenous, 0, None, "mg"),
        ];
        let result = EffectTimelines::build(&ingestions, &catalog, HeightMode::Shared);
        assert!(result.is_empty());
        let reasons: Vec<SkipReason> = result.skipped.iter().map(|s| s.reason).collect();
        assert_eq!(reasons, vec![SkipReason::UnknownSubstance, SkipReason::UnknownRoute]);
    }

    #[derive(Clone, Default)]
    struct SharedBuf(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for SharedBuf {
        fn write(&mut self, bytes: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(bytes);
            Ok(bytes.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn route_without_durations_is_skipped_and_logged() {
        let catalog = SubstanceCatalog::from_json(
            r#"{"substances": [{"name": "Placeholder", "roas": [{"route": "oral"}]}]}"#,
        )
        .unwrap();
        let ingestions = vec![ingestion(1, "Placeholder", AdministrationRoute::Oral, 0, Some(1.0), "mg")];

        let buf = SharedBuf::default();
        let writer = buf.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let result = tracing::subscriber::with_default(subscriber, || {
            EffectTimelines::build(&ingestions, &catalog, HeightMode::Shared)
        });

        assert!(result.is_empty());
        assert_eq!(result.skipped[0].reason, SkipReason::IncompleteDuration);
        let logged = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert!(logged.contains("no duration data"), "{logged}");
        assert!(logged.contains("Placeholder"), "{logged}");
    }

    #[test]
    fn shared_mode_scales_to_highest_curve() {
        let catalog = SubstanceCatalog::bundled();
        let ingestions = vec![
            ingestion(1, "Caffeine", AdministrationRoute::Oral, 0, Some(100.0), "mg"),
            ingestion(2, "Caffeine", AdministrationRoute::Oral, 15, Some(100.0), "mg"),
            ingestion(3, "LSD", AdministrationRoute::Sublingual, 0, Some(100.0), "µg"),
        ];
        let shared = EffectTimelines::build(&ingestions, &catalog, HeightMode::Shared);
        let caffeine_max = shared.render()[0].points.iter().map(|p| p.y).fold(0.0, f64::max);
        let lsd_max = shared.render()[1].points.iter().map(|p| p.y).fold(0.0, f64::max);
        assert!((caffeine_max - 1.0).abs() < 1e-9);
        assert!(lsd_max < caffeine_max);

        let independent = EffectTimelines::build(&ingestions, &catalog, HeightMode::Independent);
        let lsd_max = independent.render()[1].points.iter().map(|p| p.y).fold(0.0, f64::max);
        assert!((lsd_max - 1.0).abs() < 1e-9);
    }

    #[test]
    fn empty_input_has_no_start() {
        let catalog = SubstanceCatalog::bundled();
        let result = EffectTimelines::build(&[], &catalog, HeightMode::Shared);
        assert!(result.start.is_none());
        assert_eq!(result.end_of_all_relative_to_start_in_seconds(), 0.0);
        assert_eq!(result.render_ascii_chart(40), "(no timelines)\n");
    }

    #[test]
    fn explicit_start_shifts_offsets() {
        let catalog = SubstanceCatalog::bundled();
        let ingestions = vec![ingestion(1, "Caffeine", AdministrationRoute::Oral, 0, Some(100.0), "mg")];
        let origin = base() - Duration::minutes(30);
        let result =
            EffectTimelines::build_with_start(&ingestions, &catalog, HeightMode::Shared, Some(origin));
        assert_eq!(result.start, Some(origin));
        let first = result.render()[0].points[0];
        assert_eq!(first.x, 1_800.0);
        assert!(first.is_ingestion_point);
    }

    #[test]
    fn ascii_chart_has_a_row_per_line() {
        let catalog = SubstanceCatalog::bundled();
        let ingestions = vec![
            ingestion(1, "Caffeine", AdministrationRoute::Oral, 0, Some(100.0), "mg"),
            ingestion(2, "MDMA", AdministrationRoute::Oral, 30, Some(100.0), "mg"),
        ];
        let chart = EffectTimelines::build(&ingestions, &catalog, HeightMode::Independent)
            .render_ascii_chart(40);
        assert_eq!(chart.lines().count(), 3);
        assert!(chart.contains('█'));
    }

    #[test]
    fn polyline_height_interpolates() {
        let points = [
            FinalPoint { x: 0.0, y: 0.0, is_ingestion_point: true },
            FinalPoint { x: 10.0, y: 1.0, is_ingestion_point: false },
        ];
        assert_eq!(height_at_time(&points, 5.0), 0.5);
        assert_eq!(height_at_time(&points, 11.0), 0.0);
        assert_eq!(height_at_time(&[], 1.0), 0.0);
    }
}
