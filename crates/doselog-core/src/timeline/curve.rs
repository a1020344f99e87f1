//! Composite effect curve for ingestions sharing one set of phase durations.
//!
//! Each ingestion contributes three straight segments (comeup, peak, offset).
//! The curve is evaluated at every segment endpoint and at every ingestion
//! moment; overlapping contributions are summed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::duration::FullDurationRange;
use crate::substance::RoaDuration;

/// Weight used to interpolate onset and comeup; only peak and offset vary
/// with dose.
const ONSET_AND_COMEUP_WEIGHT: f64 = 0.5;

/// One ingestion's contribution before compositing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedLine {
    pub start_time: DateTime<Utc>,
    /// Position within the peak/offset ranges, 0.0..=1.0.
    pub horizontal_weight: f64,
    /// Relative intensity, typically dose / max dose.
    pub height: f64,
}

/// A point in (seconds since graph start, height) space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Straight segment between two points. The span is half-open: `[start.x, end.x)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSegment {
    pub start: Point,
    pub end: Point,
}

impl LineSegment {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    pub fn is_inside(&self, x: f64) -> bool {
        self.start.x <= x && x < self.end.x
    }

    pub fn height_at(&self, x: f64) -> f64 {
        let divider = self.end.x - self.start.x;
        if divider == 0.0 {
            return 0.0;
        }
        let m = (self.end.y - self.start.y) / divider;
        let b = self.start.y - m * self.start.x;
        m * x + b
    }
}

/// A rendered vertex of the composite curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FinalPoint {
    /// Seconds since graph start.
    pub x: f64,
    pub y: f64,
    /// Set when the vertex is an ingestion moment (drawn as a dot).
    pub is_ingestion_point: bool,
}

/// The four phase durations a full timeline needs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseDurations {
    pub onset: FullDurationRange,
    pub comeup: FullDurationRange,
    pub peak: FullDurationRange,
    pub offset: FullDurationRange,
}

impl PhaseDurations {
    /// `None` unless onset, comeup, peak and offset are all complete ranges.
    pub fn from_roa_duration(duration: &RoaDuration) -> Option<Self> {
        Some(Self {
            onset: duration.onset.as_ref()?.to_full()?,
            comeup: duration.comeup.as_ref()?.to_full()?,
            peak: duration.peak.as_ref()?.to_full()?,
            offset: duration.offset.as_ref()?.to_full()?,
        })
    }

    /// The comeup, peak and offset segments for one line starting at `start_x`.
    fn segments_for(&self, start_x: f64, horizontal_weight: f64, height: f64) -> [LineSegment; 3] {
        let comeup_start_x =
            start_x + self.onset.interpolate_at_value_in_seconds(ONSET_AND_COMEUP_WEIGHT);
        let peak_start_x = comeup_start_x
            + self
                .comeup
                .interpolate_at_value_in_seconds(ONSET_AND_COMEUP_WEIGHT);
        let peak_end_x =
            peak_start_x + self.peak.interpolate_at_value_in_seconds(horizontal_weight);
        let offset_end_x =
            peak_end_x + self.offset.interpolate_at_value_in_seconds(horizontal_weight);

        let comeup_start = Point { x: comeup_start_x, y: 0.0 };
        let peak_start = Point { x: peak_start_x, y: height };
        let peak_end = Point { x: peak_end_x, y: height };
        let offset_end = Point { x: offset_end_x, y: 0.0 };

        [
            LineSegment::new(comeup_start, peak_start),
            LineSegment::new(peak_start, peak_end),
            LineSegment::new(peak_end, offset_end),
        ]
    }
}

/// How a curve's heights are scaled into 0.0..=1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Normalization {
    /// Divide by the curve's own maximum.
    Own,
    /// Divide by a maximum shared with other curves.
    Group(f64),
}

/// Composite curve built from weighted lines. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullTimeline {
    phases: PhaseDurations,
    points: Vec<FinalPoint>,
    non_normalised_height: f64,
    end_of_line: f64,
}

impl FullTimeline {
    pub fn build(
        phases: PhaseDurations,
        weighted_lines: &[WeightedLine],
        graph_start: DateTime<Utc>,
    ) -> Self {
        let starts: Vec<f64> = weighted_lines
            .iter()
            .map(|line| seconds_between(graph_start, line.start_time))
            .collect();

        let segments: Vec<LineSegment> = weighted_lines
            .iter()
            .zip(&starts)
            .flat_map(|(line, &start_x)| {
                phases.segments_for(start_x, line.horizontal_weight, line.height)
            })
            .collect();

        let mut candidates: Vec<(f64, bool)> = starts.iter().map(|&x| (x, true)).collect();
        for segment in &segments {
            for x in [segment.start.x, segment.end.x] {
                if !candidates.iter().any(|&(seen, _)| seen == x) {
                    candidates.push((x, false));
                }
            }
        }
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0));
        // The same ingestion moment can appear once per line; keep one vertex.
        candidates.dedup_by(|a, b| a.0 == b.0 && a.1 == b.1);

        let points: Vec<FinalPoint> = candidates
            .into_iter()
            .map(|(x, is_ingestion_point)| FinalPoint {
                x,
                y: segments
                    .iter()
                    .filter(|segment| segment.is_inside(x))
                    .map(|segment| segment.height_at(x))
                    .sum(),
                is_ingestion_point,
            })
            .collect();

        let non_normalised_height = points.iter().map(|p| p.y).fold(0.0, f64::max);
        let end_of_line = points.iter().map(|p| p.x).fold(0.0, f64::max);

        tracing::debug!(
            lines = weighted_lines.len(),
            points = points.len(),
            height = non_normalised_height,
            "built full timeline"
        );

        Self {
            phases,
            points,
            non_normalised_height,
            end_of_line,
        }
    }

    pub fn phases(&self) -> &PhaseDurations {
        &self.phases
    }

    /// Vertices in ascending time order, heights not normalised.
    pub fn points(&self) -> &[FinalPoint] {
        &self.points
    }

    /// Highest summed height before normalisation.
    pub fn non_normalised_height(&self) -> f64 {
        self.non_normalised_height
    }

    /// Offset in seconds of the last vertex.
    pub fn end_of_line_relative_to_start_in_seconds(&self) -> f64 {
        self.end_of_line
    }

    /// Vertices scaled by the chosen maximum. A zero (or non-finite) maximum
    /// is treated as 1.0.
    pub fn normalised_points(&self, normalization: Normalization) -> Vec<FinalPoint> {
        let max = match normalization {
            Normalization::Own => self.non_normalised_height,
            Normalization::Group(max) => max,
        };
        let divisor = if max == 0.0 || !max.is_finite() { 1.0 } else { max };
        self.points
            .iter()
            .map(|p| FinalPoint {
                y: p.y / divisor,
                ..*p
            })
            .collect()
    }
}

/// Signed seconds from `from` to `to`, with millisecond precision.
pub(crate) fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 1_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn graph_start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 20, 0, 0).unwrap()
    }

    fn fixed(secs: f64) -> FullDurationRange {
        FullDurationRange::seconds(secs, secs)
    }

    fn ten_ten_five_ten() -> PhaseDurations {
        PhaseDurations {
            onset: fixed(10.0),
            comeup: fixed(10.0),
            peak: fixed(5.0),
            offset: fixed(10.0),
        }
    }

    fn line_at(offset_secs: i64, height: f64) -> WeightedLine {
        WeightedLine {
            start_time: graph_start() + Duration::seconds(offset_secs),
            horizontal_weight: 0.5,
            height,
        }
    }

    fn height_at(points: &[FinalPoint], x: f64) -> f64 {
        points
            .iter()
            .find(|p| p.x == x)
            .map(|p| p.y)
            .unwrap_or_else(|| panic!("no vertex at {x}"))
    }

    #[test]
    fn single_line_rises_holds_and_falls() {
        let timeline = FullTimeline::build(ten_ten_five_ten(), &[line_at(0, 1.0)], graph_start());
        let points = timeline.points();

        let xs: Vec<f64> = points.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![0.0, 10.0, 20.0, 25.0, 35.0]);
        assert_eq!(height_at(points, 0.0), 0.0);
        assert_eq!(height_at(points, 10.0), 0.0);
        assert_eq!(height_at(points, 20.0), 1.0);
        assert_eq!(height_at(points, 25.0), 1.0);
        assert_eq!(height_at(points, 35.0), 0.0);
        assert_eq!(timeline.non_normalised_height(), 1.0);
        assert_eq!(timeline.end_of_line_relative_to_start_in_seconds(), 35.0);
    }

    #[test]
    fn horizontal_weight_only_stretches_peak_and_offset() {
        let phases = PhaseDurations {
            onset: FullDurationRange::seconds(0.0, 20.0),
            comeup: FullDurationRange::seconds(0.0, 20.0),
            peak: FullDurationRange::seconds(0.0, 100.0),
            offset: FullDurationRange::seconds(0.0, 100.0),
        };
        let line = WeightedLine {
            start_time: graph_start(),
            horizontal_weight: 1.0,
            height: 1.0,
        };
        let timeline = FullTimeline::build(phases, &[line], graph_start());
        let xs: Vec<f64> = timeline.points().iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![0.0, 10.0, 20.0, 120.0, 220.0]);
    }

    #[test]
    fn overlapping_lines_sum_their_heights() {
        let lines = [line_at(0, 1.0), line_at(3, 1.0)];
        let timeline = FullTimeline::build(ten_ten_five_ten(), &lines, graph_start());
        let points = timeline.points();

        // Both lines are in their peak between 23s and 25s.
        assert_eq!(height_at(points, 23.0), 2.0);
        // At 20s the first is at peak and the second is 7/10 through its comeup.
        assert!((height_at(points, 20.0) - 1.7).abs() < 1e-9);
        assert_eq!(timeline.non_normalised_height(), 2.0);
    }

    #[test]
    fn every_ingestion_start_is_marked() {
        let lines = [line_at(0, 1.0), line_at(60, 0.5), line_at(60, 0.5)];
        let timeline = FullTimeline::build(ten_ten_five_ten(), &lines, graph_start());
        let marked: Vec<f64> = timeline
            .points()
            .iter()
            .filter(|p| p.is_ingestion_point)
            .map(|p| p.x)
            .collect();
        assert_eq!(marked, vec![0.0, 60.0]);
    }

    #[test]
    fn zero_width_segment_has_zero_height() {
        let point = Point { x: 5.0, y: 1.0 };
        let segment = LineSegment::new(point, point);
        assert_eq!(segment.height_at(5.0), 0.0);
        assert!(!segment.is_inside(5.0));
    }

    #[test]
    fn zero_duration_phases_do_not_produce_nan() {
        let phases = PhaseDurations {
            onset: fixed(0.0),
            comeup: fixed(0.0),
            peak: fixed(0.0),
            offset: fixed(0.0),
        };
        let timeline = FullTimeline::build(phases, &[line_at(0, 1.0)], graph_start());
        assert!(timeline.points().iter().all(|p| p.y.is_finite()));
        assert_eq!(timeline.points().len(), 1);
        assert!(timeline.points()[0].is_ingestion_point);
    }

    #[test]
    fn segment_interpolates_linearly() {
        let segment = LineSegment::new(Point { x: 10.0, y: 0.0 }, Point { x: 20.0, y: 2.0 });
        assert!(segment.is_inside(10.0));
        assert!(!segment.is_inside(20.0));
        assert_eq!(segment.height_at(15.0), 1.0);
    }

    #[test]
    fn normalises_by_own_or_group_maximum() {
        let timeline = FullTimeline::build(ten_ten_five_ten(), &[line_at(0, 0.5)], graph_start());

        let own = timeline.normalised_points(Normalization::Own);
        assert_eq!(own.iter().map(|p| p.y).fold(0.0, f64::max), 1.0);

        let group = timeline.normalised_points(Normalization::Group(2.0));
        assert_eq!(group.iter().map(|p| p.y).fold(0.0, f64::max), 0.25);
    }

    #[test]
    fn zero_group_maximum_keeps_full_scale() {
        let timeline = FullTimeline::build(ten_ten_five_ten(), &[line_at(0, 1.0)], graph_start());
        let points = timeline.normalised_points(Normalization::Group(0.0));
        assert!(points.iter().all(|p| p.y.is_finite()));
        assert_eq!(points.iter().map(|p| p.y).fold(0.0, f64::max), 1.0);
    }

    #[test]
    fn no_lines_builds_an_empty_curve() {
        let timeline = FullTimeline::build(ten_ten_five_ten(), &[], graph_start());
        assert!(timeline.points().is_empty());
        assert_eq!(timeline.non_normalised_height(), 0.0);
    }

    #[test]
    fn ingestion_before_graph_start_has_negative_offset() {
        let timeline = FullTimeline::build(ten_ten_five_ten(), &[line_at(-30, 1.0)], graph_start());
        assert_eq!(timeline.points()[0].x, -30.0);
    }

    proptest! {
        #[test]
        fn points_are_sorted_and_finite(
            offsets in proptest::collection::vec(0i64..7_200, 1..6),
            heights in proptest::collection::vec(0.0f64..2.0, 6),
            weight in 0.0f64..=1.0,
        ) {
            let lines: Vec<WeightedLine> = offsets
                .iter()
                .zip(&heights)
                .map(|(&o, &h)| WeightedLine {
                    start_time: graph_start() + Duration::seconds(o),
                    horizontal_weight: weight,
                    height: h,
                })
                .collect();
            let phases = PhaseDurations {
                onset: FullDurationRange::seconds(60.0, 120.0),
                comeup: FullDurationRange::seconds(300.0, 600.0),
                peak: FullDurationRange::seconds(600.0, 1_800.0),
                offset: FullDurationRange::seconds(900.0, 3_600.0),
            };
            let timeline = FullTimeline::build(phases, &lines, graph_start());
            let points = timeline.points();

            prop_assert!(points.windows(2).all(|w| w[0].x <= w[1].x));
            prop_assert!(points.iter().all(|p| p.y.is_finite() && p.y >= -1e-9));
            for &o in &offsets {
                prop_assert!(points.iter().any(|p| p.x == o as f64 && p.is_ingestion_point));
            }
        }

        #[test]
        fn composite_height_is_sum_of_single_curves(
            first in 0i64..600,
            second in 0i64..600,
            h1 in 0.1f64..1.0,
            h2 in 0.1f64..1.0,
        ) {
            let a = line_at(first, h1);
            let b = line_at(second, h2);
            let both = FullTimeline::build(ten_ten_five_ten(), &[a.clone(), b.clone()], graph_start());
            let only_a = FullTimeline::build(ten_ten_five_ten(), &[a], graph_start());
            let only_b = FullTimeline::build(ten_ten_five_ten(), &[b], graph_start());

            let eval = |t: &FullTimeline, x: f64| -> f64 {
                let p = t.points();
                // piecewise-linear evaluation between neighbouring vertices
                match p.iter().position(|q| q.x >= x) {
                    Some(0) | None => p.iter().find(|q| q.x == x).map(|q| q.y).unwrap_or(0.0),
                    Some(i) if p[i].x == x => p[i].y,
                    Some(i) => {
                        let (l, r) = (p[i - 1], p[i]);
                        l.y + (r.y - l.y) * (x - l.x) / (r.x - l.x)
                    }
                }
            };
            for p in both.points() {
                let expected = eval(&only_a, p.x) + eval(&only_b, p.x);
                prop_assert!((p.y - expected).abs() < 1e-6, "x={} got {} expected {}", p.x, p.y, expected);
            }
        }
    }
}
