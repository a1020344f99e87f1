//! Effect timelines.
//!
//! This module provides:
//! - Duration ranges and their interpolation
//! - The composite curve builder for ingestions with full phase durations
//! - A fallback timeline for routes with only onset, comeup and total
//! - Assembly of all timelines of an experience with shared or independent scaling

mod curve;
mod duration;
mod effect;
mod partial;

pub use curve::{FinalPoint, FullTimeline, LineSegment, Normalization, PhaseDurations, Point, WeightedLine};
pub use duration::{DurationRange, DurationUnit, FullDurationRange};
pub use effect::{
    height_at_time, relative_height, EffectTimelines, HeightMode, RenderedLine, SkipReason,
    SkippedGroup, SubstanceTimeline, TimelineShape,
};
pub use partial::OnsetComeupTotalTimeline;
