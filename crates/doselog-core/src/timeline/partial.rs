//! Timeline for routes with known onset, comeup and total duration but no
//! peak/offset data.

use serde::{Deserialize, Serialize};

use super::curve::FinalPoint;
use super::duration::FullDurationRange;
use crate::substance::RoaDuration;

const ONSET_AND_COMEUP_WEIGHT: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OnsetComeupTotalTimeline {
    pub onset: FullDurationRange,
    pub comeup: FullDurationRange,
    pub total: FullDurationRange,
    pub total_weight: f64,
    pub ingestion_time_relative_to_start_in_seconds: f64,
}

impl OnsetComeupTotalTimeline {
    /// `None` unless onset, comeup and total are complete ranges.
    pub fn from_roa_duration(
        duration: &RoaDuration,
        total_weight: f64,
        ingestion_time_relative_to_start_in_seconds: f64,
    ) -> Option<Self> {
        Some(Self {
            onset: duration.onset.as_ref()?.to_full()?,
            comeup: duration.comeup.as_ref()?.to_full()?,
            total: duration.total.as_ref()?.to_full()?,
            total_weight,
            ingestion_time_relative_to_start_in_seconds,
        })
    }

    /// Vertices at full scale: ingestion, onset end, comeup end, total end.
    ///
    /// Only the first three are certain; the drop from comeup end to total
    /// end is a guess and should be drawn as such.
    pub fn points(&self) -> [FinalPoint; 4] {
        let start_x = self.ingestion_time_relative_to_start_in_seconds;
        let onset_end_x =
            start_x + self.onset.interpolate_at_value_in_seconds(ONSET_AND_COMEUP_WEIGHT);
        let comeup_end_x =
            onset_end_x + self.comeup.interpolate_at_value_in_seconds(ONSET_AND_COMEUP_WEIGHT);
        let total_end_x = start_x + self.total.interpolate_at_value_in_seconds(self.total_weight);
        [
            FinalPoint { x: start_x, y: 0.0, is_ingestion_point: true },
            FinalPoint { x: onset_end_x, y: 0.0, is_ingestion_point: false },
            FinalPoint { x: comeup_end_x, y: 1.0, is_ingestion_point: false },
            FinalPoint { x: total_end_x.max(comeup_end_x), y: 0.0, is_ingestion_point: false },
        ]
    }

    pub fn end_of_line_relative_to_start_in_seconds(&self) -> f64 {
        self.ingestion_time_relative_to_start_in_seconds + self.total.max_in_seconds()
    }
}
