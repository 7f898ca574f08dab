//! Statistical slices
//!
//! Splits each stream at narrative element changes and computes time, pause
//! and event statistics for every slice, so behaviour can be compared
//! element by element.

use crate::config::ExtractorConfig;
use crate::error::ComputeError;
use crate::event_stats::{event_counts, EventCountOptions, EventCounts};
use crate::pause_stats::{pause_counts, PauseCounts};
use crate::time_stats::{time_statistics, TimeStatistics};
use crate::types::{Event, StatisticsRecord, ToRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// `end_nec` of a slice the user never left through a segment change
pub const ABANDON: &str = "abandon";

/// Statistics for the events between two narrative element changes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticalSlice {
    pub user: String,
    /// Element the slice starts in, unknown for a leading slice
    pub start_nec: Option<String>,
    /// Element the slice ends by entering, or [`ABANDON`]
    pub end_nec: String,
    pub abandon: bool,
    /// Timestamp of the slice's last event
    pub timestamp: DateTime<Utc>,
    pub time: TimeStatistics,
    pub pauses: PauseCounts,
    pub events: EventCounts,
}

impl ToRecord for StatisticalSlice {
    fn write_into(&self, record: &mut StatisticsRecord) {
        self.time.write_into(record);
        self.pauses.write_into(record);
        self.events.write_into(record);
        record.insert("abandon".to_string(), self.abandon.into());
    }
}

/// Index ranges of the slices of a stream.
///
/// Neighbouring slices share the segment change between them. A stream
/// without segment changes has no slices.
pub fn slice_ranges(events: &[Event]) -> Vec<RangeInclusive<usize>> {
    let changes: Vec<usize> = events
        .iter()
        .enumerate()
        .filter(|(_, e)| e.is_segment_change())
        .map(|(idx, _)| idx)
        .collect();

    let (Some(&first), Some(&last)) = (changes.first(), changes.last()) else {
        return Vec::new();
    };

    let mut ranges = Vec::with_capacity(changes.len() + 1);
    if first > 0 {
        ranges.push(0..=first);
    }
    ranges.extend(changes.windows(2).map(|pair| pair[0]..=pair[1]));
    // A stream ending on a segment change gets no single-event trailing slice.
    if last + 1 < events.len() {
        ranges.push(last..=events.len() - 1);
    }
    ranges
}

/// Slices of one user's stream, in stream order
pub fn user_slices(
    user: &str,
    events: &[Event],
    config: &ExtractorConfig,
    options: &EventCountOptions,
) -> Result<Vec<StatisticalSlice>, ComputeError> {
    let options = options.clone().with_link_choices();

    slice_ranges(events)
        .into_iter()
        .map(|range| {
            let slice = &events[range];
            // Ranges are never empty.
            let (first, last) = (&slice[0], &slice[slice.len() - 1]);

            let abandon = !last.is_segment_change();
            let completion_point = if abandon {
                None
            } else {
                last.narrative_element()
            };

            Ok(StatisticalSlice {
                user: user.to_string(),
                start_nec: first.narrative_element().map(str::to_string),
                end_nec: match completion_point {
                    Some(point) => point.to_string(),
                    None if abandon => ABANDON.to_string(),
                    None => String::new(),
                },
                abandon,
                timestamp: last.timestamp,
                time: time_statistics(
                    slice,
                    completion_point,
                    &config.narrative_element_durations,
                ),
                pauses: pause_counts(slice, &config.pause_policy)?,
                events: event_counts(slice, &options),
            })
        })
        .collect()
}
