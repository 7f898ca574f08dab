//! Time statistics
//!
//! Session length, hidden time, time to completion and narrative element
//! duration statistics for a single user's stream.

use crate::dataset::first_arrival;
use crate::types::{seconds_between, Event, StatisticsRecord, ToRecord};
use crate::visibility::{resolve_intervals, ElapsedTimeline, MissingHiddenRepair};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Time statistics for one user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeStatistics {
    /// Seconds between the first and last event
    pub raw_session_length: f64,
    /// Seconds the experience spent hidden
    pub hidden_time: f64,
    /// Raw session length minus hidden time
    pub session_length: f64,
    /// Whether the completion point was reached (set when one is configured)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reach_end: Option<bool>,
    /// Compensated seconds until the completion point was first reached, 0 if never
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_to_completion: Option<f64>,
    /// Cumulative compensated seconds spent in each narrative element
    pub segment_durations: BTreeMap<String, f64>,
    pub avg_nec_time: f64,
    pub std_nec_time: f64,
    pub median_nec_time: f64,
    /// Mean of time spent relative to each element's reference duration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub norm_avg_nec_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub norm_std_nec_time: Option<f64>,
}

impl ToRecord for TimeStatistics {
    fn write_into(&self, record: &mut StatisticsRecord) {
        record.insert("hidden_time".to_string(), self.hidden_time.into());
        record.insert(
            "raw_session_length".to_string(),
            self.raw_session_length.into(),
        );
        record.insert("session_length".to_string(), self.session_length.into());
        if let Some(reach_end) = self.reach_end {
            record.insert("reach_end".to_string(), reach_end.into());
        }
        if let Some(time_to_completion) = self.time_to_completion {
            record.insert(
                "time_to_completion".to_string(),
                time_to_completion.into(),
            );
        }
        record.insert("avg_nec_time".to_string(), self.avg_nec_time.into());
        record.insert("std_nec_time".to_string(), self.std_nec_time.into());
        record.insert("median_nec_time".to_string(), self.median_nec_time.into());
        if let Some(norm_avg) = self.norm_avg_nec_time {
            record.insert("norm_avg_nec_time".to_string(), norm_avg.into());
        }
        if let Some(norm_std) = self.norm_std_nec_time {
            record.insert("norm_std_nec_time".to_string(), norm_std.into());
        }
    }
}

/// Compute time statistics for one user's stream.
///
/// `reference_durations` maps narrative elements to their expected duration;
/// normalized statistics are only produced when it is non-empty.
pub fn time_statistics(
    events: &[Event],
    completion_point: Option<&str>,
    reference_durations: &BTreeMap<String, f64>,
) -> TimeStatistics {
    let reach_end = completion_point.map(|point| first_arrival(events, point).is_some());

    let (Some(first), Some(last)) = (events.first(), events.last()) else {
        return TimeStatistics {
            reach_end,
            time_to_completion: completion_point.map(|_| 0.0),
            norm_avg_nec_time: (!reference_durations.is_empty()).then_some(0.0),
            norm_std_nec_time: (!reference_durations.is_empty()).then_some(0.0),
            ..Default::default()
        };
    };

    let intervals = resolve_intervals(events, MissingHiddenRepair::Skip);
    let timeline = ElapsedTimeline::from_intervals(events, &intervals);

    let raw_session_length = seconds_between(first.timestamp, last.timestamp);
    let hidden_time: f64 = intervals.iter().map(|i| i.duration_sec).sum();

    let time_to_completion = completion_point.map(|point| {
        first_arrival(events, point)
            .map(|idx| timeline.at(idx))
            .unwrap_or(0.0)
    });

    let segment_durations = segment_durations(events, &timeline);
    let durations: Vec<f64> = segment_durations.values().copied().collect();

    let (norm_avg_nec_time, norm_std_nec_time) = if reference_durations.is_empty() {
        (None, None)
    } else {
        let ratios: Vec<f64> = segment_durations
            .iter()
            .filter_map(|(segment, spent)| {
                reference_durations
                    .get(segment)
                    .map(|reference| safe_divide(*spent, *reference))
            })
            .collect();
        (Some(mean(&ratios)), Some(std_dev(&ratios)))
    };

    TimeStatistics {
        raw_session_length,
        hidden_time,
        session_length: raw_session_length - hidden_time,
        reach_end,
        time_to_completion,
        avg_nec_time: mean(&durations),
        std_nec_time: std_dev(&durations),
        median_nec_time: median(&durations),
        segment_durations,
        norm_avg_nec_time,
        norm_std_nec_time,
    }
}

/// Cumulative compensated time spent in each narrative element.
///
/// Each pair of consecutive segment changes contributes the elapsed time
/// between them to the element entered by the first of the pair.
pub fn segment_durations(events: &[Event], timeline: &ElapsedTimeline) -> BTreeMap<String, f64> {
    let changes: Vec<usize> = events
        .iter()
        .enumerate()
        .filter(|(_, e)| e.is_segment_change())
        .map(|(idx, _)| idx)
        .collect();

    let mut durations: BTreeMap<String, f64> = BTreeMap::new();
    for pair in changes.windows(2) {
        let (entered, left) = (pair[0], pair[1]);
        let Some(segment) = events[entered].narrative_element() else {
            debug!(event_id = events[entered].id, "segment change without element id");
            continue;
        };
        let spent = timeline.at(left) - timeline.at(entered);
        *durations.entry(segment.to_string()).or_insert(0.0) += spent;
    }
    durations
}

/// Division that yields 0 for a zero denominator
fn safe_divide(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation
fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = mean(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
