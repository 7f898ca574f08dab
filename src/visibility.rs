//! Visibility compensation
//!
//! Pairs browser `hidden` transitions with the `visible` transition that ends
//! them, repairs `visible` transitions that were logged without a preceding
//! `hidden`, and turns the resulting intervals into an elapsed-time timeline
//! that excludes time the experience was not on screen.

use crate::types::{seconds_between, Event};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How a hidden interval was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalKind {
    /// A logged `hidden` transition matched with the next `visible` transition
    Paired,
    /// A `visible` transition with no logged `hidden`; the previous event stands in
    Repaired,
}

/// Whether to synthesize intervals for `visible` transitions missing their `hidden`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingHiddenRepair {
    Skip,
    Apply,
}

/// A span of time during which the experience was not visible
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisibilityInterval {
    /// Stream index of the event that opened the interval
    pub start_index: usize,
    /// Stream index of the `visible` transition that closed it
    pub end_index: usize,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_sec: f64,
    pub kind: IntervalKind,
}

/// Index of the first `visible` transition at or after `from`
pub fn next_visible_index(events: &[Event], from: usize) -> Option<usize> {
    events
        .iter()
        .enumerate()
        .skip(from)
        .find(|(_, e)| e.is_visible_transition())
        .map(|(idx, _)| idx)
}

/// Seconds from the `hidden` transition at `index` to the next `visible` transition.
///
/// Returns 0 when the stream ends before the page becomes visible again.
pub fn hidden_duration(events: &[Event], index: usize) -> f64 {
    let Some(hidden) = events.get(index) else {
        return 0.0;
    };

    match next_visible_index(events, index) {
        Some(visible_idx) => seconds_between(hidden.timestamp, events[visible_idx].timestamp),
        None => 0.0,
    }
}

/// Seconds from the event before `index` to the `visible` transition at `index`.
///
/// Used when a `visible` transition was logged without its `hidden`
/// counterpart. Returns 0 for the first event of the stream.
pub fn missing_hidden_duration(events: &[Event], index: usize) -> f64 {
    if index == 0 || index >= events.len() {
        return 0.0;
    }
    seconds_between(events[index - 1].timestamp, events[index].timestamp)
}

/// Resolve every hidden interval of a stream in one pass.
///
/// A `hidden` transition that falls inside an interval that is already open
/// is a duplicate signal and does not start a new interval, so each span of
/// hidden time is counted once. Unresolvable `hidden` transitions (no later
/// `visible`) produce no interval.
pub fn resolve_intervals(events: &[Event], repair: MissingHiddenRepair) -> Vec<VisibilityInterval> {
    let mut intervals = Vec::new();
    let mut open_until: Option<usize> = None;

    for (index, event) in events.iter().enumerate() {
        if event.is_hidden_transition() {
            if matches!(open_until, Some(end) if index < end) {
                continue;
            }

            match next_visible_index(events, index) {
                Some(visible_idx) => {
                    intervals.push(VisibilityInterval {
                        start_index: index,
                        end_index: visible_idx,
                        start: event.timestamp,
                        end: events[visible_idx].timestamp,
                        duration_sec: hidden_duration(events, index),
                        kind: IntervalKind::Paired,
                    });
                    open_until = Some(visible_idx);
                }
                None => {
                    debug!(event_id = event.id, "hidden transition never resolved");
                }
            }
        } else if event.is_visible_transition() {
            if open_until == Some(index) {
                continue;
            }

            if repair == MissingHiddenRepair::Apply && index > 0 {
                intervals.push(VisibilityInterval {
                    start_index: index - 1,
                    end_index: index,
                    start: events[index - 1].timestamp,
                    end: event.timestamp,
                    duration_sec: missing_hidden_duration(events, index),
                    kind: IntervalKind::Repaired,
                });
            }
        }
    }

    intervals
}

/// Total seconds spent hidden, counting only logged hidden/visible pairs
pub fn hidden_time(events: &[Event]) -> f64 {
    resolve_intervals(events, MissingHiddenRepair::Skip)
        .iter()
        .map(|i| i.duration_sec)
        .sum()
}

/// Hidden-time-compensated elapsed seconds for every event of a stream
#[derive(Debug, Clone, PartialEq)]
pub struct ElapsedTimeline {
    elapsed: Vec<f64>,
}

impl ElapsedTimeline {
    /// Build the timeline, resolving intervals with the given repair policy
    pub fn new(events: &[Event], repair: MissingHiddenRepair) -> Self {
        let intervals = resolve_intervals(events, repair);
        Self::from_intervals(events, &intervals)
    }

    /// Build the timeline from already resolved intervals.
    ///
    /// An event's elapsed time is its offset from the first event minus the
    /// hidden time accrued up to it. Events logged while hidden are pinned to
    /// the instant the interval opened.
    pub fn from_intervals(events: &[Event], intervals: &[VisibilityInterval]) -> Self {
        let Some(first) = events.first() else {
            return Self {
                elapsed: Vec::new(),
            };
        };

        let elapsed = events
            .iter()
            .map(|event| {
                let raw = seconds_between(first.timestamp, event.timestamp);
                let hidden: f64 = intervals
                    .iter()
                    .take_while(|i| i.start <= event.timestamp)
                    .map(|i| seconds_between(i.start, i.end.min(event.timestamp)))
                    .sum();
                (raw - hidden).max(0.0)
            })
            .collect();

        Self { elapsed }
    }

    /// Elapsed seconds of the event at `index`
    pub fn at(&self, index: usize) -> f64 {
        self.elapsed.get(index).copied().unwrap_or(0.0)
    }

    /// Elapsed seconds of the last event
    pub fn total(&self) -> f64 {
        self.elapsed.last().copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.elapsed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elapsed.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.elapsed.iter().copied()
    }
}
