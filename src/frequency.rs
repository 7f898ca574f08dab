//! Event frequency windows
//!
//! Buckets a user's events into windows of hidden-time-compensated elapsed
//! time and counts the requested actions in each window.

use crate::config::{FrequencyOptions, PausePolicy};
use crate::error::ComputeError;
use crate::event_stats::tally;
use crate::pause_stats::{pause_counts, PauseCounts};
use crate::types::{Event, StatisticsRecord, ToRecord};
use crate::visibility::{ElapsedTimeline, MissingHiddenRepair};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Counts for one `[min, max)` window of elapsed seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowFrequency {
    /// Window label, `"{min}_{max}"`
    pub label: String,
    pub min: f64,
    pub max: f64,
    /// Occurrences of each requested action name
    pub counts: BTreeMap<String, u32>,
    /// Pause counts within the window, when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pauses: Option<PauseCounts>,
}

impl ToRecord for WindowFrequency {
    fn write_into(&self, record: &mut StatisticsRecord) {
        for (name, count) in &self.counts {
            record.insert(name.clone(), (*count).into());
        }
        if let Some(pauses) = &self.pauses {
            pauses.write_into(record);
        }
    }
}

/// Compute per-window event counts for one user.
///
/// Every event lands in at most one window. Events whose elapsed time falls
/// outside every window are not counted. Windows without events are omitted.
pub fn event_frequencies(
    events: &[Event],
    options: &FrequencyOptions,
    pause_policy: &PausePolicy,
) -> Result<Vec<WindowFrequency>, ComputeError> {
    options.validate()?;

    let timeline = ElapsedTimeline::new(events, MissingHiddenRepair::Apply);
    let mut assigned: HashSet<u64> = HashSet::with_capacity(events.len());
    let mut spurious_pending = options.spurious_first_action.as_deref();
    let mut windows = Vec::new();

    for bounds in options.boundaries.windows(2) {
        let (min, max) = (bounds[0], bounds[1]);

        let mut subset: Vec<&Event> = Vec::new();
        for (event, elapsed) in events.iter().zip(timeline.iter()) {
            if elapsed >= min && elapsed < max && assigned.insert(event.id) {
                subset.push(event);
            }
        }

        if subset.is_empty() {
            if timeline.iter().all(|elapsed| elapsed < max) {
                debug!(window_max = max, "stream exhausted, skipping remaining windows");
                break;
            }
            continue;
        }

        let mut counts = tally(subset.iter().copied(), &options.interaction_events);
        if let Some(spurious) = spurious_pending.take() {
            if let Some(count) = counts.get_mut(spurious) {
                *count = count.saturating_sub(1);
            }
        }

        let pauses = if options.include_pauses {
            Some(pause_counts(subset.iter().copied(), pause_policy)?)
        } else {
            None
        };

        windows.push(WindowFrequency {
            label: format!("{}_{}", min, max),
            min,
            max,
            counts,
            pauses,
        });
    }

    Ok(windows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StreamBuilder;
    use crate::types::{BROWSER_VISIBILITY_CHANGE, PLAY_PAUSE_BUTTON_CLICKED};
    use pretty_assertions::assert_eq;

    const NEXT: &str = "NEXT_BUTTON_CLICKED";
    const BACK: &str = "BACK_BUTTON_CLICKED";

    fn options(boundaries: Vec<f64>) -> FrequencyOptions {
        FrequencyOptions::new(boundaries, [PLAY_PAUSE_BUTTON_CLICKED, NEXT, BACK])
    }

    fn count(window: &WindowFrequency, name: &str) -> u32 {
        window.counts[name]
    }

    #[test]
    fn test_events_bucketed_by_elapsed_time() {
        let events = StreamBuilder::new()
            .action(0.0, PLAY_PAUSE_BUTTON_CLICKED)
            .action(10.0, NEXT)
            .action(70.0, NEXT)
            .action(130.0, BACK)
            .build();

        let windows = event_frequencies(
            &events,
            &options(vec![0.0, 60.0, 120.0, 180.0]),
            &PausePolicy::default(),
        )
        .unwrap();

        let labels: Vec<&str> = windows.iter().map(|w| w.label.as_str()).collect();
        assert_eq!(labels, vec!["0_60", "60_120", "120_180"]);
        assert_eq!(count(&windows[0], PLAY_PAUSE_BUTTON_CLICKED), 0);
        assert_eq!(count(&windows[0], NEXT), 1);
        assert_eq!(count(&windows[1], NEXT), 1);
        assert_eq!(count(&windows[2], BACK), 1);
        assert_eq!(windows[0].pauses, None);
    }

    #[test]
    fn test_hidden_time_is_compensated() {
        let events = StreamBuilder::new()
            .action(0.0, PLAY_PAUSE_BUTTON_CLICKED)
            .action(50.0, NEXT)
            .hidden(55.0)
            .visible(155.0)
            .action(160.0, NEXT)
            .build();

        let windows = event_frequencies(
            &events,
            &options(vec![0.0, 60.0, 120.0, 180.0]),
            &PausePolicy::default(),
        )
        .unwrap();

        // 160s wall clock is 60s of elapsed time.
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[1].label, "60_120");
        assert_eq!(count(&windows[1], NEXT), 1);
    }

    #[test]
    fn test_no_event_counted_twice() {
        // The visible transition at 100s has no logged hidden and is repaired.
        let events = StreamBuilder::new()
            .action(0.0, PLAY_PAUSE_BUTTON_CLICKED)
            .action(20.0, NEXT)
            .action(55.0, PLAY_PAUSE_BUTTON_CLICKED)
            .visible(100.0)
            .action(110.0, BACK)
            .action(150.0, NEXT)
            .action(170.0, NEXT)
            .build();

        let mut options = options(vec![0.0, 30.0, 60.0, 90.0, 120.0, 150.0]);
        options
            .interaction_events
            .insert(BROWSER_VISIBILITY_CHANGE.to_string());
        let windows = event_frequencies(&events, &options, &PausePolicy::default()).unwrap();

        let mut totals: BTreeMap<String, u32> = BTreeMap::new();
        for window in &windows {
            for (name, count) in &window.counts {
                *totals.entry(name.clone()).or_insert(0) += count;
            }
        }

        let expected: BTreeMap<String, u32> = [
            (PLAY_PAUSE_BUTTON_CLICKED, 1),
            (NEXT, 3),
            (BACK, 1),
            (BROWSER_VISIBILITY_CHANGE, 1),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        assert_eq!(totals, expected);
    }

    #[test]
    fn test_empty_windows_omitted() {
        let events = StreamBuilder::new()
            .action(0.0, NEXT)
            .action(200.0, BACK)
            .build();

        let windows = event_frequencies(
            &events,
            &options(vec![0.0, 60.0, 120.0, 180.0, 240.0, 300.0]),
            &PausePolicy::default(),
        )
        .unwrap();

        let labels: Vec<&str> = windows.iter().map(|w| w.label.as_str()).collect();
        assert_eq!(labels, vec!["0_60", "180_240"]);
    }

    #[test]
    fn test_spurious_toggle_dropped_in_first_nonempty_window_only() {
        let events = StreamBuilder::new()
            .action(0.0, NEXT)
            .action(40.0, PLAY_PAUSE_BUTTON_CLICKED)
            .action(70.0, PLAY_PAUSE_BUTTON_CLICKED)
            .build();

        let windows = event_frequencies(
            &events,
            &options(vec![30.0, 60.0, 120.0]),
            &PausePolicy::default(),
        )
        .unwrap();

        assert_eq!(count(&windows[0], PLAY_PAUSE_BUTTON_CLICKED), 0);
        assert_eq!(count(&windows[1], PLAY_PAUSE_BUTTON_CLICKED), 1);
    }

    #[test]
    fn test_spurious_toggle_can_be_disabled() {
        let events = StreamBuilder::new()
            .action(0.0, PLAY_PAUSE_BUTTON_CLICKED)
            .build();

        let windows = event_frequencies(
            &events,
            &options(vec![0.0, 60.0]).with_spurious_first_action(None),
            &PausePolicy::default(),
        )
        .unwrap();
        assert_eq!(count(&windows[0], PLAY_PAUSE_BUTTON_CLICKED), 1);
    }

    #[test]
    fn test_window_pauses() {
        let events = StreamBuilder::new()
            .action(0.0, PLAY_PAUSE_BUTTON_CLICKED)
            .action(3.0, NEXT)
            .action(40.0, NEXT)
            .action(70.0, BACK)
            .build();

        let windows = event_frequencies(
            &events,
            &options(vec![0.0, 60.0, 120.0]).with_pauses(),
            &PausePolicy::default(),
        )
        .unwrap();

        let first = windows[0].pauses.unwrap();
        assert_eq!(first.short, 1);
        assert_eq!(first.very_long, 1);
        // A single event has nothing to pause against.
        assert_eq!(windows[1].pauses.unwrap().total(), 0);

        let record = windows[0].to_record();
        assert_eq!(record["VLP"].as_count(), Some(1));
        assert_eq!(record[NEXT].as_count(), Some(2));
    }

    #[test]
    fn test_invalid_boundaries() {
        let events = StreamBuilder::new().action(0.0, NEXT).build();
        let result = event_frequencies(&events, &options(vec![60.0]), &PausePolicy::default());
        assert!(matches!(result, Err(ComputeError::InvalidArgument(_))));
    }

    #[test]
    fn test_windows_are_half_open() {
        let events = StreamBuilder::new()
            .action(0.0, PLAY_PAUSE_BUTTON_CLICKED)
            .action(59.999, NEXT)
            .action(60.0, BACK)
            .build();

        let windows = event_frequencies(
            &events,
            &options(vec![0.0, 60.0, 120.0]),
            &PausePolicy::default(),
        )
        .unwrap();

        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].label, "0_60");
        assert_eq!(count(&windows[0], NEXT), 1);
        assert_eq!(count(&windows[0], BACK), 0);
        assert_eq!(windows[1].label, "60_120");
        assert_eq!(count(&windows[1], NEXT), 0);
        assert_eq!(count(&windows[1], BACK), 1);
    }

    #[test]
    fn test_hidden_time_moves_event_onto_boundary() {
        // 70s hidden: 129.999s and 130s wall clock become 59.999s and 60s.
        let events = StreamBuilder::new()
            .action(0.0, PLAY_PAUSE_BUTTON_CLICKED)
            .hidden(30.0)
            .visible(100.0)
            .action(129.999, NEXT)
            .action(130.0, BACK)
            .build();

        let windows = event_frequencies(
            &events,
            &options(vec![0.0, 60.0, 120.0]),
            &PausePolicy::default(),
        )
        .unwrap();

        assert_eq!(windows.len(), 2);
        assert_eq!(count(&windows[0], NEXT), 1);
        assert_eq!(count(&windows[0], BACK), 0);
        assert_eq!(windows[1].label, "60_120");
        assert_eq!(count(&windows[1], BACK), 1);
    }

    #[test]
    fn test_empty_stream() {
        let windows =
            event_frequencies(&[], &options(vec![0.0, 60.0]), &PausePolicy::default()).unwrap();
        assert!(windows.is_empty());
    }
}
