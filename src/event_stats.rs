//! Event count statistics
//!
//! Counts occurrences of each requested interaction event per user.

use crate::error::ComputeError;
use crate::types::{
    Event, StatisticsRecord, ToRecord, LINK_CHOICE_CLICKED, PLAY_PAUSE_BUTTON_CLICKED,
    USER_SET_VARIABLE,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Options for event counting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCountOptions {
    pub interaction_events: BTreeSet<String>,
    /// Count link choices towards `total_events`
    #[serde(default)]
    pub include_link_choices: bool,
    /// Count variable sets towards `total_events`
    #[serde(default)]
    pub include_user_set_variables: bool,
}

impl EventCountOptions {
    pub fn new<I, S>(interaction_events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            interaction_events: interaction_events.into_iter().map(Into::into).collect(),
            include_link_choices: false,
            include_user_set_variables: false,
        }
    }

    pub fn with_link_choices(mut self) -> Self {
        self.include_link_choices = true;
        self
    }

    pub fn with_user_set_variables(mut self) -> Self {
        self.include_user_set_variables = true;
        self
    }

    pub fn validate(&self) -> Result<(), ComputeError> {
        validate_interaction_events(&self.interaction_events)
    }
}

/// Reject an empty interaction event set
pub fn validate_interaction_events(events: &BTreeSet<String>) -> Result<(), ComputeError> {
    if events.is_empty() {
        return Err(ComputeError::InvalidArgument(
            "Interaction events cannot be empty".to_string(),
        ));
    }
    if events.iter().any(|e| e.is_empty()) {
        return Err(ComputeError::InvalidArgument(
            "Interaction event names cannot be empty strings".to_string(),
        ));
    }
    Ok(())
}

/// Per-user event counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCounts {
    /// Occurrences of each requested action name
    pub counts: BTreeMap<String, u32>,
    pub total_events: u32,
}

impl ToRecord for EventCounts {
    fn write_into(&self, record: &mut StatisticsRecord) {
        for (name, count) in &self.counts {
            record.insert(name.clone(), (*count).into());
        }
        record.insert("total_events".to_string(), self.total_events.into());
    }
}

/// Count each requested action name in `events`
pub(crate) fn tally<'a, I>(events: I, names: &BTreeSet<String>) -> BTreeMap<String, u32>
where
    I: IntoIterator<Item = &'a Event>,
{
    let mut counts: BTreeMap<String, u32> = names.iter().map(|n| (n.clone(), 0)).collect();
    for event in events {
        if let Some(count) = counts.get_mut(&event.action_name) {
            *count += 1;
        }
    }
    counts
}

/// Count events for one user.
///
/// The experience emits one play/pause toggle on load, so a nonzero
/// play/pause count is reduced by one.
pub fn event_counts(events: &[Event], options: &EventCountOptions) -> EventCounts {
    let mut counts = tally(events, &options.interaction_events);

    if let Some(play_pause) = counts.get_mut(PLAY_PAUSE_BUTTON_CLICKED) {
        *play_pause = play_pause.saturating_sub(1);
    }

    let mut total_events: u32 = counts.values().sum();
    if !options.include_link_choices {
        total_events -= counts.get(LINK_CHOICE_CLICKED).copied().unwrap_or(0);
    }
    if !options.include_user_set_variables {
        total_events -= counts.get(USER_SET_VARIABLE).copied().unwrap_or(0);
    }

    EventCounts {
        counts,
        total_events,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StreamBuilder;
    use pretty_assertions::assert_eq;

    fn options() -> EventCountOptions {
        EventCountOptions::new([
            PLAY_PAUSE_BUTTON_CLICKED,
            LINK_CHOICE_CLICKED,
            USER_SET_VARIABLE,
            "NEXT_BUTTON_CLICKED",
            "BACK_BUTTON_CLICKED",
        ])
    }

    fn stream() -> Vec<Event> {
        StreamBuilder::new()
            .action(0.0, PLAY_PAUSE_BUTTON_CLICKED)
            .action(1.0, "NEXT_BUTTON_CLICKED")
            .action(2.0, PLAY_PAUSE_BUTTON_CLICKED)
            .action(3.0, LINK_CHOICE_CLICKED)
            .action(4.0, USER_SET_VARIABLE)
            .action(5.0, USER_SET_VARIABLE)
            .action(6.0, "SUBTITLES_BUTTON_CLICKED")
            .build()
    }

    #[test]
    fn test_event_counts() {
        let counts = event_counts(&stream(), &options());

        let expected: BTreeMap<String, u32> = [
            (PLAY_PAUSE_BUTTON_CLICKED, 1),
            (LINK_CHOICE_CLICKED, 1),
            (USER_SET_VARIABLE, 2),
            ("NEXT_BUTTON_CLICKED", 1),
            ("BACK_BUTTON_CLICKED", 0),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        assert_eq!(counts.counts, expected);
        assert_eq!(counts.total_events, 2);
    }

    #[test]
    fn test_total_includes_link_choices_and_variables() {
        let counts = event_counts(
            &stream(),
            &options().with_link_choices().with_user_set_variables(),
        );
        assert_eq!(counts.total_events, 5);
    }

    #[test]
    fn test_play_pause_never_negative() {
        let events = StreamBuilder::new().action(0.0, "NEXT_BUTTON_CLICKED").build();
        let counts = event_counts(&events, &options());
        assert_eq!(counts.counts[PLAY_PAUSE_BUTTON_CLICKED], 0);
    }

    #[test]
    fn test_empty_stream() {
        let counts = event_counts(&[], &options());
        assert!(counts.counts.values().all(|c| *c == 0));
        assert_eq!(counts.total_events, 0);
    }

    #[test]
    fn test_validation() {
        assert!(EventCountOptions::new(Vec::<String>::new()).validate().is_err());
        assert!(EventCountOptions::new([""]).validate().is_err());
        assert!(options().validate().is_ok());
    }
}
