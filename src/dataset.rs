//! Per-user event streams
//!
//! Holds the `user -> events` mapping every extractor works on. Streams are
//! sorted by timestamp on construction and never mutated afterwards.

use crate::error::ComputeError;
use crate::types::{Event, STORY_NAVIGATION};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Chronologically ordered event streams keyed by user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserEvents {
    streams: BTreeMap<String, Vec<Event>>,
}

impl UserEvents {
    /// Build from a `user -> events` mapping.
    ///
    /// Fails if the mapping is empty. Each stream is stably sorted by timestamp.
    pub fn new(streams: BTreeMap<String, Vec<Event>>) -> Result<Self, ComputeError> {
        if streams.is_empty() {
            return Err(ComputeError::InvalidArgument(
                "User event mapping must contain at least one user".to_string(),
            ));
        }

        let streams = streams
            .into_iter()
            .map(|(user, mut events)| {
                events.sort_by_key(|e| e.timestamp);
                (user, events)
            })
            .collect();

        Ok(Self { streams })
    }

    /// Group a flat list of events by their `user` field
    pub fn from_events(events: Vec<Event>) -> Result<Self, ComputeError> {
        let mut streams: BTreeMap<String, Vec<Event>> = BTreeMap::new();
        for event in events {
            streams.entry(event.user.clone()).or_default().push(event);
        }
        Self::new(streams)
    }

    /// Parse a JSON object of `user -> [event]`
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let streams: BTreeMap<String, Vec<Event>> = serde_json::from_str(json)?;
        Self::new(streams)
    }

    /// Events of one user, failing with `LookupFailure` if the user is unknown
    pub fn events(&self, user_id: &str) -> Result<&[Event], ComputeError> {
        self.streams
            .get(user_id)
            .map(Vec::as_slice)
            .ok_or_else(|| ComputeError::unknown_user(user_id))
    }

    pub fn contains_user(&self, user_id: &str) -> bool {
        self.streams.contains_key(user_id)
    }

    pub fn users(&self) -> impl Iterator<Item = &str> {
        self.streams.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Event])> {
        self.streams
            .iter()
            .map(|(user, events)| (user.as_str(), events.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// Whether each user navigated to `completion_point` at least once
    pub fn reached_completion_point(&self, completion_point: &str) -> BTreeMap<String, bool> {
        self.streams
            .iter()
            .map(|(user, events)| (user.clone(), reached(events, completion_point)))
            .collect()
    }

    /// Users that both entered and left the narrative element `point`
    pub fn reached_point(&self, point: &str) -> BTreeSet<String> {
        self.streams
            .iter()
            .filter(|(_, events)| {
                let navigation = events.iter().filter(|e| e.action_type == STORY_NAVIGATION);
                let (mut entered, mut left) = (false, false);
                for event in navigation {
                    entered |= event.to_state_str() == Some(point);
                    left |= event.from_state_str() == Some(point);
                }
                entered && left
            })
            .map(|(user, _)| user.clone())
            .collect()
    }
}

/// Whether a stream contains a navigation to `completion_point`
pub fn reached(events: &[Event], completion_point: &str) -> bool {
    first_arrival(events, completion_point).is_some()
}

/// Index of the first navigation to `completion_point`
pub fn first_arrival(events: &[Event], completion_point: &str) -> Option<usize> {
    events.iter().position(|e| {
        e.action_type == STORY_NAVIGATION && e.to_state_str() == Some(completion_point)
    })
}
