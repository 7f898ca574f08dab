//! Event builders shared by unit tests

use crate::types::{
    Event, BROWSER_VISIBILITY_CHANGE, NARRATIVE_ELEMENT_CHANGE, STORY_NAVIGATION, USER_ACTION,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::json;
use std::collections::HashMap;

pub const USER: &str = "user-1";

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap()
}

pub fn at(secs: f64) -> DateTime<Utc> {
    base_time() + Duration::milliseconds((secs * 1000.0).round() as i64)
}

/// Builds a stream for one user, assigning ids in insertion order
pub struct StreamBuilder {
    user: String,
    events: Vec<Event>,
}

impl StreamBuilder {
    pub fn new() -> Self {
        Self::for_user(USER)
    }

    pub fn for_user(user: &str) -> Self {
        Self {
            user: user.to_string(),
            events: Vec::new(),
        }
    }

    pub fn event(
        mut self,
        secs: f64,
        action_type: &str,
        action_name: &str,
        data: serde_json::Value,
    ) -> Self {
        let data: HashMap<String, serde_json::Value> = match data {
            serde_json::Value::Object(map) => map.into_iter().collect(),
            _ => HashMap::new(),
        };
        let id = self.events.len() as u64 + 1;
        self.events.push(Event {
            id,
            user: self.user.clone(),
            timestamp: at(secs),
            action_type: action_type.to_string(),
            action_name: action_name.to_string(),
            data,
        });
        self
    }

    pub fn action(self, secs: f64, action_name: &str) -> Self {
        self.event(secs, USER_ACTION, action_name, json!({}))
    }

    pub fn action_to(self, secs: f64, action_name: &str, to_state: serde_json::Value) -> Self {
        self.event(
            secs,
            USER_ACTION,
            action_name,
            json!({ "romper_to_state": to_state }),
        )
    }

    pub fn hidden(self, secs: f64) -> Self {
        self.action_to(secs, BROWSER_VISIBILITY_CHANGE, json!("hidden"))
    }

    pub fn visible(self, secs: f64) -> Self {
        self.action_to(secs, BROWSER_VISIBILITY_CHANGE, json!("visible"))
    }

    pub fn segment(self, secs: f64, from: &str, to: &str) -> Self {
        self.event(
            secs,
            STORY_NAVIGATION,
            NARRATIVE_ELEMENT_CHANGE,
            json!({ "romper_from_state": from, "romper_to_state": to }),
        )
    }

    pub fn build(self) -> Vec<Event> {
        self.events
    }
}
