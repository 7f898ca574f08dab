//! Interaction event data types
//!
//! This module defines the event record consumed by every engine and the
//! aggregate record types the engines produce.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Action type of direct user actions (button clicks, variable sets, link choices)
pub const USER_ACTION: &str = "USER_ACTION";
/// Action type of story navigation events
pub const STORY_NAVIGATION: &str = "STORY_NAVIGATION";

pub const BROWSER_VISIBILITY_CHANGE: &str = "BROWSER_VISIBILITY_CHANGE";
pub const NARRATIVE_ELEMENT_CHANGE: &str = "NARRATIVE_ELEMENT_CHANGE";
pub const PLAY_PAUSE_BUTTON_CLICKED: &str = "PLAY_PAUSE_BUTTON_CLICKED";
pub const LINK_CHOICE_CLICKED: &str = "LINK_CHOICE_CLICKED";
pub const USER_SET_VARIABLE: &str = "USER_SET_VARIABLE";
pub const VOLUME_CHANGED: &str = "VOLUME_CHANGED";
pub const FULLSCREEN_BUTTON_CLICKED: &str = "FULLSCREEN_BUTTON_CLICKED";
pub const WINDOW_ORIENTATION_CHANGE: &str = "WINDOW_ORIENTATION_CHANGE";

/// Payload key holding the state an action transitioned to
pub const TO_STATE_KEY: &str = "romper_to_state";
/// Payload key holding the state an action transitioned from
pub const FROM_STATE_KEY: &str = "romper_from_state";
/// Payload key holding the narrative element active when the event fired
pub const CURRENT_NARRATIVE_ELEMENT_KEY: &str = "current_narrative_element";

/// Visibility state reported when the page is hidden
pub const HIDDEN_STATE: &str = "hidden";
/// Visibility state reported when the page is visible again
pub const VISIBLE_STATE: &str = "visible";

/// A single interaction event captured from the experience
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Identifier, unique within a user's stream
    pub id: u64,
    /// User identifier
    pub user: String,
    /// When the event fired
    pub timestamp: DateTime<Utc>,
    /// Coarse category, e.g. `USER_ACTION` or `STORY_NAVIGATION`
    pub action_type: String,
    /// Fine-grained action, e.g. `BROWSER_VISIBILITY_CHANGE`
    pub action_name: String,
    /// Action-specific payload
    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,
}

impl Event {
    /// Raw to-state value from the payload
    pub fn to_state(&self) -> Option<&serde_json::Value> {
        self.data.get(TO_STATE_KEY)
    }

    /// To-state as a string, if it is one
    pub fn to_state_str(&self) -> Option<&str> {
        self.to_state().and_then(|v| v.as_str())
    }

    /// From-state as a string, if it is one
    pub fn from_state_str(&self) -> Option<&str> {
        self.data.get(FROM_STATE_KEY).and_then(|v| v.as_str())
    }

    /// Identifier of the narrative element this event refers to.
    ///
    /// Segment changes carry the element entered in their to-state; other
    /// events fall back to the element that was active when they fired.
    pub fn narrative_element(&self) -> Option<&str> {
        self.to_state_str().or_else(|| {
            self.data
                .get(CURRENT_NARRATIVE_ELEMENT_KEY)
                .and_then(|v| v.as_str())
        })
    }

    pub fn kind(&self) -> EventKind {
        EventKind::from_action_name(&self.action_name)
    }

    /// Whether this is a visibility change to the hidden state
    pub fn is_hidden_transition(&self) -> bool {
        self.action_name == BROWSER_VISIBILITY_CHANGE && self.to_state_str() == Some(HIDDEN_STATE)
    }

    /// Whether this is a visibility change to the visible state
    pub fn is_visible_transition(&self) -> bool {
        self.action_name == BROWSER_VISIBILITY_CHANGE && self.to_state_str() == Some(VISIBLE_STATE)
    }

    pub fn is_segment_change(&self) -> bool {
        self.action_name == NARRATIVE_ELEMENT_CHANGE
    }
}

/// Closed set of action kinds that need dedicated handling.
///
/// Everything else is `Other` and is treated by its action name alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    VolumeChanged,
    Fullscreen,
    BrowserVisibility,
    WindowOrientation,
    NarrativeElementChange,
    Other,
}

impl EventKind {
    pub fn from_action_name(action_name: &str) -> Self {
        match action_name {
            VOLUME_CHANGED => EventKind::VolumeChanged,
            FULLSCREEN_BUTTON_CLICKED => EventKind::Fullscreen,
            BROWSER_VISIBILITY_CHANGE => EventKind::BrowserVisibility,
            WINDOW_ORIENTATION_CHANGE => EventKind::WindowOrientation,
            NARRATIVE_ELEMENT_CHANGE => EventKind::NarrativeElementChange,
            _ => EventKind::Other,
        }
    }
}

/// A single metric value in a statistics record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Bool(bool),
    Count(u64),
    Float(f64),
}

impl MetricValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Float(v) => Some(*v),
            MetricValue::Count(v) => Some(*v as f64),
            MetricValue::Bool(_) => None,
        }
    }

    pub fn as_count(&self) -> Option<u64> {
        match self {
            MetricValue::Count(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MetricValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        MetricValue::Float(value)
    }
}

impl From<u64> for MetricValue {
    fn from(value: u64) -> Self {
        MetricValue::Count(value)
    }
}

impl From<u32> for MetricValue {
    fn from(value: u32) -> Self {
        MetricValue::Count(value as u64)
    }
}

impl From<bool> for MetricValue {
    fn from(value: bool) -> Self {
        MetricValue::Bool(value)
    }
}

/// Per-user mapping from metric name to value, merged by key across engines
pub type StatisticsRecord = BTreeMap<String, MetricValue>;

/// Types that flatten into a statistics record
pub trait ToRecord {
    fn write_into(&self, record: &mut StatisticsRecord);

    fn to_record(&self) -> StatisticsRecord {
        let mut record = StatisticsRecord::new();
        self.write_into(&mut record);
        record
    }
}

/// Seconds between two instants, microsecond resolution
pub(crate) fn seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    let delta = end - start;
    match delta.num_microseconds() {
        Some(micros) => micros as f64 / 1_000_000.0,
        None => delta.num_milliseconds() as f64 / 1000.0,
    }
}
