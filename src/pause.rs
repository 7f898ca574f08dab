//! Pause classification
//!
//! Maps the gap between two events to a discrete pause category.

use crate::error::ComputeError;
use crate::types::seconds_between;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upper bound (inclusive) of a short pause in seconds
const SHORT_PAUSE_MAX_SEC: f64 = 5.0;
/// Upper bound (inclusive) of a medium pause in seconds
const MEDIUM_PAUSE_MAX_SEC: f64 = 15.0;
/// Upper bound (inclusive) of a long pause in seconds
const LONG_PAUSE_MAX_SEC: f64 = 30.0;
/// Gaps below this are not pauses
const MIN_PAUSE_SEC: f64 = 1.0;

/// Pause category between two consecutive qualifying events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PauseClass {
    None,
    Short,
    Medium,
    Long,
    VeryLong,
}

impl PauseClass {
    /// Classify a gap in seconds
    pub fn from_seconds(diff: f64) -> Self {
        if (MIN_PAUSE_SEC..=SHORT_PAUSE_MAX_SEC).contains(&diff) {
            PauseClass::Short
        } else if diff > SHORT_PAUSE_MAX_SEC && diff <= MEDIUM_PAUSE_MAX_SEC {
            PauseClass::Medium
        } else if diff > MEDIUM_PAUSE_MAX_SEC && diff <= LONG_PAUSE_MAX_SEC {
            PauseClass::Long
        } else if diff > LONG_PAUSE_MAX_SEC {
            PauseClass::VeryLong
        } else {
            PauseClass::None
        }
    }

    /// Sequence token for this class, `None` when no pause is recorded
    pub fn label(&self) -> Option<&'static str> {
        match self {
            PauseClass::None => None,
            PauseClass::Short => Some("SP"),
            PauseClass::Medium => Some("MP"),
            PauseClass::Long => Some("LP"),
            PauseClass::VeryLong => Some("VLP"),
        }
    }

    pub fn is_pause(&self) -> bool {
        *self != PauseClass::None
    }
}

/// Result of classifying the gap between two instants
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pause {
    pub class: PauseClass,
    /// Raw difference in seconds
    pub diff_sec: f64,
}

/// Classify the pause between `start` and `end`.
///
/// Fails if `end` is before `start`.
pub fn classify_pause(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Pause, ComputeError> {
    if end < start {
        return Err(ComputeError::InvalidArgument(format!(
            "Next timestamp ({}) cannot be before current timestamp ({})",
            end.to_rfc3339(),
            start.to_rfc3339()
        )));
    }

    let diff_sec = seconds_between(start, end);
    Ok(Pause {
        class: PauseClass::from_seconds(diff_sec),
        diff_sec,
    })
}

/// Classify the pause between two optional instants.
///
/// Both instants must be present.
pub fn classify_optional_pause(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<Pause, ComputeError> {
    match (start, end) {
        (Some(start), Some(end)) => classify_pause(start, end),
        _ => Err(ComputeError::InvalidArgument(
            "Both timestamps have to be present".to_string(),
        )),
    }
}
