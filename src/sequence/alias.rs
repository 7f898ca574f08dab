//! Event tokenization
//!
//! Turns a retained event into its alias token. Stateful actions carry
//! their tracker in an [`AliasState`] that is threaded through a user's
//! stream, starting from [`AliasState::default`] for every user.

use crate::error::ComputeError;
use crate::types::{Event, EventKind, HIDDEN_STATE};
use serde_json::Value;

/// Volume level assumed before the first volume change of a stream
pub const INITIAL_VOLUME_LEVEL: f64 = 1.0;

/// To-state reported when entering fullscreen
const FULLSCREEN_STATE: &str = "fullscreen";

/// Tracker state carried between events of one user
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AliasState {
    /// Last known volume level
    pub volume: f64,
}

impl Default for AliasState {
    fn default() -> Self {
        Self {
            volume: INITIAL_VOLUME_LEVEL,
        }
    }
}

/// Token for `event` given its base `alias`, and the state after it
pub fn alias_event(
    event: &Event,
    alias: &str,
    state: AliasState,
) -> Result<(String, AliasState), ComputeError> {
    let token = match event.kind() {
        EventKind::VolumeChanged => {
            let level = volume_level(event)?;
            let direction = if level > state.volume {
                "UP"
            } else if level < state.volume {
                "DOWN"
            } else {
                "NO"
            };
            return Ok((format!("{alias}_{direction}"), AliasState { volume: level }));
        }
        EventKind::Fullscreen => {
            if event.to_state_str() == Some(FULLSCREEN_STATE) {
                format!("TO_{alias}")
            } else {
                format!("FROM_{alias}")
            }
        }
        EventKind::BrowserVisibility => {
            if event.to_state_str() == Some(HIDDEN_STATE) {
                format!("{alias}_H")
            } else {
                format!("{alias}_V")
            }
        }
        EventKind::WindowOrientation => match orientation(event) {
            Some(Orientation::Horizontal) => format!("{alias}_H"),
            Some(Orientation::Vertical) => format!("{alias}_V"),
            None => alias.to_string(),
        },
        EventKind::NarrativeElementChange | EventKind::Other => alias.to_string(),
    };
    Ok((token, state))
}

/// Parse the level out of a volume change payload.
///
/// The level is either a bare number or the last whitespace separated
/// field of a string such as `"Background: 0.5"`.
fn volume_level(event: &Event) -> Result<f64, ComputeError> {
    let parsed = match event.to_state() {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s
            .split_whitespace()
            .last()
            .and_then(|field| field.parse::<f64>().ok()),
        _ => None,
    };

    parsed.filter(|level| level.is_finite()).ok_or_else(|| {
        ComputeError::InvalidArgument(format!(
            "Event {} has no readable volume level: {:?}",
            event.id,
            event.to_state()
        ))
    })
}

enum Orientation {
    Horizontal,
    Vertical,
}

/// Screen orientation from an angle in degrees; anything else is unknown
fn orientation(event: &Event) -> Option<Orientation> {
    let angle = event.to_state()?.as_f64()?;
    if angle == 90.0 || angle == -90.0 {
        Some(Orientation::Horizontal)
    } else if angle == 0.0 || angle == 180.0 {
        Some(Orientation::Vertical)
    } else {
        None
    }
}
