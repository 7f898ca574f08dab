//! Extractor configuration
//!
//! Engine-level settings shared by every extractor, plus the per-call option
//! sets for the frequency and sequence engines. All of them deserialize from
//! JSON so callers can keep them next to their data exports.

use crate::error::ComputeError;
use crate::event_stats::validate_interaction_events;
use crate::types::{
    Event, LINK_CHOICE_CLICKED, PLAY_PAUSE_BUTTON_CLICKED, USER_ACTION, USER_SET_VARIABLE,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Which events take part in pause counting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PausePolicy {
    /// Action types whose events qualify
    pub included_action_types: BTreeSet<String>,
    /// Additional action names that qualify regardless of their type
    pub included_action_names: BTreeSet<String>,
    /// Action names that never qualify
    pub excluded_action_names: BTreeSet<String>,
}

impl Default for PausePolicy {
    fn default() -> Self {
        Self {
            included_action_types: BTreeSet::from([USER_ACTION.to_string()]),
            included_action_names: BTreeSet::new(),
            excluded_action_names: BTreeSet::from([
                USER_SET_VARIABLE.to_string(),
                LINK_CHOICE_CLICKED.to_string(),
            ]),
        }
    }
}

impl PausePolicy {
    /// Widen the policy to also count the given action names
    pub fn including<I, S>(mut self, action_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.included_action_names
            .extend(action_names.into_iter().map(Into::into));
        self
    }

    /// Replace the excluded action names
    pub fn excluding<I, S>(mut self, action_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_action_names = action_names.into_iter().map(Into::into).collect();
        self
    }

    pub fn qualifies(&self, event: &Event) -> bool {
        let included = self.included_action_types.contains(&event.action_type)
            || self.included_action_names.contains(&event.action_name);
        included && !self.excluded_action_names.contains(&event.action_name)
    }
}

/// Work partitioning settings (consumed by the partitioner only)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelConfig {
    /// Number of worker chunks; `None` uses every available core
    pub n_jobs: Option<usize>,
    /// Per-chunk progress logging when greater than zero
    pub verbose: u8,
}

impl ParallelConfig {
    /// Run everything on the calling thread
    pub fn sequential() -> Self {
        Self {
            n_jobs: Some(1),
            verbose: 0,
        }
    }
}

/// Engine-level configuration shared by all extractors
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Narrative element that marks the end of the experience
    pub completion_point: Option<String>,
    /// Reference duration in seconds of each narrative element
    pub narrative_element_durations: BTreeMap<String, f64>,
    pub pause_policy: PausePolicy,
    pub parallel: ParallelConfig,
}

impl ExtractorConfig {
    /// Parse a configuration from JSON, filling unspecified fields with defaults
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_completion_point(mut self, completion_point: impl Into<String>) -> Self {
        self.completion_point = Some(completion_point.into());
        self
    }

    pub fn with_narrative_element_durations(mut self, durations: BTreeMap<String, f64>) -> Self {
        self.narrative_element_durations = durations;
        self
    }

    pub fn with_pause_policy(mut self, pause_policy: PausePolicy) -> Self {
        self.pause_policy = pause_policy;
        self
    }

    pub fn with_parallel(mut self, parallel: ParallelConfig) -> Self {
        self.parallel = parallel;
        self
    }
}

/// Options for per-window event frequency extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyOptions {
    /// Window boundaries in seconds of elapsed time; `n + 1` values give `n` windows
    pub boundaries: Vec<f64>,
    /// Action names to count in each window
    pub interaction_events: BTreeSet<String>,
    /// Also report pause counts for each window
    #[serde(default)]
    pub include_pauses: bool,
    /// Action whose first occurrence is generated on load and is discounted once
    #[serde(default = "default_spurious_first_action")]
    pub spurious_first_action: Option<String>,
}

fn default_spurious_first_action() -> Option<String> {
    Some(PLAY_PAUSE_BUTTON_CLICKED.to_string())
}

impl FrequencyOptions {
    pub fn new<I, S>(boundaries: Vec<f64>, interaction_events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            boundaries,
            interaction_events: interaction_events.into_iter().map(Into::into).collect(),
            include_pauses: false,
            spurious_first_action: default_spurious_first_action(),
        }
    }

    /// Boundaries every `step` minutes, from 0 to `minutes`
    pub fn minutes<I, S>(minutes: u32, step: u32, interaction_events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let step = step.max(1);
        let boundaries = (0..=minutes)
            .step_by(step as usize)
            .map(|m| m as f64 * 60.0)
            .collect();
        Self::new(boundaries, interaction_events)
    }

    pub fn with_pauses(mut self) -> Self {
        self.include_pauses = true;
        self
    }

    pub fn with_spurious_first_action(mut self, action_name: Option<String>) -> Self {
        self.spurious_first_action = action_name;
        self
    }

    /// Check that boundaries form at least one window and are strictly increasing
    pub fn validate(&self) -> Result<(), ComputeError> {
        if self.boundaries.len() < 2 {
            return Err(ComputeError::InvalidArgument(format!(
                "At least two window boundaries are required, got {}",
                self.boundaries.len()
            )));
        }
        if let Some(bad) = self.boundaries.iter().find(|b| !b.is_finite()) {
            return Err(ComputeError::InvalidArgument(format!(
                "Window boundaries must be finite numbers, got {bad}"
            )));
        }
        if let Some(pair) = self.boundaries.windows(2).find(|pair| pair[1] <= pair[0]) {
            return Err(ComputeError::InvalidArgument(format!(
                "Window boundaries must be strictly increasing ({} is followed by {})",
                pair[0], pair[1]
            )));
        }
        validate_interaction_events(&self.interaction_events)
    }
}

/// Options for interaction sequence extraction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceOptions {
    /// Action names retained in the sequence
    pub interaction_events: BTreeSet<String>,
    /// Token for each retained action name
    pub aliases: BTreeMap<String, String>,
    /// Token whose consecutive runs collapse into `token_count`
    #[serde(default)]
    pub compress_event: Option<String>,
}

impl SequenceOptions {
    /// Options retaining exactly the aliased action names
    pub fn from_aliases(aliases: BTreeMap<String, String>) -> Self {
        Self {
            interaction_events: aliases.keys().cloned().collect(),
            aliases,
            compress_event: None,
        }
    }

    pub fn new(interaction_events: BTreeSet<String>, aliases: BTreeMap<String, String>) -> Self {
        Self {
            interaction_events,
            aliases,
            compress_event: None,
        }
    }

    pub fn compressing(mut self, token: impl Into<String>) -> Self {
        self.compress_event = Some(token.into());
        self
    }

    /// Check that every retained action name has an alias and vice versa
    pub fn validate(&self) -> Result<(), ComputeError> {
        validate_interaction_events(&self.interaction_events)?;
        let aliased: BTreeSet<&String> = self.aliases.keys().collect();
        let retained: BTreeSet<&String> = self.interaction_events.iter().collect();
        if aliased != retained {
            let missing: Vec<&str> = retained
                .symmetric_difference(&aliased)
                .map(|name| name.as_str())
                .collect();
            return Err(ComputeError::InvalidArgument(format!(
                "Interaction events and alias keys must match, mismatched: {}",
                missing.join(", ")
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StreamBuilder;
    use crate::types::BROWSER_VISIBILITY_CHANGE;

    #[test]
    fn test_default_pause_policy() {
        let events = StreamBuilder::new()
            .action(0.0, "PLAY_PAUSE_BUTTON_CLICKED")
            .action(1.0, USER_SET_VARIABLE)
            .action(2.0, LINK_CHOICE_CLICKED)
            .segment(3.0, "A", "B")
            .build();

        let policy = PausePolicy::default();
        let qualifying: Vec<bool> = events.iter().map(|e| policy.qualifies(e)).collect();
        assert_eq!(qualifying, vec![true, false, false, false]);
    }

    #[test]
    fn test_widened_pause_policy() {
        let events = StreamBuilder::new()
            .segment(0.0, "A", "B")
            .action(1.0, LINK_CHOICE_CLICKED)
            .build();

        let policy = PausePolicy::default()
            .including(["NARRATIVE_ELEMENT_CHANGE"])
            .excluding(Vec::<String>::new());
        assert!(policy.qualifies(&events[0]));
        assert!(policy.qualifies(&events[1]));
    }

    #[test]
    fn test_config_from_json_defaults() {
        let config = ExtractorConfig::from_json(
            r#"{
                "completion_point": "Credits",
                "narrative_element_durations": {"Intro Message": 15.0},
                "parallel": {"n_jobs": 2}
            }"#,
        )
        .unwrap();

        assert_eq!(config.completion_point.as_deref(), Some("Credits"));
        assert_eq!(config.narrative_element_durations["Intro Message"], 15.0);
        assert_eq!(config.parallel.n_jobs, Some(2));
        assert_eq!(config.pause_policy, PausePolicy::default());
    }

    #[test]
    fn test_config_invalid_json() {
        assert!(matches!(
            ExtractorConfig::from_json("not json"),
            Err(ComputeError::JsonError(_))
        ));
    }

    #[test]
    fn test_minute_boundaries() {
        let options = FrequencyOptions::minutes(5, 1, [BROWSER_VISIBILITY_CHANGE]);
        assert_eq!(
            options.boundaries,
            vec![0.0, 60.0, 120.0, 180.0, 240.0, 300.0]
        );
        assert_eq!(
            options.spurious_first_action.as_deref(),
            Some(PLAY_PAUSE_BUTTON_CLICKED)
        );
    }

    #[test]
    fn test_frequency_options_validation() {
        let events = [PLAY_PAUSE_BUTTON_CLICKED];
        assert!(FrequencyOptions::new(vec![0.0, 60.0], events).validate().is_ok());
        assert!(FrequencyOptions::new(vec![0.0], events).validate().is_err());
        assert!(FrequencyOptions::new(vec![], events).validate().is_err());
        assert!(FrequencyOptions::new(vec![0.0, 60.0, 30.0], events)
            .validate()
            .is_err());
        assert!(FrequencyOptions::new(vec![0.0, 60.0, 60.0], events)
            .validate()
            .is_err());
        assert!(FrequencyOptions::new(vec![0.0, f64::NAN], events)
            .validate()
            .is_err());
        assert!(FrequencyOptions::new(vec![0.0, 60.0], Vec::<String>::new())
            .validate()
            .is_err());
    }

    #[test]
    fn test_sequence_options_from_aliases() {
        let aliases = BTreeMap::from([
            ("NEXT_BUTTON_CLICKED".to_string(), "NB".to_string()),
            ("BACK_BUTTON_CLICKED".to_string(), "BB".to_string()),
        ]);
        let options = SequenceOptions::from_aliases(aliases).compressing("NB");
        assert_eq!(options.interaction_events.len(), 2);
        assert_eq!(options.compress_event.as_deref(), Some("NB"));
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_sequence_options_mismatch() {
        let aliases = BTreeMap::from([("NEXT_BUTTON_CLICKED".to_string(), "NB".to_string())]);
        let events = BTreeSet::from([
            "NEXT_BUTTON_CLICKED".to_string(),
            "BACK_BUTTON_CLICKED".to_string(),
        ]);
        assert!(matches!(
            SequenceOptions::new(events, aliases).validate(),
            Err(ComputeError::InvalidArgument(_))
        ));
        assert!(SequenceOptions::from_aliases(BTreeMap::new())
            .validate()
            .is_err());
    }
}
