//! Pause statistics
//!
//! Counts short, medium, long and very long pauses between the qualifying
//! events of a stream.

use crate::config::PausePolicy;
use crate::error::ComputeError;
use crate::pause::{classify_pause, PauseClass};
use crate::types::{Event, StatisticsRecord, ToRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of pauses of each class for one user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PauseCounts {
    #[serde(rename = "SP")]
    pub short: u32,
    #[serde(rename = "MP")]
    pub medium: u32,
    #[serde(rename = "LP")]
    pub long: u32,
    #[serde(rename = "VLP")]
    pub very_long: u32,
}

impl PauseCounts {
    pub fn record(&mut self, class: PauseClass) {
        match class {
            PauseClass::None => {}
            PauseClass::Short => self.short += 1,
            PauseClass::Medium => self.medium += 1,
            PauseClass::Long => self.long += 1,
            PauseClass::VeryLong => self.very_long += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.short + self.medium + self.long + self.very_long
    }
}

impl ToRecord for PauseCounts {
    fn write_into(&self, record: &mut StatisticsRecord) {
        record.insert("SP".to_string(), self.short.into());
        record.insert("MP".to_string(), self.medium.into());
        record.insert("LP".to_string(), self.long.into());
        record.insert("VLP".to_string(), self.very_long.into());
    }
}

/// Count pauses between consecutive events accepted by `policy`
pub fn pause_counts<'a, I>(events: I, policy: &PausePolicy) -> Result<PauseCounts, ComputeError>
where
    I: IntoIterator<Item = &'a Event>,
{
    let mut counts = PauseCounts::default();
    let mut previous: Option<DateTime<Utc>> = None;

    for event in events.into_iter().filter(|e| policy.qualifies(e)) {
        if let Some(previous) = previous {
            counts.record(classify_pause(previous, event.timestamp)?.class);
        }
        previous = Some(event.timestamp);
    }

    Ok(counts)
}
