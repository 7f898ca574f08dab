//! Report encoding
//!
//! This module wraps per-user statistics records in a JSON report envelope
//! carrying producer metadata and the time of computation.

use crate::error::ComputeError;
use crate::types::StatisticsRecord;
use crate::{FLUX_VERSION, PRODUCER_NAME};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Current report schema version
pub const REPORT_VERSION: &str = "1.0.0";

/// Producer metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Statistics of a population of users
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub report_version: String,
    pub producer: ReportProducer,
    /// RFC 3339 timestamp of when the report was produced
    pub computed_at_utc: String,
    /// Narrative element counted as completing the experience
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_point: Option<String>,
    pub user_count: usize,
    pub users: BTreeMap<String, StatisticsRecord>,
}

/// Encoder for metrics reports
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    /// Wrap per-user records in a report stamped with the current time
    pub fn encode(
        &self,
        records: BTreeMap<String, StatisticsRecord>,
        completion_point: Option<&str>,
    ) -> MetricsReport {
        self.encode_at(records, completion_point, Utc::now())
    }

    /// Wrap per-user records in a report stamped with `computed_at`
    pub fn encode_at(
        &self,
        records: BTreeMap<String, StatisticsRecord>,
        completion_point: Option<&str>,
        computed_at: DateTime<Utc>,
    ) -> MetricsReport {
        MetricsReport {
            report_version: REPORT_VERSION.to_string(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: FLUX_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            computed_at_utc: computed_at.to_rfc3339(),
            completion_point: completion_point.map(str::to_string),
            user_count: records.len(),
            users: records,
        }
    }

    /// Encode to JSON string
    pub fn encode_to_json(
        &self,
        records: BTreeMap<String, StatisticsRecord>,
        completion_point: Option<&str>,
    ) -> Result<String, ComputeError> {
        let report = self.encode(records, completion_point);
        serde_json::to_string_pretty(&report).map_err(ComputeError::JsonError)
    }
}
