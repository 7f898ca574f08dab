//! Interaction Flux - Behavioral metrics engine for interactive video logs
//!
//! Flux turns per-user streams of interaction events into behavioural
//! metrics: hidden-time-compensated session and segment timings, pause
//! counts, event counts and per-window frequencies, statistical slices per
//! narrative element, and symbolic interaction sequences with n-grams.
//!
//! ## Modules
//!
//! - **Statistics**: time, pause, event and frequency engines behind the
//!   memoized [`Statistics`] extractor
//! - **Sequences**: alias/pause token sequences and n-grams behind the
//!   [`Sequences`] extractor

pub mod config;
pub mod dataset;
pub mod encoder;
pub mod error;
pub mod event_stats;
pub mod frequency;
mod memo;
pub mod partition;
pub mod pause;
pub mod pause_stats;
pub mod sequence;
pub mod slices;
pub mod statistics;
pub mod time_stats;
pub mod types;
pub mod visibility;

#[cfg(test)]
mod test_support;

pub use config::{ExtractorConfig, FrequencyOptions, ParallelConfig, PausePolicy, SequenceOptions};
pub use dataset::UserEvents;
pub use encoder::{MetricsReport, ReportEncoder};
pub use error::ComputeError;
pub use event_stats::{EventCountOptions, EventCounts};
pub use frequency::WindowFrequency;
pub use pause::{classify_pause, PauseClass};
pub use pause_stats::PauseCounts;
pub use sequence::{NGramReport, Sequences};
pub use slices::StatisticalSlice;
pub use statistics::Statistics;
pub use time_stats::TimeStatistics;
pub use types::{Event, MetricValue, StatisticsRecord, ToRecord};

/// Flux version embedded in all reports
pub const FLUX_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "interaction-flux";
