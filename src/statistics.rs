//! Statistics extractor
//!
//! Owns a population of user streams and the engine configuration, and
//! exposes memoized population-wide accessors for every statistics engine
//! alongside inline single-user variants.

use crate::config::{ExtractorConfig, FrequencyOptions};
use crate::dataset::UserEvents;
use crate::error::ComputeError;
use crate::event_stats::{event_counts, EventCountOptions, EventCounts};
use crate::frequency::{event_frequencies, WindowFrequency};
use crate::memo::Memo;
use crate::partition::map_users;
use crate::pause_stats::{pause_counts, PauseCounts};
use crate::slices::{user_slices, StatisticalSlice};
use crate::time_stats::{time_statistics, TimeStatistics};
use crate::types::{Event, StatisticsRecord, ToRecord};
use std::collections::BTreeMap;
use tracing::info;

/// Per-user results of one engine
pub type UserResults<T> = BTreeMap<String, T>;

/// Statistics extractor over a population of users.
///
/// Population results are cached per engine and keyed by the options that
/// produced them; [`Statistics::clear_cache`] forces recomputation.
#[derive(Debug)]
pub struct Statistics {
    data: UserEvents,
    config: ExtractorConfig,
    time_cache: Memo<(), UserResults<TimeStatistics>>,
    pause_cache: Memo<(), UserResults<PauseCounts>>,
    event_cache: Memo<EventCountOptions, UserResults<EventCounts>>,
    frequency_cache: Memo<FrequencyOptions, UserResults<Vec<WindowFrequency>>>,
    slice_cache: Memo<EventCountOptions, Vec<StatisticalSlice>>,
}

impl Statistics {
    pub fn new(data: UserEvents, config: ExtractorConfig) -> Self {
        Self {
            data,
            config,
            time_cache: Memo::new("time"),
            pause_cache: Memo::new("pause"),
            event_cache: Memo::new("event"),
            frequency_cache: Memo::new("frequency"),
            slice_cache: Memo::new("slices"),
        }
    }

    pub fn data(&self) -> &UserEvents {
        &self.data
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Time statistics of every user
    pub fn time_statistics(&mut self) -> Result<&UserResults<TimeStatistics>, ComputeError> {
        let (data, config) = (&self.data, &self.config);
        self.time_cache
            .get_or_try_insert_with(&(), || all_time_statistics(data, config))
    }

    pub fn time_statistics_for(&self, user_id: &str) -> Result<TimeStatistics, ComputeError> {
        lookup_or_compute(self.time_cache.get_for(&()), &self.data, user_id, |events| {
            Ok(user_time_statistics(events, &self.config))
        })
    }

    /// Pause counts of every user under the configured pause policy
    pub fn pause_statistics(&mut self) -> Result<&UserResults<PauseCounts>, ComputeError> {
        let (data, config) = (&self.data, &self.config);
        self.pause_cache.get_or_try_insert_with(&(), || {
            compute_all("pause", data, config, |_, events| {
                pause_counts(events, &config.pause_policy)
            })
        })
    }

    pub fn pause_statistics_for(&self, user_id: &str) -> Result<PauseCounts, ComputeError> {
        lookup_or_compute(self.pause_cache.get_for(&()), &self.data, user_id, |events| {
            pause_counts(events, &self.config.pause_policy)
        })
    }

    /// Event counts of every user
    pub fn event_statistics(
        &mut self,
        options: &EventCountOptions,
    ) -> Result<&UserResults<EventCounts>, ComputeError> {
        options.validate()?;
        let (data, config) = (&self.data, &self.config);
        self.event_cache.get_or_try_insert_with(options, || {
            compute_all("event", data, config, |_, events| {
                Ok(event_counts(events, options))
            })
        })
    }

    pub fn event_statistics_for(
        &self,
        options: &EventCountOptions,
        user_id: &str,
    ) -> Result<EventCounts, ComputeError> {
        options.validate()?;
        lookup_or_compute(self.event_cache.get_for(options), &self.data, user_id, |events| {
            Ok(event_counts(events, options))
        })
    }

    /// Per-window event counts of every user
    pub fn event_frequencies(
        &mut self,
        options: &FrequencyOptions,
    ) -> Result<&UserResults<Vec<WindowFrequency>>, ComputeError> {
        options.validate()?;
        let (data, config) = (&self.data, &self.config);
        self.frequency_cache.get_or_try_insert_with(options, || {
            compute_all("frequency", data, config, |_, events| {
                event_frequencies(events, options, &config.pause_policy)
            })
        })
    }

    pub fn event_frequencies_for(
        &self,
        options: &FrequencyOptions,
        user_id: &str,
    ) -> Result<Vec<WindowFrequency>, ComputeError> {
        options.validate()?;
        lookup_or_compute(
            self.frequency_cache.get_for(options),
            &self.data,
            user_id,
            |events| event_frequencies(events, options, &self.config.pause_policy),
        )
    }

    /// Time, pause and event statistics of every user merged into one record
    pub fn calculate_statistics(
        &mut self,
        options: &EventCountOptions,
    ) -> Result<UserResults<StatisticsRecord>, ComputeError> {
        options.validate()?;
        let Self {
            ref data,
            ref config,
            ref mut time_cache,
            ref mut pause_cache,
            ref mut event_cache,
            ..
        } = *self;

        let time = time_cache.get_or_try_insert_with(&(), || all_time_statistics(data, config))?;
        let pauses = pause_cache.get_or_try_insert_with(&(), || {
            compute_all("pause", data, config, |_, events| {
                pause_counts(events, &config.pause_policy)
            })
        })?;
        let events = event_cache.get_or_try_insert_with(options, || {
            compute_all("event", data, config, |_, events| {
                Ok(event_counts(events, options))
            })
        })?;

        Ok(data
            .users()
            .map(|user| {
                let mut record = StatisticsRecord::new();
                let parts: [Option<&dyn ToRecord>; 3] = [
                    time.get(user).map(|t| t as &dyn ToRecord),
                    pauses.get(user).map(|p| p as &dyn ToRecord),
                    events.get(user).map(|e| e as &dyn ToRecord),
                ];
                for part in parts.into_iter().flatten() {
                    part.write_into(&mut record);
                }
                (user.to_string(), record)
            })
            .collect())
    }

    pub fn calculate_statistics_for(
        &self,
        options: &EventCountOptions,
        user_id: &str,
    ) -> Result<StatisticsRecord, ComputeError> {
        let mut record = self.time_statistics_for(user_id)?.to_record();
        self.pause_statistics_for(user_id)?.write_into(&mut record);
        self.event_statistics_for(options, user_id)?
            .write_into(&mut record);
        Ok(record)
    }

    /// Hidden-time-compensated session length of every user
    pub fn session_length(&mut self) -> Result<UserResults<f64>, ComputeError> {
        Ok(self
            .time_statistics()?
            .iter()
            .map(|(user, stats)| (user.clone(), stats.session_length))
            .collect())
    }

    pub fn session_length_for(&self, user_id: &str) -> Result<f64, ComputeError> {
        Ok(self.time_statistics_for(user_id)?.session_length)
    }

    /// Statistical slices of every user, ordered by user then stream position
    pub fn statistical_slices(
        &mut self,
        options: &EventCountOptions,
    ) -> Result<&[StatisticalSlice], ComputeError> {
        options.validate()?;
        let (data, config) = (&self.data, &self.config);
        let slices = self.slice_cache.get_or_try_insert_with(options, || {
            let per_user = compute_all("slices", data, config, |user, events| {
                user_slices(user, events, config, options)
            })?;
            Ok(per_user.into_values().flatten().collect())
        })?;
        Ok(slices.as_slice())
    }

    /// Drop every cached result
    pub fn clear_cache(&mut self) {
        self.time_cache.clear();
        self.pause_cache.clear();
        self.event_cache.clear();
        self.frequency_cache.clear();
        self.slice_cache.clear();
    }
}

fn user_time_statistics(events: &[Event], config: &ExtractorConfig) -> TimeStatistics {
    time_statistics(
        events,
        config.completion_point.as_deref(),
        &config.narrative_element_durations,
    )
}

fn all_time_statistics(
    data: &UserEvents,
    config: &ExtractorConfig,
) -> Result<UserResults<TimeStatistics>, ComputeError> {
    compute_all("time", data, config, |_, events| {
        Ok(user_time_statistics(events, config))
    })
}

/// Run one engine over the whole population
fn compute_all<T, F>(
    engine: &'static str,
    data: &UserEvents,
    config: &ExtractorConfig,
    f: F,
) -> Result<UserResults<T>, ComputeError>
where
    T: Send,
    F: Fn(&str, &[Event]) -> Result<T, ComputeError> + Sync,
{
    let results = map_users(data, &config.parallel, f)?;
    info!(engine, users = results.len(), "statistics computed");
    Ok(results)
}

/// A user's cached result, or one computed inline from their stream
fn lookup_or_compute<T, F>(
    cached: Option<&UserResults<T>>,
    data: &UserEvents,
    user_id: &str,
    compute: F,
) -> Result<T, ComputeError>
where
    T: Clone,
    F: FnOnce(&[Event]) -> Result<T, ComputeError>,
{
    let events = data.events(user_id)?;
    match cached.and_then(|results| results.get(user_id)) {
        Some(result) => Ok(result.clone()),
        None => compute(events),
    }
}
