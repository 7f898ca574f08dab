//! Interaction sequences
//!
//! Converts each user's stream into a sequence of alias and pause tokens,
//! optionally run-length compresses one token, and derives n-grams from the
//! computed sequences.

pub mod alias;
pub mod compress;
pub mod ngram;

pub use alias::{alias_event, AliasState, INITIAL_VOLUME_LEVEL};
pub use compress::compress;
pub use ngram::{ngrams, NGram, NGramCounts, NGramReport};

use crate::config::{ParallelConfig, SequenceOptions};
use crate::dataset::UserEvents;
use crate::error::ComputeError;
use crate::memo::Memo;
use crate::partition::map_users;
use crate::pause::classify_pause;
use crate::types::Event;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::info;

/// Token sequence of every user
pub type UserSequences = BTreeMap<String, Vec<String>>;

/// Build the token sequence of one user's stream.
///
/// Each retained event is preceded by the pause token for the gap since the
/// previous retained event, when that gap is a pause.
pub fn user_sequence(events: &[Event], options: &SequenceOptions) -> Result<Vec<String>, ComputeError> {
    let mut tokens = Vec::new();
    let mut state = AliasState::default();
    let mut previous: Option<DateTime<Utc>> = None;

    for event in events
        .iter()
        .filter(|e| options.interaction_events.contains(&e.action_name))
    {
        let alias = options.aliases.get(&event.action_name).ok_or_else(|| {
            ComputeError::InvalidArgument(format!("No alias for {}", event.action_name))
        })?;

        if let Some(previous) = previous {
            if let Some(label) = classify_pause(previous, event.timestamp)?.class.label() {
                tokens.push(label.to_string());
            }
        }
        previous = Some(event.timestamp);

        let (token, next_state) = alias_event(event, alias, state)?;
        tokens.push(token);
        state = next_state;
    }

    Ok(match &options.compress_event {
        Some(target) => compress(&tokens, target),
        None => tokens,
    })
}

/// Sequence extractor over a population of users.
///
/// Sequences for the whole population are computed once per set of options
/// and reused until different options are supplied or the cache is cleared.
#[derive(Debug)]
pub struct Sequences {
    data: UserEvents,
    parallel: ParallelConfig,
    cache: Memo<SequenceOptions, UserSequences>,
}

impl Sequences {
    pub fn new(data: UserEvents) -> Self {
        Self {
            data,
            parallel: ParallelConfig::default(),
            cache: Memo::new("sequences"),
        }
    }

    pub fn with_parallel(mut self, parallel: ParallelConfig) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn data(&self) -> &UserEvents {
        &self.data
    }

    /// Sequences of every user
    pub fn get_sequences(&mut self, options: &SequenceOptions) -> Result<&UserSequences, ComputeError> {
        options.validate()?;
        let (data, parallel) = (&self.data, &self.parallel);
        self.cache.get_or_try_insert_with(options, || {
            let sequences = map_users(data, parallel, |_, events| user_sequence(events, options))?;
            info!(users = sequences.len(), "sequences computed");
            Ok(sequences)
        })
    }

    /// Sequence of a single user, computed inline.
    ///
    /// Does not populate the population cache.
    pub fn get_user_sequence(
        &self,
        options: &SequenceOptions,
        user_id: &str,
    ) -> Result<Vec<String>, ComputeError> {
        options.validate()?;
        let events = self.data.events(user_id)?;
        if let Some(cached) = self.cache.get_for(options) {
            if let Some(sequence) = cached.get(user_id) {
                return Ok(sequence.clone());
            }
        }
        user_sequence(events, options)
    }

    /// Most recently computed population sequences, if any
    pub fn sequences(&self) -> Option<&UserSequences> {
        self.cache.get()
    }

    /// N-grams of size `n` for every user, with global and per-user counts.
    ///
    /// Fails with `SequenceError` until [`Sequences::get_sequences`] has run.
    pub fn get_ngrams(&self, n: usize) -> Result<NGramReport, ComputeError> {
        let sequences = self.cache.get().ok_or_else(|| {
            ComputeError::SequenceError(
                "Sequences have not been extracted, call get_sequences beforehand".to_string(),
            )
        })?;

        let mut user_ngrams = BTreeMap::new();
        for (user, sequence) in sequences {
            user_ngrams.insert(user.clone(), ngrams(sequence, n)?);
        }
        let counts = NGramCounts::from_user_ngrams(&user_ngrams);

        Ok(NGramReport {
            ngrams: user_ngrams,
            counts,
        })
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}
