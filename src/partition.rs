//! Work partitioning across users
//!
//! Every per-user computation is independent, so the user set is split into
//! a fixed number of chunks which run on a dedicated Rayon pool. Results are
//! merged by user id once every chunk has finished.

use crate::config::ParallelConfig;
use crate::dataset::UserEvents;
use crate::error::ComputeError;
use crate::types::Event;
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Number of chunks to split work into for the given configuration
pub fn worker_count(config: &ParallelConfig) -> usize {
    match config.n_jobs {
        Some(n) => n.max(1),
        None => std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1),
    }
}

/// Split users into `chunks` contiguous groups of near-equal size.
///
/// The first `len % chunks` groups receive one extra user. Empty groups are
/// dropped.
pub fn split_users<'a>(users: &[&'a str], chunks: usize) -> Vec<Vec<&'a str>> {
    let chunks = chunks.max(1);
    let base = users.len() / chunks;
    let extra = users.len() % chunks;

    let mut result = Vec::with_capacity(chunks);
    let mut start = 0;
    for i in 0..chunks {
        let size = base + usize::from(i < extra);
        if size == 0 {
            continue;
        }
        result.push(users[start..start + size].to_vec());
        start += size;
    }
    result
}

/// Apply `f` to every user's stream and collect the results by user id.
///
/// Runs inline when a single chunk is requested. The first error from any
/// user aborts the whole computation.
pub fn map_users<T, F>(
    data: &UserEvents,
    config: &ParallelConfig,
    f: F,
) -> Result<BTreeMap<String, T>, ComputeError>
where
    T: Send,
    F: Fn(&str, &[Event]) -> Result<T, ComputeError> + Sync,
{
    let users: Vec<&str> = data.users().collect();
    let workers = worker_count(config).min(users.len().max(1));
    let chunks = split_users(&users, workers);

    let run_chunk = |(chunk_idx, chunk): (usize, &Vec<&str>)| {
        let mut results = Vec::with_capacity(chunk.len());
        for &user in chunk {
            let events = data.events(user)?;
            results.push((user.to_string(), f(user, events)?));
        }
        if config.verbose > 0 {
            debug!(chunk = chunk_idx, users = chunk.len(), "chunk finished");
        }
        Ok::<_, ComputeError>(results)
    };

    if workers <= 1 {
        return merge(chunks.iter().enumerate().map(run_chunk));
    }

    let pool = match rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("interaction-flux-{}", i))
        .build()
    {
        Ok(pool) => pool,
        Err(e) => {
            warn!(error = %e, "failed to build thread pool, running sequentially");
            return merge(chunks.iter().enumerate().map(run_chunk));
        }
    };

    let chunk_results: Vec<_> = pool.install(|| {
        chunks
            .par_iter()
            .enumerate()
            .map(run_chunk)
            .collect()
    });
    merge(chunk_results)
}

fn merge<T, I>(chunk_results: I) -> Result<BTreeMap<String, T>, ComputeError>
where
    I: IntoIterator<Item = Result<Vec<(String, T)>, ComputeError>>,
{
    let mut merged = BTreeMap::new();
    for chunk in chunk_results {
        merged.extend(chunk?);
    }
    Ok(merged)
}
