//! N-gram extraction and counting

use crate::error::ComputeError;
use std::collections::BTreeMap;

/// A contiguous run of `n` tokens
pub type NGram = Vec<String>;

/// Every contiguous length-`n` window of `sequence`, in order.
///
/// Sequences shorter than `n` yield nothing.
pub fn ngrams(sequence: &[String], n: usize) -> Result<Vec<NGram>, ComputeError> {
    if n == 0 {
        return Err(ComputeError::InvalidArgument(
            "N-gram size must be at least 1".to_string(),
        ));
    }
    Ok(sequence.windows(n).map(<[String]>::to_vec).collect())
}

/// N-gram frequencies across all users and for each user
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NGramCounts {
    pub global: BTreeMap<NGram, u32>,
    pub per_user: BTreeMap<String, BTreeMap<NGram, u32>>,
}

impl NGramCounts {
    /// Tally the n-grams of every user
    pub fn from_user_ngrams(user_ngrams: &BTreeMap<String, Vec<NGram>>) -> Self {
        let mut counts = NGramCounts::default();
        for (user, grams) in user_ngrams {
            let user_counts = counts.per_user.entry(user.clone()).or_default();
            for gram in grams {
                *user_counts.entry(gram.clone()).or_insert(0) += 1;
                *counts.global.entry(gram.clone()).or_insert(0) += 1;
            }
        }
        counts
    }

    /// The `k` most frequent n-grams overall, ties broken by n-gram order
    pub fn most_common(&self, k: usize) -> Vec<(&NGram, u32)> {
        let mut ranked: Vec<(&NGram, u32)> =
            self.global.iter().map(|(gram, count)| (gram, *count)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(k);
        ranked
    }
}

/// N-grams of every user plus their counts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NGramReport {
    pub ngrams: BTreeMap<String, Vec<NGram>>,
    pub counts: NGramCounts,
}
