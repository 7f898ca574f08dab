//! Run-length compression of one token

/// Collapse every maximal run of `target` into a single `target_k` token.
///
/// Runs of length one become `target_1`; other tokens pass through.
pub fn compress(sequence: &[String], target: &str) -> Vec<String> {
    let mut compressed = Vec::with_capacity(sequence.len());
    let mut run = 0usize;

    for token in sequence {
        if token == target {
            run += 1;
            continue;
        }
        if run > 0 {
            compressed.push(format!("{target}_{run}"));
            run = 0;
        }
        compressed.push(token.clone());
    }
    if run > 0 {
        compressed.push(format!("{target}_{run}"));
    }

    compressed
}
