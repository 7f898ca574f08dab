//! Compute-once result cache
//!
//! Each extractor keeps one [`Memo`] per engine. The cached value is tagged
//! with the options that produced it, so asking again with the same options
//! returns the stored value and asking with different options recomputes.

use crate::error::ComputeError;
use tracing::debug;

#[derive(Debug, Clone)]
pub(crate) struct Memo<K, V> {
    engine: &'static str,
    entry: Option<(K, V)>,
}

impl<K, V> Memo<K, V>
where
    K: Clone + PartialEq,
{
    pub(crate) fn new(engine: &'static str) -> Self {
        Self {
            engine,
            entry: None,
        }
    }

    /// Cached value for `key`, computing and storing it on a miss.
    ///
    /// A failed computation leaves the previous entry in place.
    pub(crate) fn get_or_try_insert_with<F>(&mut self, key: &K, compute: F) -> Result<&V, ComputeError>
    where
        F: FnOnce() -> Result<V, ComputeError>,
    {
        match self.entry.take() {
            Some((cached_key, value)) if cached_key == *key => {
                debug!(engine = self.engine, "returning cached result");
                Ok(&self.entry.insert((cached_key, value)).1)
            }
            previous => {
                if previous.is_some() {
                    debug!(engine = self.engine, "options changed, recomputing");
                }
                match compute() {
                    Ok(value) => Ok(&self.entry.insert((key.clone(), value)).1),
                    Err(e) => {
                        self.entry = previous;
                        Err(e)
                    }
                }
            }
        }
    }

    /// Cached value if it was produced by `key`
    pub(crate) fn get_for(&self, key: &K) -> Option<&V> {
        match &self.entry {
            Some((cached_key, value)) if cached_key == key => Some(value),
            _ => None,
        }
    }

    /// Most recently cached value, whatever produced it
    pub(crate) fn get(&self) -> Option<&V> {
        self.entry.as_ref().map(|(_, value)| value)
    }

    pub(crate) fn clear(&mut self) {
        self.entry = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_compute_once_per_key() {
        let calls = Cell::new(0);
        let mut memo: Memo<u32, String> = Memo::new("test");
        let compute = |key: u32| {
            calls.set(calls.get() + 1);
            Ok::<_, ComputeError>(format!("value-{key}"))
        };

        assert_eq!(memo.get_or_try_insert_with(&1, || compute(1)).unwrap(), "value-1");
        assert_eq!(memo.get_or_try_insert_with(&1, || compute(1)).unwrap(), "value-1");
        assert_eq!(calls.get(), 1);

        assert_eq!(memo.get_or_try_insert_with(&2, || compute(2)).unwrap(), "value-2");
        assert_eq!(calls.get(), 2);
        assert!(memo.get_for(&1).is_none());
        assert_eq!(memo.get_for(&2).map(String::as_str), Some("value-2"));
    }

    #[test]
    fn test_failure_keeps_previous_entry() {
        let mut memo: Memo<u32, u32> = Memo::new("test");
        memo.get_or_try_insert_with(&1, || Ok(10)).unwrap();

        let result = memo.get_or_try_insert_with(&2, || {
            Err(ComputeError::InvalidArgument("boom".to_string()))
        });
        assert!(result.is_err());
        assert_eq!(memo.get_for(&1), Some(&10));

        memo.clear();
        assert!(memo.get().is_none());
    }
}
