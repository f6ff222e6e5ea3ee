//! Per-method memo of past results, keyed by the hash of the argument bytes.
//!
//! Each method gets its own map, bounded to [`DEFAULT_MAX_RESULTS_PER_METHOD`]
//! entries. When a new key would overflow a method's map, the whole map is
//! dropped first; there is no partial trimming.
//!
//! The key is [`hash_bytes`](crate::utils::hash_bytes) of the encoded
//! arguments and nothing else. That fold is weak on short inputs, so two
//! different argument lists can share a key (for example `(1, 0)` and
//! `(7936, 0)` as `Int`s), and the second call is then answered with the
//! first call's result without running the callable. Callables that cannot
//! tolerate this should be marked [`skip_predict`](crate::callable::Callable::skip_predict).

use std::collections::HashMap;

use log::debug;

use crate::value::Value;

pub const DEFAULT_MAX_RESULTS_PER_METHOD: usize = 300;

pub struct ResultCache {
    methods: HashMap<String, HashMap<u64, Value>>,
    max_per_method: usize,
    hits: usize,
    misses: usize,
    flushes: usize,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RESULTS_PER_METHOD)
    }
}

impl ResultCache {
    /// Creates a cache holding up to `max_per_method` results per method.
    pub fn new(max_per_method: usize) -> Self {
        assert!(max_per_method > 0, "Result cache bound should be positive");
        Self {
            methods: HashMap::new(),
            max_per_method,
            hits: 0,
            misses: 0,
            flushes: 0,
        }
    }

    pub fn max_per_method(&self) -> usize {
        self.max_per_method
    }

    /// Number of results remembered for `method`.
    pub fn len(&self, method: &str) -> usize {
        self.methods.get(method).map_or(0, HashMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.methods.values().all(HashMap::is_empty)
    }

    pub fn hits(&self) -> usize {
        self.hits
    }
    pub fn misses(&self) -> usize {
        self.misses
    }
    /// Number of times a method's map was dropped on overflow.
    pub fn flushes(&self) -> usize {
        self.flushes
    }

    pub fn clear(&mut self) {
        self.methods.clear();
    }

    /// Looks up a result.
    pub fn get(&mut self, method: &str, key: u64) -> Option<&Value> {
        match self.methods.get(method).and_then(|m| m.get(&key)) {
            Some(v) => {
                self.hits += 1;
                Some(v)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Remembers a result, replacing any previous one for the same key.
    pub fn insert(&mut self, method: &str, key: u64, value: Value) {
        let results = self.methods.entry(method.to_owned()).or_default();

        if results.len() >= self.max_per_method && !results.contains_key(&key) {
            debug!(
                "result cache for `{}` is full ({} entries), flushing",
                method,
                results.len()
            );
            results.clear();
            self.flushes += 1;
        }
        results.insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_cache_basic() {
        let mut cache = ResultCache::default();

        cache.insert("f", 1, Value::Int(10));
        cache.insert("g", 1, Value::Int(20));

        assert_eq!(cache.get("f", 1), Some(&Value::Int(10)));
        assert_eq!(cache.get("g", 1), Some(&Value::Int(20)));
        assert_eq!(cache.get("f", 2), None);
        assert_eq!(cache.get("h", 1), None);

        assert_eq!(cache.hits(), 2);
        assert_eq!(cache.misses(), 2);
    }

    #[test]
    fn test_result_cache_overwrite() {
        let mut cache = ResultCache::default();
        cache.insert("f", 1, Value::Int(10));
        cache.insert("f", 1, Value::Int(11));
        assert_eq!(cache.len("f"), 1);
        assert_eq!(cache.get("f", 1), Some(&Value::Int(11)));
    }

    #[test]
    fn test_result_cache_wholesale_flush() {
        let mut cache = ResultCache::default();
        for key in 0..300 {
            cache.insert("f", key, Value::Long(key as i64));
        }
        cache.insert("g", 0, Value::Unit);
        assert_eq!(cache.len("f"), 300);

        // Re-inserting an existing key does not overflow.
        cache.insert("f", 7, Value::Int(7));
        assert_eq!(cache.len("f"), 300);
        assert_eq!(cache.flushes(), 0);

        cache.insert("f", 300, Value::Int(300));
        assert_eq!(cache.len("f"), 1);
        assert_eq!(cache.get("f", 300), Some(&Value::Int(300)));
        assert_eq!(cache.get("f", 0), None);
        assert_eq!(cache.flushes(), 1);

        // Other methods are untouched.
        assert_eq!(cache.len("g"), 1);
    }

    #[test]
    fn test_result_cache_custom_bound() {
        let mut cache = ResultCache::new(2);
        assert_eq!(cache.max_per_method(), 2);
        assert_eq!(ResultCache::default().max_per_method(), DEFAULT_MAX_RESULTS_PER_METHOD);

        cache.insert("f", 1, Value::Int(1));
        cache.insert("f", 2, Value::Int(2));
        assert_eq!(cache.len("f"), 2);
        cache.insert("f", 3, Value::Int(3));
        assert_eq!(cache.len("f"), 1);
        assert_eq!(cache.flushes(), 1);
    }

    #[test]
    fn test_result_cache_clear() {
        let mut cache = ResultCache::new(4);
        cache.insert("f", 1, Value::Int(1));
        assert!(!cache.is_empty());
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get("f", 1), None);
    }
}
