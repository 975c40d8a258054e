use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;

#[derive(Debug, Default)]
struct CacheState {
    /// Bumped by every clear
    generation: u64,
    entries: HashMap<(String, String), Value>,
}

/// Short-lived memo of resolved single-value lookups, keyed by `(owner, key)`.
///
/// The store clears it wholesale on every write. A value resolved across an
/// await point is inserted only if no clear happened in between: take
/// [`ValueCache::generation`] before reading the store and hand it to
/// [`ValueCache::insert`].
#[derive(Debug, Default)]
pub struct ValueCache {
    state: Mutex<CacheState>,
}

impl ValueCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, owner: &str, key: &str) -> Option<Value> {
        self.state().entries.get(&(owner.to_string(), key.to_string())).cloned()
    }

    pub fn generation(&self) -> u64 {
        self.state().generation
    }

    /// Memoize `value` if the cache was not cleared since `generation` was
    /// taken. Returns whether the value was stored.
    pub fn insert(&self, generation: u64, owner: &str, key: &str, value: Value) -> bool {
        let mut state = self.state();
        if state.generation != generation {
            return false;
        }
        state.entries.insert((owner.to_string(), key.to_string()), value);
        true
    }

    pub fn clear(&self) {
        let mut state = self.state();
        state.generation = state.generation.wrapping_add(1);
        state.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
