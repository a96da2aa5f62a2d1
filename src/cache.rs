use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{PoisonError, RwLock};

/// Memo table for one calculation, keyed by a value type such as
/// `(u8, Composition)`. Counts hits and misses so the callers can report how
/// well the recursion collapses.
#[derive(Debug, Clone)]
pub struct ResultCache<K, V> {
    data: HashMap<K, V>,
    hits: u64,
    misses: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl<K: Eq + Hash, V: Copy> ResultCache<K, V> {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: HashMap::with_capacity(capacity),
            hits: 0,
            misses: 0,
        }
    }

    pub fn get(&mut self, key: &K) -> Option<V> {
        match self.data.get(key) {
            Some(value) => {
                self.hits += 1;
                Some(*value)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.data.insert(key, value);
    }

    pub fn contains_state(&self, key: &K) -> bool {
        self.data.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.hits = 0;
        self.misses = 0;
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.data.len(),
        }
    }
}

impl<K: Eq + Hash, V: Copy> Default for ResultCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// A cache several threads may fill at once. Each insert happens under the
/// write lock, and the first value stored for a key wins.
#[derive(Debug, Default)]
pub struct SharedCache<K, V> {
    data: RwLock<HashMap<K, V>>,
}

impl<K: Eq + Hash, V: Copy> SharedCache<K, V> {
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        data.get(key).copied()
    }

    /// Stores `value` unless another thread got there first, and returns the
    /// value now held for `key`.
    pub fn insert(&self, key: K, value: V) -> V {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        *data.entry(key).or_insert(value)
    }

    pub fn len(&self) -> usize {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
