//! Bounded insertion-ordered cache
//!
//! Entries live in a `DashMap` so reads never block each other; insertion
//! order is tracked in a mutex-guarded queue. Every mutation (insert, evict,
//! reorder) happens inside the one critical section so the map and the queue
//! never disagree about which keys are cached.

use std::collections::VecDeque;
use std::hash::Hash;
use std::sync::{Mutex, PoisonError};

use dashmap::DashMap;

/// Default number of entries kept by a field-path cache
pub const DEFAULT_CACHE_CAPACITY: usize = 500;

/// Fixed-capacity cache evicting the oldest inserted key
pub struct LimitedCache<K, V> {
    capacity: usize,
    entries: DashMap<K, V>,
    order: Mutex<VecDeque<K>>,
}

impl<K, V> LimitedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a cache holding at most `capacity` entries; 0 disables storage
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: DashMap::with_capacity(capacity),
            order: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Look up a cached value
    pub fn load(&self, key: &K) -> Option<V> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Insert or replace a value
    ///
    /// Replacing an existing key moves it to the most recent position.
    /// Inserting a new key at capacity evicts the oldest key first.
    pub fn store(&self, key: K, value: V) {
        if self.capacity == 0 {
            return;
        }

        let mut order = self.order.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(position) = order.iter().position(|k| k == &key) {
            order.remove(position);
        } else if order.len() >= self.capacity {
            if let Some(oldest) = order.pop_front() {
                self.entries.remove(&oldest);
            }
        }

        order.push_back(key.clone());
        self.entries.insert(key, value);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<K, V> Default for LimitedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
