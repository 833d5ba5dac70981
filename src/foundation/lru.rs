use std::hash::Hash;
use std::num::NonZeroUsize;

use lru::LruCache;

/// [`LruCache`] that counts how many entries it has pushed out.
pub(crate) struct BoundedLru<K, V> {
    cache: LruCache<K, V>,
    evictions: u64,
}

impl<K, V> BoundedLru<K, V>
where
    K: Copy + Eq + Hash,
{
    /// `capacity` is clamped to at least 1.
    pub(crate) fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
            evictions: 0,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.cache.cap().get()
    }

    pub(crate) fn len(&self) -> usize {
        self.cache.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub(crate) fn evictions(&self) -> u64 {
        self.evictions
    }

    pub(crate) fn contains(&self, key: &K) -> bool {
        self.cache.contains(key)
    }

    /// Lookup and mark `key` most recently used.
    pub(crate) fn get(&mut self, key: &K) -> Option<&V> {
        self.cache.get(key)
    }

    /// Lookup without changing recency.
    pub(crate) fn peek(&self, key: &K) -> Option<&V> {
        self.cache.peek(key)
    }

    /// Insert or replace `key` as most recently used, returning the entry evicted to make room.
    pub(crate) fn put(&mut self, key: K, value: V) -> Option<(K, V)> {
        match self.cache.push(key, value) {
            Some((old, _)) if old == key => None,
            Some(evicted) => {
                self.evictions += 1;
                Some(evicted)
            }
            None => None,
        }
    }

    /// Keys from least to most recently used.
    pub(crate) fn keys_by_recency(&self) -> impl Iterator<Item = &K> {
        self.cache.iter().rev().map(|(k, _)| k)
    }

    pub(crate) fn values(&self) -> impl Iterator<Item = &V> {
        self.cache.iter().map(|(_, v)| v)
    }

    pub(crate) fn clear(&mut self) {
        self.cache.clear();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/lru.rs"]
mod tests;
