//! Async locks keyed by id

use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per key, created on demand
#[derive(Debug)]
pub struct KeyedLocks<K: Eq + Hash> {
    locks: DashMap<K, Arc<Mutex<()>>>,
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    /// Acquire the lock for `key`, holding it until the guard is dropped
    pub async fn lock(&self, key: K) -> OwnedMutexGuard<()> {
        let mutex = self.locks.entry(key).or_default().clone();
        mutex.lock_owned().await
    }

    /// Drop entries nobody holds or waits on
    pub fn prune(&self) {
        self.locks.retain(|_, mutex| Arc::strong_count(mutex) > 1);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl<K: Eq + Hash + Clone> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self::new()
    }
}
