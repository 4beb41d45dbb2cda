//! Keyed async locks for projects and resources.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use staffline_core::{ProjectId, ResourceId};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Debug)]
struct KeyedLocks<K> {
    entries: Mutex<HashMap<K, Arc<AsyncMutex<()>>>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    fn entry(&self, key: &K) -> Arc<AsyncMutex<()>> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.entry(key.clone()).or_default().clone()
    }

    async fn lock(self: &Arc<Self>, key: &K) -> KeyGuard<K> {
        let guard = self.entry(key).lock_owned().await;
        KeyGuard {
            key: key.clone(),
            guard: Some(guard),
            owner: Arc::clone(self),
        }
    }

    /// Drop the entry for `key` unless someone still holds or waits on it.
    fn release(&self, key: &K) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.get(key).is_some_and(|m| Arc::strong_count(m) == 1) {
            entries.remove(key);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Exclusive hold on one project or resource, released on drop.
#[derive(Debug)]
pub struct KeyGuard<K: Eq + Hash + Clone> {
    key: K,
    guard: Option<OwnedMutexGuard<()>>,
    owner: Arc<KeyedLocks<K>>,
}

impl<K: Eq + Hash + Clone> Drop for KeyGuard<K> {
    fn drop(&mut self) {
        // Unlock first so the table's count only sees waiters.
        drop(self.guard.take());
        self.owner.release(&self.key);
    }
}

/// Process-wide locks serializing work on the same project or resource.
///
/// Resource locks are always taken in ascending ID order so two
/// transactions can never wait on each other.
#[derive(Debug, Clone, Default)]
pub struct LockTable {
    projects: Arc<KeyedLocks<ProjectId>>,
    resources: Arc<KeyedLocks<ResourceId>>,
}

impl LockTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a project.
    pub async fn lock_project(&self, id: &ProjectId) -> KeyGuard<ProjectId> {
        self.projects.lock(id).await
    }

    /// Wait for exclusive access to every listed resource.
    pub async fn lock_resources(&self, ids: &[ResourceId]) -> Vec<KeyGuard<ResourceId>> {
        let mut ordered = ids.to_vec();
        ordered.sort();
        ordered.dedup();

        let mut guards = Vec::with_capacity(ordered.len());
        for id in &ordered {
            guards.push(self.resources.lock(id).await);
        }
        guards
    }
}
