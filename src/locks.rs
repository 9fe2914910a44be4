//! Process-wide keyed locks for resource handlers.
//!
//! Resource handlers that mutate a shared cloud object (for example two
//! subnets inside one virtual network) serialize on the shared object's ID:
//!
//! ```rust,ignore
//! let locks = ResourceMutexRegistry::global();
//! let _guard = locks.lock(&vnet_id).await;
//! // read-modify-write the virtual network
//! ```
//!
//! Entries are created on first use and live for the rest of the process.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

use crate::error::{Error, Result};

static GLOBAL_REGISTRY: Lazy<ResourceMutexRegistry> = Lazy::new(ResourceMutexRegistry::new);

/// Map from arbitrary string keys to async locks.
///
/// Two operations holding the same key never overlap; different keys never
/// block each other.
#[derive(Default)]
pub struct ResourceMutexRegistry {
    /// One lock per key, never removed
    entries: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    /// Guards taken with [`lock_detached`](Self::lock_detached)
    held: Mutex<HashMap<String, OwnedMutexGuard<()>>>,
}

impl ResourceMutexRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by every resource handler in the process.
    pub fn global() -> &'static ResourceMutexRegistry {
        &GLOBAL_REGISTRY
    }

    fn entry(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut entries = self.entries.lock();
        entries
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Acquire the lock for `key`, waiting until it is free.
    ///
    /// The lock is released when the returned guard is dropped.
    pub async fn lock(&self, key: &str) -> ResourceLockGuard {
        debug!(key = %key, "Locking resource");
        let guard = self.entry(key).lock_owned().await;
        debug!(key = %key, "Locked resource");

        ResourceLockGuard {
            key: key.to_string(),
            _guard: guard,
        }
    }

    /// Acquire the lock for `key` without a guard.
    ///
    /// The lock stays held until [`unlock`](Self::unlock) is called with the
    /// same key.
    pub async fn lock_detached(&self, key: &str) {
        debug!(key = %key, "Locking resource");
        let guard = self.entry(key).lock_owned().await;
        self.held.lock().insert(key.to_string(), guard);
        debug!(key = %key, "Locked resource");
    }

    /// Release a lock taken with [`lock_detached`](Self::lock_detached).
    pub fn unlock(&self, key: &str) -> Result<()> {
        match self.held.lock().remove(key) {
            Some(guard) => {
                drop(guard);
                debug!(key = %key, "Unlocked resource");
                Ok(())
            }
            None => Err(Error::LockNotHeld(key.to_string())),
        }
    }

    /// Returns true if the lock for `key` is currently held.
    pub fn is_locked(&self, key: &str) -> bool {
        self.entries
            .lock()
            .get(key)
            .is_some_and(|lock| lock.try_lock().is_err())
    }

    /// Number of keys that have ever been locked.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if no key has ever been locked.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// Scoped hold on a resource lock; dropping it releases the lock.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct ResourceLockGuard {
    key: String,
    _guard: OwnedMutexGuard<()>,
}

impl ResourceLockGuard {
    /// The key this guard holds.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for ResourceLockGuard {
    fn drop(&mut self) {
        debug!(key = %self.key, "Unlocked resource");
    }
}

impl std::fmt::Debug for ResourceLockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceLockGuard")
            .field("key", &self.key)
            .finish()
    }
}
