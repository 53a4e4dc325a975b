//! Keyed mutual exclusion for controller-side resources.
//!
//! A lock key is `(resource_id, kind)`, so the same identifier can carry
//! independent locks of different kinds. Waiting is bounded; a caller that
//! cannot take the lock within the window gets a `Resource` error instead
//! of queueing forever. Guards release on drop, on every exit path.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

use crackd_core::{CrackdError, Result};

/// Lock kind guarding hash-file reads and rewrites.
pub const HASHFILE_LOCK: &str = "hashfile";

const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(30);

type LockKey = (String, String);

/// In-process lock table keyed by resource identifier and kind.
pub struct ResourceLockManager {
    locks: Mutex<HashMap<LockKey, Arc<AsyncMutex<()>>>>,
    max_wait: Duration,
}

/// Held lock; the resource is free again once this is dropped.
#[derive(Debug)]
pub struct LockGuard {
    _guard: OwnedMutexGuard<()>,
}

impl ResourceLockManager {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
            max_wait: DEFAULT_MAX_WAIT,
        }
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// Takes the lock for `(resource_id, kind)`, waiting at most the
    /// configured window.
    pub async fn acquire(&self, resource_id: &str, kind: &str) -> Result<LockGuard> {
        let entry = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            Arc::clone(
                locks
                    .entry((resource_id.to_string(), kind.to_string()))
                    .or_default(),
            )
        };

        match tokio::time::timeout(self.max_wait, entry.lock_owned()).await {
            Ok(guard) => {
                debug!(resource_id, kind, "lock acquired");
                Ok(LockGuard { _guard: guard })
            }
            Err(_) => Err(CrackdError::resource(format!(
                "timed out after {:?} waiting for {} lock on {}",
                self.max_wait, kind, resource_id
            ))),
        }
    }
}

impl Default for ResourceLockManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    #[tokio::test]
    async fn same_key_waits_until_released() {
        let manager = Arc::new(ResourceLockManager::new());
        let in_section = Arc::new(AtomicBool::new(false));
        let entries = Arc::new(AtomicU32::new(0));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let manager = Arc::clone(&manager);
            let in_section = Arc::clone(&in_section);
            let entries = Arc::clone(&entries);
            tasks.push(tokio::spawn(async move {
                let _guard = manager.acquire("hashes_AB12.list", HASHFILE_LOCK).await.unwrap();
                assert!(!in_section.swap(true, Ordering::SeqCst));
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_section.store(false, Ordering::SeqCst);
                entries.fetch_add(1, Ordering::SeqCst);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(entries.load(Ordering::SeqCst), 8);
    }

    #[tokio::test]
    async fn different_keys_do_not_block_each_other() {
        let manager = ResourceLockManager::new().with_max_wait(Duration::from_millis(50));
        let _a = manager.acquire("file.list", HASHFILE_LOCK).await.unwrap();
        // Same id, different kind.
        let _b = manager.acquire("file.list", "wordlist").await.unwrap();
        // Different id, same kind.
        let _c = manager.acquire("other.list", HASHFILE_LOCK).await.unwrap();
    }

    #[tokio::test]
    async fn bounded_wait_yields_resource_error() {
        let manager = ResourceLockManager::new().with_max_wait(Duration::from_millis(20));
        let guard = manager.acquire("file.list", HASHFILE_LOCK).await.unwrap();

        let err = manager
            .acquire("file.list", HASHFILE_LOCK)
            .await
            .unwrap_err();
        assert!(matches!(err, CrackdError::Resource(_)));

        drop(guard);
        manager.acquire("file.list", HASHFILE_LOCK).await.unwrap();
    }

    #[tokio::test]
    async fn guard_releases_on_early_return() {
        let manager = ResourceLockManager::new().with_max_wait(Duration::from_millis(50));

        async fn failing_section(manager: &ResourceLockManager) -> Result<()> {
            let _guard = manager.acquire("file.list", HASHFILE_LOCK).await?;
            Err(CrackdError::internal("boom"))
        }

        failing_section(&manager).await.unwrap_err();
        manager.acquire("file.list", HASHFILE_LOCK).await.unwrap();
    }
}
