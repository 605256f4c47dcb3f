use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{Mutex, OwnedMutexGuard};

/// In-process registry of named exclusive locks.
///
/// Hands out one async mutex per key; holding the returned guard serialises
/// every caller that asked for the same key while leaving all other keys
/// untouched. Snapshot creation uses this with a
/// `product_version:{project}:{lowercase name}` key so that only one
/// creation attempt per name can be in flight at a time.
///
/// Clones share the same registry. The store assumes a single backing
/// process, so an in-process lock is sufficient; a multi-node deployment
/// would swap this for a lock backed by the shared store.
#[derive(Clone, Default)]
pub struct NamedLockRegistry {
    locks: Arc<StdMutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl NamedLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the exclusive lock for `key`, waiting if it is held.
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            locks
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_key_is_exclusive() {
        let registry = NamedLockRegistry::new();
        let guard = registry.acquire("project:release-1").await;

        let contender = registry.clone();
        let attempt = tokio::spawn(async move { contender.acquire("project:release-1").await });

        // The second acquire cannot complete while the guard is held.
        tokio::task::yield_now().await;
        assert!(!attempt.is_finished());

        drop(guard);
        attempt.await.expect("lock task panicked");
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let registry = NamedLockRegistry::new();
        let _guard = registry.acquire("project-a:release-1").await;
        let other = registry.acquire("project-b:release-1").await;
        drop(other);
    }
}
