//! Per-account refresh locks.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::Mutex;

use super::model::AccountKey;

/// Registry handing out one mutex per account key.
///
/// Exactly one mutex instance exists per key for the life of the
/// registry, so refreshes for the same account serialize on the same
/// lock no matter which caller created it. The registry grows with
/// distinct keys and never evicts.
#[derive(Debug, Default)]
pub struct AccountLockRegistry {
    locks: RwLock<HashMap<AccountKey, Arc<Mutex<()>>>>,
}

impl AccountLockRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the mutex for `key`, creating it on first use.
    #[must_use]
    pub fn lock_for(&self, key: &AccountKey) -> Arc<Mutex<()>> {
        if let Some(lock) = self
            .locks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
        {
            return Arc::clone(lock);
        }

        let mut locks = self.locks.write().unwrap_or_else(PoisonError::into_inner);
        // Recheck under the write lock: another caller may have inserted
        // the entry while this one waited to upgrade.
        Arc::clone(locks.entry(key.clone()).or_default())
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::super::model::AccountId;
    use super::*;
    use mailbridge_oauth::ProviderType;

    fn key(id: i64) -> AccountKey {
        AccountKey::new(ProviderType::Gmail, AccountId::new(id))
    }

    #[test]
    fn test_same_key_same_lock() {
        let registry = AccountLockRegistry::new();
        let a = registry.lock_for(&key(1));
        let b = registry.lock_for(&key(1));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_distinct_keys_distinct_locks() {
        let registry = AccountLockRegistry::new();
        let a = registry.lock_for(&key(1));
        let b = registry.lock_for(&key(2));
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_first_access_creates_one_lock() {
        let registry = Arc::new(AccountLockRegistry::new());

        let mut handles = Vec::new();
        for _ in 0..32 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(
                async move { registry.lock_for(&key(7)) },
            ));
        }

        let mut locks = Vec::new();
        for handle in handles {
            locks.push(handle.await.unwrap());
        }

        for lock in &locks {
            assert!(Arc::ptr_eq(lock, &locks[0]));
        }
        assert_eq!(registry.len(), 1);
    }
}
