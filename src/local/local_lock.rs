use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use dashmap::{DashMap, mapref::entry::Entry};

use crate::{BoxError, Lock, LockDecision, Release};

/// In-process lock over a concurrent map.
///
/// # Semantics
///
/// - **Atomic acquire:** the check and the insert happen under one shard lock
///   through the map's entry API, so racing callers get exactly one grant.
/// - **Token-checked release:** every grant stores a fresh token, and its
///   [`Release`] only removes the entry if that token is still there.
/// - **No lease:** a key stays held until its [`Release`] runs. Since dropping
///   the release frees the key, a lock only outlives its holder if the release
///   is leaked on purpose (e.g. `mem::forget`).
///
/// Clones share the same map.
#[derive(Clone, Debug, Default)]
pub struct LocalLock {
    locks: Arc<DashMap<String, u64>>,
    next_token: Arc<AtomicU64>,
}

impl LocalLock {
    /// Create an empty lock table.
    pub fn new() -> Self {
        Self::default()
    } // end constructor

    /// Take `key` if it is free.
    ///
    /// Returns the [`Release`] for the grant, or `None` when the key is held.
    pub fn try_lock(&self, key: &str) -> Option<Release> {
        match self.locks.entry(key.to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(entry) => {
                let token = self.next_token.fetch_add(1, Ordering::Relaxed);
                entry.insert(token);

                let locks = Arc::clone(&self.locks);
                let key = key.to_string();

                Some(Release::new(move || {
                    locks.remove_if(&key, |_, held| *held == token);
                }))
            }
        }
    } // end method try_lock

    /// Whether `key` is currently held.
    pub fn is_locked(&self, key: &str) -> bool {
        self.locks.contains_key(key)
    }

    /// Number of held keys.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether no key is held.
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    /// Drop `key` regardless of who holds it.
    ///
    /// The holder's [`Release`] becomes a no-op for the old grant.
    pub fn force_unlock(&self, key: &str) -> bool {
        self.locks.remove(key).is_some()
    }
} // end of impl

#[async_trait]
impl<C: Sync> Lock<C> for LocalLock {
    async fn lock(&self, key: &str, _ctx: &C) -> Result<LockDecision, BoxError> {
        Ok(match self.try_lock(key) {
            Some(release) => LockDecision::Granted(release),
            None => LockDecision::Denied,
        })
    }
}
