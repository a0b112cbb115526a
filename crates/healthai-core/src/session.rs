//! Active identity tracking.
//!
//! The session is the single source of truth for who is using the app. It is
//! persisted in the global cache partition so it survives a restart.

use log::{error, info};
use std::sync::{Arc, RwLock};

use crate::cache::{CacheStore, Partition, ACTIVE_EMAIL_KEY};

#[derive(Clone)]
pub struct IdentitySession {
    store: CacheStore,
    active: Arc<RwLock<Option<String>>>,
}

impl IdentitySession {
    /// Load the persisted identity, if any.
    pub fn restore(store: CacheStore) -> Self {
        let persisted: Option<String> = store.get(&Partition::Global, ACTIVE_EMAIL_KEY, None);
        let active = persisted.and_then(|identity| normalize(&identity));
        Self {
            store,
            active: Arc::new(RwLock::new(active)),
        }
    }

    /// Current identity, or `None` when signed out.
    pub fn current(&self) -> Option<String> {
        match self.active.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.current().is_some()
    }

    /// Store and persist `identity`. Blank input clears the session.
    pub fn set_active(&self, identity: &str) {
        let Some(identity) = normalize(identity) else {
            self.clear_active();
            return;
        };

        if let Err(e) = self
            .store
            .set(&Partition::Global, ACTIVE_EMAIL_KEY, &identity)
        {
            error!("Failed to persist active identity: {}", e);
        }
        info!("Active identity set to {}", identity);
        self.replace(Some(identity));
    }

    /// Forget the identity locally. Never blocked by the network.
    pub fn clear_active(&self) {
        if let Err(e) = self.store.remove(&Partition::Global, ACTIVE_EMAIL_KEY) {
            error!("Failed to clear persisted identity: {}", e);
        }
        self.replace(None);
    }

    fn replace(&self, value: Option<String>) {
        match self.active.write() {
            Ok(mut guard) => *guard = value,
            Err(poisoned) => *poisoned.into_inner() = value,
        }
    }
}

/// Identities are trimmed, lowercase emails.
pub fn normalize(identity: &str) -> Option<String> {
    let trimmed = identity.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_CACHE_PREFIX;
    use crate::db::Database;

    fn setup_store() -> CacheStore {
        CacheStore::new(Database::open_in_memory().unwrap(), DEFAULT_CACHE_PREFIX)
    }

    #[test]
    fn test_starts_empty() {
        let session = IdentitySession::restore(setup_store());
        assert_eq!(session.current(), None);
        assert!(!session.is_active());
    }

    #[test]
    fn test_set_normalizes() {
        let session = IdentitySession::restore(setup_store());
        session.set_active("  Pat@Example.COM ");
        assert_eq!(session.current(), Some("pat@example.com".into()));
    }

    #[test]
    fn test_blank_identity_clears() {
        let session = IdentitySession::restore(setup_store());
        session.set_active("pat@example.com");
        session.set_active("   ");
        assert_eq!(session.current(), None);
    }

    #[test]
    fn test_clones_share_state() {
        let session = IdentitySession::restore(setup_store());
        let other = session.clone();
        session.set_active("pat@example.com");
        assert_eq!(other.current(), Some("pat@example.com".into()));
    }

    #[test]
    fn test_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");

        {
            let store = CacheStore::new(Database::open(&path).unwrap(), DEFAULT_CACHE_PREFIX);
            IdentitySession::restore(store).set_active("pat@example.com");
        }

        let store = CacheStore::new(Database::open(&path).unwrap(), DEFAULT_CACHE_PREFIX);
        let session = IdentitySession::restore(store.clone());
        assert_eq!(session.current(), Some("pat@example.com".into()));

        session.clear_active();
        let session = IdentitySession::restore(store);
        assert_eq!(session.current(), None);
    }
}
