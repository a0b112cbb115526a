//! Namespaced JSON cache over the local database.
//!
//! Keys are composed as `{prefix}_{identity}_{logical_key}`, so switching
//! identity yields disjoint data without any migration. The global partition
//! (`{prefix}_{logical_key}`) holds data that outlives a single identity.

use log::{error, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::db::{Database, DbError, DbResult};

pub const MEDICATIONS_KEY: &str = "medications";
pub const ADHERENCE_KEY: &str = "adherence";
pub const HEALTH_LOGS_KEY: &str = "health_logs";
pub const USER_PROFILE_KEY: &str = "user_profile";
pub const EMULATED_USERS_KEY: &str = "emulated_users";
pub const ACTIVE_EMAIL_KEY: &str = "active_email";

/// Which namespace a logical key lives in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Partition {
    Global,
    Identity(String),
}

impl Partition {
    pub fn identity(identity: impl Into<String>) -> Self {
        Partition::Identity(identity.into())
    }
}

/// Shared handle to the durable cache.
#[derive(Clone)]
pub struct CacheStore {
    db: Arc<Mutex<Database>>,
    prefix: String,
}

impl CacheStore {
    pub fn new(db: Database, prefix: impl Into<String>) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Compose the physical key for a logical key.
    pub fn compose_key(&self, partition: &Partition, key: &str) -> String {
        match partition {
            Partition::Global => format!("{}_{}", self.prefix, key),
            Partition::Identity(identity) => format!("{}_{}_{}", self.prefix, identity, key),
        }
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Database>> {
        self.db
            .lock()
            .map_err(|e| DbError::Poisoned(e.to_string()))
    }

    /// Read a value, falling back to `default` when the entry is absent,
    /// unreadable or not valid JSON for `T`. Never fails.
    pub fn get<T: DeserializeOwned>(&self, partition: &Partition, key: &str, default: T) -> T {
        let full_key = self.compose_key(partition, key);
        let raw = match self.lock().and_then(|db| db.get_cache_entry(&full_key)) {
            Ok(raw) => raw,
            Err(e) => {
                error!("Cache read failed for {}: {}", full_key, e);
                return default;
            }
        };

        match raw {
            Some(text) if !text.is_empty() && text != "undefined" => {
                match serde_json::from_str(&text) {
                    Ok(value) => value,
                    Err(e) => {
                        warn!("Ignoring malformed cache entry {}: {}", full_key, e);
                        default
                    }
                }
            }
            _ => default,
        }
    }

    /// Overwrite a value. Completes before returning.
    pub fn set<T: Serialize + ?Sized>(
        &self,
        partition: &Partition,
        key: &str,
        value: &T,
    ) -> DbResult<()> {
        let full_key = self.compose_key(partition, key);
        let json = serde_json::to_string(value)?;
        self.lock()?.put_cache_entry(&full_key, &json)
    }

    /// Remove one logical key.
    pub fn remove(&self, partition: &Partition, key: &str) -> DbResult<bool> {
        let full_key = self.compose_key(partition, key);
        self.lock()?.delete_cache_entry(&full_key)
    }

    /// Remove every entry belonging to this application, across all
    /// identities and the global partition. Unrelated keys are untouched.
    pub fn clear_all(&self) -> DbResult<usize> {
        let prefix = format!("{}_", self.prefix);
        self.lock()?.delete_cache_entries_with_prefix(&prefix)
    }

    /// Remove one identity's partition.
    pub fn clear_identity(&self, identity: &str) -> DbResult<usize> {
        let prefix = format!("{}_{}_", self.prefix, identity);
        self.lock()?.delete_cache_entries_with_prefix(&prefix)
    }

    /// All physical keys owned by this application.
    pub fn keys(&self) -> DbResult<Vec<String>> {
        let prefix = format!("{}_", self.prefix);
        self.lock()?.list_cache_keys(&prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_CACHE_PREFIX;
    use crate::models::{Medication, NewMedication};

    fn setup_store() -> CacheStore {
        CacheStore::new(Database::open_in_memory().unwrap(), DEFAULT_CACHE_PREFIX)
    }

    fn pat() -> Partition {
        Partition::identity("pat@example.com")
    }

    #[test]
    fn test_key_composition() {
        let store = setup_store();
        assert_eq!(
            store.compose_key(&pat(), MEDICATIONS_KEY),
            "health_ai_cache_pat@example.com_medications"
        );
        assert_eq!(
            store.compose_key(&Partition::Global, EMULATED_USERS_KEY),
            "health_ai_cache_emulated_users"
        );
    }

    #[test]
    fn test_round_trip() {
        let store = setup_store();
        let meds = vec![Medication::new(
            NewMedication {
                name: "Atorvastatin".into(),
                remaining: 30,
                total: 30,
                ..Default::default()
            },
            "p1".into(),
        )];

        store.set(&pat(), MEDICATIONS_KEY, &meds).unwrap();
        let loaded: Vec<Medication> = store.get(&pat(), MEDICATIONS_KEY, Vec::new());
        assert_eq!(loaded, meds);
    }

    #[test]
    fn test_unset_key_returns_default() {
        let store = setup_store();
        let loaded: Vec<Medication> = store.get(&pat(), MEDICATIONS_KEY, Vec::new());
        assert!(loaded.is_empty());

        let profile: Option<String> = store.get(&pat(), USER_PROFILE_KEY, None);
        assert!(profile.is_none());
    }

    #[test]
    fn test_malformed_entry_treated_as_absent() {
        let store = setup_store();
        let key = store.compose_key(&pat(), MEDICATIONS_KEY);
        {
            let db = store.lock().unwrap();
            db.put_cache_entry(&key, "{not json").unwrap();
        }

        let loaded: Vec<Medication> = store.get(&pat(), MEDICATIONS_KEY, Vec::new());
        assert!(loaded.is_empty());

        {
            let db = store.lock().unwrap();
            db.put_cache_entry(&key, "undefined").unwrap();
        }
        let loaded: Vec<Medication> = store.get(&pat(), MEDICATIONS_KEY, Vec::new());
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_wrong_shape_treated_as_absent() {
        let store = setup_store();
        store.set(&pat(), MEDICATIONS_KEY, &42).unwrap();

        let loaded: Vec<Medication> = store.get(&pat(), MEDICATIONS_KEY, Vec::new());
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_identities_are_disjoint() {
        let store = setup_store();
        store.set(&pat(), ADHERENCE_KEY, &vec!["a"]).unwrap();

        let other: Vec<String> =
            store.get(&Partition::identity("sam@example.com"), ADHERENCE_KEY, Vec::new());
        assert!(other.is_empty());
    }

    #[test]
    fn test_clear_identity_is_narrow() {
        let store = setup_store();
        let sam = Partition::identity("sam@example.com");
        store.set(&pat(), MEDICATIONS_KEY, &vec![1]).unwrap();
        store.set(&sam, MEDICATIONS_KEY, &vec![2]).unwrap();
        store.set(&Partition::Global, EMULATED_USERS_KEY, &vec![3]).unwrap();

        assert_eq!(store.clear_identity("pat@example.com").unwrap(), 1);

        assert_eq!(store.get(&pat(), MEDICATIONS_KEY, Vec::<i32>::new()), Vec::<i32>::new());
        assert_eq!(store.get(&sam, MEDICATIONS_KEY, Vec::<i32>::new()), vec![2]);
        assert_eq!(
            store.get(&Partition::Global, EMULATED_USERS_KEY, Vec::<i32>::new()),
            vec![3]
        );
    }

    #[test]
    fn test_clear_all_spares_foreign_keys() {
        let store = setup_store();
        store.set(&pat(), MEDICATIONS_KEY, &vec![1]).unwrap();
        store.set(&Partition::Global, ACTIVE_EMAIL_KEY, "pat@example.com").unwrap();
        {
            let db = store.lock().unwrap();
            db.put_cache_entry("other_app_setting", "1").unwrap();
        }

        assert_eq!(store.clear_all().unwrap(), 2);
        assert!(store.keys().unwrap().is_empty());

        let db = store.lock().unwrap();
        assert_eq!(db.get_cache_entry("other_app_setting").unwrap(), Some("1".into()));
    }
}
