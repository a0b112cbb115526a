//! Best-effort remote access with transparent cache fallback.

use log::{debug, error, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheStore, Partition};
use crate::config::CoreConfig;
use crate::models::{
    reminders_valid, AdherenceRecord, HealthLog, Medication, NewHealthLog, NewMedication,
    Reminder, UserProfile,
};
use crate::remote::{Collection, RemoteBackend, RemoteError, RemoteResult};
use crate::session::IdentitySession;

use super::reconcile::{reconcile_adherence, reconcile_by_id, reconcile_profile};

/// Mediates between callers, the local cache and a remote backend.
///
/// Data operations never fail from the caller's point of view: with no
/// active identity reads are empty and writes are no-ops, and remote failures
/// degrade to the cached value. Only the auth operations return errors.
#[derive(Clone)]
pub struct SyncGateway {
    pub(super) store: CacheStore,
    pub(super) session: IdentitySession,
    pub(super) backend: Arc<dyn RemoteBackend>,
    pub(super) request_timeout: Duration,
    probe_timeout: Duration,
}

impl SyncGateway {
    pub fn new(
        store: CacheStore,
        session: IdentitySession,
        backend: Arc<dyn RemoteBackend>,
        config: &CoreConfig,
    ) -> Self {
        Self {
            store,
            session,
            backend,
            request_timeout: config.request_timeout(),
            probe_timeout: config.probe_timeout(),
        }
    }

    pub fn session(&self) -> &IdentitySession {
        &self.session
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Run a remote call under the data-operation timeout.
    pub(super) async fn bounded<T, F>(&self, call: F) -> RemoteResult<T>
    where
        F: Future<Output = RemoteResult<T>>,
    {
        match tokio::time::timeout(self.request_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::Timeout),
        }
    }

    /// Liveness probe driving the UI's offline indicator. Never fails.
    pub async fn is_online(&self) -> bool {
        tokio::time::timeout(self.probe_timeout, self.backend.probe_liveness())
            .await
            .unwrap_or(false)
    }

    // =========================================================================
    // Generic read/write contracts
    // =========================================================================

    async fn fetch<T: DeserializeOwned>(
        &self,
        collection: Collection,
        identity: &str,
    ) -> RemoteResult<T> {
        let value = self
            .bounded(self.backend.fetch_collection(collection, identity))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn read_through<T, F>(&self, collection: Collection, default: T, merge: F) -> T
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(T, T) -> T,
    {
        let Some(identity) = self.session.current() else {
            return default;
        };
        let partition = Partition::identity(identity.as_str());
        let fetched = self.fetch::<T>(collection, &identity).await;

        // Read the cache only once the fetch has settled so writes that
        // landed while it was in flight take part in the merge.
        let local: T = self.store.get(&partition, collection.cache_key(), default);
        match fetched {
            Ok(remote) => {
                let merged = merge(local, remote);
                if let Err(e) = self.store.set(&partition, collection.cache_key(), &merged) {
                    error!("Failed to cache merged {}: {}", collection, e);
                }
                debug!("Reconciled {} for {}", collection, identity);
                merged
            }
            Err(e) => {
                log_degraded(collection, "read", &e);
                local
            }
        }
    }

    async fn write_through<T: Serialize + ?Sized>(&self, collection: Collection, value: &T) {
        let Some(identity) = self.session.current() else {
            debug!("Ignoring {} write with no active identity", collection);
            return;
        };
        let partition = Partition::identity(identity.as_str());

        // The cache write lands before the first await so a following read
        // of this collection sees it even while the upsert is in flight.
        if let Err(e) = self.store.set(&partition, collection.cache_key(), value) {
            error!("Failed to cache {}: {}", collection, e);
        }

        let payload = match serde_json::to_value(value) {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to encode {} for upload: {}", collection, e);
                return;
            }
        };

        match self
            .bounded(self.backend.upsert_collection(collection, &identity, payload))
            .await
        {
            Ok(()) => debug!("Uploaded {} for {}", collection, identity),
            Err(e) => log_degraded(collection, "write", &e),
        }
    }

    fn cached<T: DeserializeOwned>(&self, collection: Collection, default: T) -> T {
        match self.session.current() {
            Some(identity) => self.store.get(
                &Partition::identity(identity),
                collection.cache_key(),
                default,
            ),
            None => default,
        }
    }

    // =========================================================================
    // Collections
    // =========================================================================

    pub async fn get_medications(&self) -> Vec<Medication> {
        self.read_through(Collection::Medications, Vec::new(), |local, remote| {
            reconcile_by_id(&local, &remote)
        })
        .await
    }

    pub async fn save_medications(&self, medications: &[Medication]) {
        self.write_through(Collection::Medications, medications).await
    }

    pub async fn get_adherence(&self) -> Vec<AdherenceRecord> {
        self.read_through(Collection::Adherence, Vec::new(), |local, remote| {
            reconcile_adherence(&local, &remote)
        })
        .await
    }

    pub async fn save_adherence(&self, records: &[AdherenceRecord]) {
        self.write_through(Collection::Adherence, records).await
    }

    pub async fn get_logs(&self) -> Vec<HealthLog> {
        self.read_through(Collection::Logs, Vec::new(), |local, remote| {
            reconcile_by_id(&local, &remote)
        })
        .await
    }

    pub async fn save_logs(&self, logs: &[HealthLog]) {
        self.write_through(Collection::Logs, logs).await
    }

    pub async fn get_user_profile(&self) -> Option<UserProfile> {
        self.read_through(Collection::Profile, None, reconcile_profile)
            .await
    }

    pub async fn save_user_profile(&self, profile: &UserProfile) {
        self.write_through(Collection::Profile, profile).await
    }

    /// Cached medications without touching the network.
    pub fn cached_medications(&self) -> Vec<Medication> {
        self.cached(Collection::Medications, Vec::new())
    }

    pub fn cached_adherence(&self) -> Vec<AdherenceRecord> {
        self.cached(Collection::Adherence, Vec::new())
    }

    pub fn cached_logs(&self) -> Vec<HealthLog> {
        self.cached(Collection::Logs, Vec::new())
    }

    pub fn cached_profile(&self) -> Option<UserProfile> {
        self.cached(Collection::Profile, None)
    }

    // =========================================================================
    // Record-level operations
    // =========================================================================

    fn active_profile_id(&self) -> String {
        self.cached_profile().map(|p| p.id).unwrap_or_default()
    }

    /// Add one medication under the active profile.
    pub async fn add_medication(&self, fields: NewMedication) -> Option<Medication> {
        self.import_medications(vec![fields]).await.into_iter().next()
    }

    /// Add a batch of medications, e.g. from a prescription scan. Entries with
    /// a malformed reminder time are skipped.
    pub async fn import_medications(&self, batch: Vec<NewMedication>) -> Vec<Medication> {
        if !self.session.is_active() {
            return Vec::new();
        }
        let profile_id = self.active_profile_id();
        let added: Vec<Medication> = batch
            .into_iter()
            .filter(|fields| {
                let valid = reminders_valid(&fields.reminders);
                if !valid {
                    warn!("Skipping {}: reminder time is not HH:MM", fields.name);
                }
                valid
            })
            .map(|fields| Medication::new(fields, profile_id.clone()))
            .collect();
        if added.is_empty() {
            return added;
        }

        let mut medications = self.cached_medications();
        medications.extend(added.iter().cloned());
        self.save_medications(&medications).await;
        added
    }

    /// Remove a medication. Returns false when it was not cached.
    pub async fn delete_medication(&self, medication_id: &str) -> bool {
        let mut medications = self.cached_medications();
        let before = medications.len();
        medications.retain(|m| m.id != medication_id);
        if medications.len() == before {
            return false;
        }
        self.save_medications(&medications).await;
        true
    }

    /// Replace one medication's reminders. Returns false when the medication
    /// is not cached or any reminder time is not a zero-padded "HH:MM".
    pub async fn update_reminders(&self, medication_id: &str, reminders: Vec<Reminder>) -> bool {
        if !reminders_valid(&reminders) {
            warn!("Rejecting reminders for {}: time is not HH:MM", medication_id);
            return false;
        }
        let mut medications = self.cached_medications();
        let Some(medication) = medications.iter_mut().find(|m| m.id == medication_id) else {
            return false;
        };
        medication.reminders = reminders;
        self.save_medications(&medications).await;
        true
    }

    /// Record a dose taken and consume one unit of stock.
    ///
    /// Appends an adherence record and decrements `remaining` (never below
    /// zero). Both collections are written; their remote legs may finish in
    /// either order.
    pub async fn log_dose(&self, medication_id: &str, date: &str, time: &str) -> Option<Medication> {
        let mut medications = self.cached_medications();
        let medication = medications.iter_mut().find(|m| m.id == medication_id)?;
        medication.record_dose();
        let updated = medication.clone();

        let mut adherence = self.cached_adherence();
        adherence.push(AdherenceRecord::taken(
            date,
            self.active_profile_id(),
            medication_id,
            time,
        ));

        tokio::join!(
            self.save_adherence(&adherence),
            self.save_medications(&medications)
        );
        Some(updated)
    }

    /// Append a vitals entry under the active profile.
    pub async fn add_health_log(&self, fields: NewHealthLog) -> Option<HealthLog> {
        if !self.session.is_active() {
            return None;
        }
        let log = HealthLog::new(fields, self.active_profile_id());
        let mut logs = self.cached_logs();
        logs.push(log.clone());
        self.save_logs(&logs).await;
        Some(log)
    }

    /// Return the stored profile, creating a default one on first use.
    pub async fn ensure_profile(&self, name: &str, email: &str) -> Option<UserProfile> {
        if !self.session.is_active() {
            return None;
        }
        if let Some(profile) = self.get_user_profile().await {
            return Some(profile);
        }
        let profile = UserProfile::new(name.to_string(), email.to_string());
        self.save_user_profile(&profile).await;
        Some(profile)
    }

    /// Forget this device: every cached entry, the local account registry and
    /// the active identity.
    pub fn reset_all(&self) {
        match self.store.clear_all() {
            Ok(count) => info!("Reset local data ({} entries removed)", count),
            Err(e) => error!("Failed to reset local data: {}", e),
        }
        self.session.clear_active();
    }
}

fn log_degraded(collection: Collection, op: &str, err: &RemoteError) {
    match err {
        RemoteError::PermissionDenied(detail) => warn!(
            "Permission denied on {} {}, using local cache: {}",
            collection, op, detail
        ),
        other => warn!(
            "Remote {} {} failed, using local cache: {}",
            collection, op, other
        ),
    }
}
