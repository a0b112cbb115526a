//! HealthAI Core Library
//!
//! Local-first data layer for a personal health tracker: a per-identity
//! offline cache, a sync gateway that reconciles it with a remote backend,
//! and a minute-resolution medication reminder scheduler.
//!
//! # Architecture
//!
//! ```text
//!            UI read/write
//!                 │
//!         ┌───────▼────────┐   best-effort, bounded   ┌──────────────┐
//!         │  Sync Gateway  │ ───────────────────────► │    Remote    │
//!         │  (reconcile)   │ ◄─────────────────────── │   backend    │
//!         └───────┬────────┘     failure = offline    └──────────────┘
//!                 │ cache-first
//!         ┌───────▼────────┐
//!         │  Cache Store   │  {prefix}_{identity}_{collection}
//!         │   (SQLite)     │
//!         └────────────────┘
//!
//!   medication snapshot ──► Alarm Scheduler ──► alarm events (once per minute)
//! ```
//!
//! # Core Principle
//!
//! **Data operations never fail.** Remote errors degrade to the cached value;
//! only authentication reports typed errors.
//!
//! # Modules
//!
//! - [`db`]: SQLite key/value storage
//! - [`cache`]: Identity-partitioned cache store
//! - [`session`]: Active identity
//! - [`models`]: Domain types (Medication, AdherenceRecord, HealthLog, UserProfile)
//! - [`remote`]: Remote backend trait with HTTP and in-memory adapters
//! - [`sync`]: Sync gateway, reconciliation and auth
//! - [`alarm`]: Reminder scheduler

pub mod alarm;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod remote;
pub mod session;
pub mod sync;

// Re-export commonly used types
pub use alarm::{AlarmEvent, AlarmScheduler, Clock, ManualClock, SystemClock};
pub use cache::{CacheStore, Partition};
pub use config::CoreConfig;
pub use db::Database;
pub use models::{
    AdherenceRecord, HealthLog, HealthLogType, Medication, NewHealthLog, NewMedication,
    NotificationSettings, Reminder, UserProfile,
};
pub use remote::{AuthUser, Collection, HttpBackend, InMemoryBackend, RemoteBackend, RemoteError};
pub use session::IdentitySession;
pub use sync::{AuthError, SyncGateway};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Runtime;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum HealthAiError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account not found")]
    AccountNotFound,

    #[error("Account already exists")]
    AlreadyExists,

    #[error("Server unreachable: {0}")]
    ConnectivityError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<db::DbError> for HealthAiError {
    fn from(e: db::DbError) -> Self {
        HealthAiError::DatabaseError(e.to_string())
    }
}

impl From<AuthError> for HealthAiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials => HealthAiError::InvalidCredentials,
            AuthError::AccountNotFound => HealthAiError::AccountNotFound,
            AuthError::AlreadyExists => HealthAiError::AlreadyExists,
            AuthError::Connectivity(msg) => HealthAiError::ConnectivityError(msg),
            AuthError::InvalidInput(msg) => HealthAiError::InvalidInput(msg),
            AuthError::Storage(msg) => HealthAiError::DatabaseError(msg),
        }
    }
}

impl From<RemoteError> for HealthAiError {
    fn from(e: RemoteError) -> Self {
        HealthAiError::ConnectivityError(e.to_string())
    }
}

impl From<anyhow::Error> for HealthAiError {
    fn from(e: anyhow::Error) -> Self {
        HealthAiError::ConfigError(e.to_string())
    }
}

impl From<std::io::Error> for HealthAiError {
    fn from(e: std::io::Error) -> Self {
        HealthAiError::ConfigError(format!("Failed to start runtime: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create the cache database at `path`, syncing against `api_base`
/// (or `HEALTHAI_API_BASE` / the default when `None`).
#[uniffi::export]
pub fn open_core(
    path: String,
    api_base: Option<String>,
) -> Result<Arc<HealthAiCore>, HealthAiError> {
    let mut config = CoreConfig::from_env()?;
    if let Some(api_base) = api_base {
        config.api_base = api_base;
    }
    let backend = HttpBackend::new(&config.api_base, config.request_timeout())?;
    let db = Database::open(&path)?;
    HealthAiCore::build(db, Arc::new(backend), config)
}

/// In-memory cache with an in-process backend (for testing and demos).
#[uniffi::export]
pub fn open_core_in_memory() -> Result<Arc<HealthAiCore>, HealthAiError> {
    let db = Database::open_in_memory()?;
    HealthAiCore::build(db, Arc::new(InMemoryBackend::new()), CoreConfig::default())
}

// =========================================================================
// Main API Object
// =========================================================================

/// Blocking facade over the async gateway for FFI callers.
#[derive(uniffi::Object)]
pub struct HealthAiCore {
    runtime: Runtime,
    gateway: SyncGateway,
    scheduler: Mutex<AlarmScheduler>,
    alarm_tick: Duration,
}

impl HealthAiCore {
    fn build(
        db: Database,
        backend: Arc<dyn RemoteBackend>,
        config: CoreConfig,
    ) -> Result<Arc<Self>, HealthAiError> {
        config.validate()?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let store = CacheStore::new(db, config.cache_prefix.clone());
        let session = IdentitySession::restore(store.clone());
        let gateway = SyncGateway::new(store, session, backend, &config);

        Ok(Arc::new(Self {
            runtime,
            gateway,
            scheduler: Mutex::new(AlarmScheduler::new()),
            alarm_tick: config.alarm_tick(),
        }))
    }
}

#[uniffi::export]
impl HealthAiCore {
    // =========================================================================
    // Session Operations
    // =========================================================================

    pub fn sign_up(
        &self,
        name: String,
        email: String,
        password: String,
    ) -> Result<FfiAuthUser, HealthAiError> {
        let user = self
            .runtime
            .block_on(self.gateway.sign_up(&name, &email, &password))?;
        Ok(user.into())
    }

    /// Register on this device only, after the server proved unreachable.
    pub fn sign_up_offline(
        &self,
        name: String,
        email: String,
        password: String,
    ) -> Result<FfiAuthUser, HealthAiError> {
        let user = self.gateway.sign_up_offline(&name, &email, &password)?;
        Ok(user.into())
    }

    pub fn sign_in(&self, email: String, password: String) -> Result<FfiAuthUser, HealthAiError> {
        let user = self.runtime.block_on(self.gateway.sign_in(&email, &password))?;
        Ok(user.into())
    }

    pub fn start_guest_session(&self, email: Option<String>, name: Option<String>) -> FfiAuthUser {
        self.gateway
            .start_guest_session(email.as_deref(), name.as_deref())
            .into()
    }

    pub fn sign_out(&self) {
        self.runtime.block_on(self.gateway.sign_out());
    }

    pub fn current_identity(&self) -> Option<String> {
        self.gateway.session().current()
    }

    pub fn is_online(&self) -> bool {
        self.runtime.block_on(self.gateway.is_online())
    }

    // =========================================================================
    // Collection Operations
    // =========================================================================

    pub fn get_medications(&self) -> Vec<FfiMedication> {
        let medications = self.runtime.block_on(self.gateway.get_medications());
        medications.into_iter().map(|m| m.into()).collect()
    }

    pub fn save_medications(&self, medications: Vec<FfiMedication>) {
        let medications: Vec<Medication> = medications.into_iter().map(|m| m.into()).collect();
        self.runtime
            .block_on(self.gateway.save_medications(&medications));
    }

    pub fn get_adherence(&self) -> Vec<FfiAdherenceRecord> {
        let records = self.runtime.block_on(self.gateway.get_adherence());
        records.into_iter().map(|r| r.into()).collect()
    }

    pub fn save_adherence(&self, records: Vec<FfiAdherenceRecord>) {
        let records: Vec<AdherenceRecord> = records.into_iter().map(|r| r.into()).collect();
        self.runtime.block_on(self.gateway.save_adherence(&records));
    }

    pub fn get_logs(&self) -> Vec<FfiHealthLog> {
        let logs = self.runtime.block_on(self.gateway.get_logs());
        logs.into_iter().map(|l| l.into()).collect()
    }

    pub fn save_logs(&self, logs: Vec<FfiHealthLog>) -> Result<(), HealthAiError> {
        let logs = logs
            .into_iter()
            .map(HealthLog::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        self.runtime.block_on(self.gateway.save_logs(&logs));
        Ok(())
    }

    pub fn get_user_profile(&self) -> Option<FfiUserProfile> {
        self.runtime
            .block_on(self.gateway.get_user_profile())
            .map(|p| p.into())
    }

    pub fn save_user_profile(&self, profile: FfiUserProfile) {
        let profile: UserProfile = profile.into();
        self.runtime
            .block_on(self.gateway.save_user_profile(&profile));
    }

    // =========================================================================
    // Record Operations
    // =========================================================================

    pub fn add_medication(
        &self,
        fields: FfiNewMedication,
    ) -> Result<Option<FfiMedication>, HealthAiError> {
        let fields: NewMedication = fields.into();
        check_reminder_times(&fields.reminders)?;
        Ok(self
            .runtime
            .block_on(self.gateway.add_medication(fields))
            .map(|m| m.into()))
    }

    /// Append a batch of scanned or imported medications.
    pub fn import_medications(
        &self,
        batch: Vec<FfiNewMedication>,
    ) -> Result<Vec<FfiMedication>, HealthAiError> {
        let batch: Vec<NewMedication> = batch.into_iter().map(|m| m.into()).collect();
        for fields in &batch {
            check_reminder_times(&fields.reminders)?;
        }
        let added = self.runtime.block_on(self.gateway.import_medications(batch));
        Ok(added.into_iter().map(|m| m.into()).collect())
    }

    pub fn delete_medication(&self, medication_id: String) -> bool {
        self.runtime
            .block_on(self.gateway.delete_medication(&medication_id))
    }

    pub fn update_reminders(
        &self,
        medication_id: String,
        reminders: Vec<FfiReminder>,
    ) -> Result<bool, HealthAiError> {
        let reminders: Vec<Reminder> = reminders.into_iter().map(|r| r.into()).collect();
        check_reminder_times(&reminders)?;
        Ok(self
            .runtime
            .block_on(self.gateway.update_reminders(&medication_id, reminders)))
    }

    /// Mark a dose taken and decrement the medication's remaining count.
    pub fn log_dose(
        &self,
        medication_id: String,
        date: String,
        time: String,
    ) -> Option<FfiMedication> {
        self.runtime
            .block_on(self.gateway.log_dose(&medication_id, &date, &time))
            .map(|m| m.into())
    }

    pub fn add_health_log(
        &self,
        fields: FfiNewHealthLog,
    ) -> Result<Option<FfiHealthLog>, HealthAiError> {
        let fields = NewHealthLog::try_from(fields)?;
        Ok(self
            .runtime
            .block_on(self.gateway.add_health_log(fields))
            .map(|l| l.into()))
    }

    pub fn ensure_profile(&self, name: String, email: String) -> Option<FfiUserProfile> {
        self.runtime
            .block_on(self.gateway.ensure_profile(&name, &email))
            .map(|p| p.into())
    }

    /// Wipe every cached entry and the session.
    pub fn reset_all(&self) {
        self.gateway.reset_all();
    }

    // =========================================================================
    // Alarm Operations
    // =========================================================================

    /// Period at which hosts should call [`HealthAiCore::check_alarms`].
    pub fn alarm_tick_ms(&self) -> u64 {
        self.alarm_tick.as_millis() as u64
    }

    /// Tick the reminder scheduler against the cached medication list.
    ///
    /// Call every [`HealthAiCore::alarm_tick_ms`]; slower than once per
    /// minute misses reminders.
    pub fn check_alarms(&self) -> Vec<FfiAlarmEvent> {
        let medications = self.gateway.cached_medications();
        let now = SystemClock.now();
        let events = match self.scheduler.lock() {
            Ok(mut scheduler) => scheduler.tick(now, &medications),
            Err(poisoned) => poisoned.into_inner().tick(now, &medications),
        };
        events.into_iter().map(|e| e.into()).collect()
    }
}

fn check_reminder_times(reminders: &[Reminder]) -> Result<(), HealthAiError> {
    match reminders.iter().find(|r| !r.has_valid_time()) {
        Some(bad) => Err(HealthAiError::InvalidInput(format!(
            "Reminder time must be HH:MM, got {:?}",
            bad.time
        ))),
        None => Ok(()),
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe reminder.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiReminder {
    pub id: String,
    pub time: String,
    pub enabled: bool,
    pub message: Option<String>,
    pub days: Option<Vec<u8>>,
}

impl From<Reminder> for FfiReminder {
    fn from(reminder: Reminder) -> Self {
        Self {
            id: reminder.id,
            time: reminder.time,
            enabled: reminder.enabled,
            message: reminder.message,
            days: reminder.days,
        }
    }
}

impl From<FfiReminder> for Reminder {
    fn from(reminder: FfiReminder) -> Self {
        Reminder {
            id: reminder.id,
            time: reminder.time,
            enabled: reminder.enabled,
            message: reminder.message,
            days: reminder.days,
        }
    }
}

/// FFI-safe medication.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMedication {
    pub id: String,
    pub profile_id: String,
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub time_of_day: Vec<String>,
    pub remaining: u32,
    pub total: u32,
    pub instructions: Option<String>,
    pub reminders: Vec<FfiReminder>,
}

impl From<Medication> for FfiMedication {
    fn from(med: Medication) -> Self {
        Self {
            id: med.id,
            profile_id: med.profile_id,
            name: med.name,
            dosage: med.dosage,
            frequency: med.frequency,
            time_of_day: med.time_of_day,
            remaining: med.remaining,
            total: med.total,
            instructions: med.instructions,
            reminders: med.reminders.into_iter().map(|r| r.into()).collect(),
        }
    }
}

impl From<FfiMedication> for Medication {
    fn from(med: FfiMedication) -> Self {
        Medication {
            id: med.id,
            profile_id: med.profile_id,
            name: med.name,
            dosage: med.dosage,
            frequency: med.frequency,
            time_of_day: med.time_of_day,
            remaining: med.remaining,
            total: med.total,
            instructions: med.instructions,
            reminders: med.reminders.into_iter().map(|r| r.into()).collect(),
        }
    }
}

/// FFI-safe medication fields before an id is assigned.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNewMedication {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub time_of_day: Vec<String>,
    pub remaining: u32,
    pub total: u32,
    pub instructions: Option<String>,
    pub reminders: Vec<FfiReminder>,
}

impl From<FfiNewMedication> for NewMedication {
    fn from(med: FfiNewMedication) -> Self {
        NewMedication {
            name: med.name,
            dosage: med.dosage,
            frequency: med.frequency,
            time_of_day: med.time_of_day,
            remaining: med.remaining,
            total: med.total,
            instructions: med.instructions,
            reminders: med.reminders.into_iter().map(|r| r.into()).collect(),
        }
    }
}

/// FFI-safe adherence record.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAdherenceRecord {
    pub date: String,
    pub profile_id: String,
    pub medication_id: String,
    pub taken: bool,
    pub time_taken: Option<String>,
}

impl From<AdherenceRecord> for FfiAdherenceRecord {
    fn from(record: AdherenceRecord) -> Self {
        Self {
            date: record.date,
            profile_id: record.profile_id,
            medication_id: record.medication_id,
            taken: record.taken,
            time_taken: record.time_taken,
        }
    }
}

impl From<FfiAdherenceRecord> for AdherenceRecord {
    fn from(record: FfiAdherenceRecord) -> Self {
        AdherenceRecord {
            date: record.date,
            profile_id: record.profile_id,
            medication_id: record.medication_id,
            taken: record.taken,
            time_taken: record.time_taken,
        }
    }
}

/// FFI-safe health log. `log_type` is one of `blood_pressure`, `glucose`,
/// `weight` or `mood`.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiHealthLog {
    pub id: String,
    pub profile_id: String,
    pub date: String,
    pub log_type: String,
    pub value: String,
    pub unit: String,
}

impl From<HealthLog> for FfiHealthLog {
    fn from(log: HealthLog) -> Self {
        Self {
            id: log.id,
            profile_id: log.profile_id,
            date: log.date,
            log_type: log.log_type.to_string(),
            value: log.value,
            unit: log.unit,
        }
    }
}

impl TryFrom<FfiHealthLog> for HealthLog {
    type Error = HealthAiError;

    fn try_from(log: FfiHealthLog) -> Result<Self, Self::Error> {
        Ok(HealthLog {
            id: log.id,
            profile_id: log.profile_id,
            date: log.date,
            log_type: log.log_type.parse().map_err(HealthAiError::InvalidInput)?,
            value: log.value,
            unit: log.unit,
        })
    }
}

/// FFI-safe health log fields before an id is assigned.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNewHealthLog {
    pub date: String,
    pub log_type: String,
    pub value: String,
    pub unit: String,
}

impl TryFrom<FfiNewHealthLog> for NewHealthLog {
    type Error = HealthAiError;

    fn try_from(log: FfiNewHealthLog) -> Result<Self, Self::Error> {
        Ok(NewHealthLog {
            date: log.date,
            log_type: log.log_type.parse().map_err(HealthAiError::InvalidInput)?,
            value: log.value,
            unit: log.unit,
        })
    }
}

/// FFI-safe user profile.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiUserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub age: String,
    pub weight: String,
    pub blood_type: String,
    pub notifications_enabled: bool,
}

impl From<UserProfile> for FfiUserProfile {
    fn from(profile: UserProfile) -> Self {
        Self {
            id: profile.id,
            name: profile.name,
            email: profile.email,
            phone: profile.phone,
            age: profile.age,
            weight: profile.weight,
            blood_type: profile.blood_type,
            notifications_enabled: profile.notifications.enabled,
        }
    }
}

impl From<FfiUserProfile> for UserProfile {
    fn from(profile: FfiUserProfile) -> Self {
        UserProfile {
            id: profile.id,
            name: profile.name,
            email: profile.email,
            phone: profile.phone,
            age: profile.age,
            weight: profile.weight,
            blood_type: profile.blood_type,
            notifications: NotificationSettings {
                enabled: profile.notifications_enabled,
            },
        }
    }
}

/// FFI-safe authenticated user.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAuthUser {
    pub name: String,
    pub email: String,
    pub id: Option<String>,
    pub is_local: bool,
}

impl From<AuthUser> for FfiAuthUser {
    fn from(user: AuthUser) -> Self {
        Self {
            name: user.name,
            email: user.email,
            id: user.id,
            is_local: user.is_local,
        }
    }
}

/// FFI-safe alarm event.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAlarmEvent {
    pub medication_id: String,
    pub medication_name: String,
    pub dosage: String,
    pub reminder_id: String,
    pub time: String,
    pub message: String,
}

impl From<AlarmEvent> for FfiAlarmEvent {
    fn from(event: AlarmEvent) -> Self {
        let message = event.message().to_string();
        Self {
            medication_id: event.medication.id,
            medication_name: event.medication.name,
            dosage: event.medication.dosage,
            reminder_id: event.reminder.id,
            time: event.minute,
            message,
        }
    }
}
