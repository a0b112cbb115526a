//! Remote persistence/auth backends.
//!
//! The sync gateway only talks to [`RemoteBackend`]; concrete adapters are
//! swappable. Payloads travel as `serde_json::Value` and are typed by the
//! gateway.

mod http;
mod memory;

pub use http::*;
pub use memory::*;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Remote backend errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Server offline: {0}")]
    Offline(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Server error ({status}): {message}")]
    Http { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account not found")]
    AccountNotFound,

    #[error("Account already exists")]
    AlreadyExists,
}

pub type RemoteResult<T> = Result<T, RemoteError>;

impl RemoteError {
    /// Failures that degrade data operations to the local cache.
    ///
    /// Permission errors are included; the variant still tells them apart in logs.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            RemoteError::Offline(_)
                | RemoteError::Timeout
                | RemoteError::PermissionDenied(_)
                | RemoteError::Http { .. }
                | RemoteError::Malformed(_)
        )
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(e: serde_json::Error) -> Self {
        RemoteError::Malformed(e.to_string())
    }
}

/// The four synchronized record collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Medications,
    Adherence,
    Logs,
    Profile,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Medications,
        Collection::Adherence,
        Collection::Logs,
        Collection::Profile,
    ];

    /// Remote collection name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Medications => "medications",
            Collection::Adherence => "adherence",
            Collection::Logs => "logs",
            Collection::Profile => "profile",
        }
    }

    /// Logical key in the identity's cache partition.
    pub fn cache_key(&self) -> &'static str {
        match self {
            Collection::Medications => crate::cache::MEDICATIONS_KEY,
            Collection::Adherence => crate::cache::ADHERENCE_KEY,
            Collection::Logs => crate::cache::HEALTH_LOGS_KEY,
            Collection::Profile => crate::cache::USER_PROFILE_KEY,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Minimal identity fields returned by a successful sign-up or sign-in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub id: Option<String>,
    /// Session was established without the backend.
    #[serde(default)]
    pub is_local: bool,
}

/// Authenticated CRUD and auth against a remote service.
///
/// Implementations do not need their own timeouts; the gateway bounds every
/// call.
#[async_trait]
pub trait RemoteBackend: Send + Sync {
    async fn sign_up(&self, name: &str, email: &str, password: &str) -> RemoteResult<AuthUser>;

    async fn sign_in(&self, email: &str, password: &str) -> RemoteResult<AuthUser>;

    async fn sign_out(&self, identity: &str) -> RemoteResult<()>;

    /// Fetch a whole collection. `Profile` may yield `null`.
    async fn fetch_collection(
        &self,
        collection: Collection,
        identity: &str,
    ) -> RemoteResult<serde_json::Value>;

    /// Replace a whole collection.
    async fn upsert_collection(
        &self,
        collection: Collection,
        identity: &str,
        records: serde_json::Value,
    ) -> RemoteResult<()>;

    async fn probe_liveness(&self) -> bool;
}
