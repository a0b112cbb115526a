//! Process-local backend for tests and demos.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use super::{AuthUser, Collection, RemoteBackend, RemoteError, RemoteResult};

#[derive(Debug, Clone)]
struct MemoryAccount {
    id: String,
    name: String,
    password: String,
}

#[derive(Debug)]
struct MemoryState {
    online: bool,
    permission_denied: bool,
    latency: Option<Duration>,
    accounts: HashMap<String, MemoryAccount>,
    collections: HashMap<(String, Collection), serde_json::Value>,
    upserts: usize,
    sign_outs: usize,
}

/// In-memory backend with switches for connectivity, permission denial and latency.
#[derive(Debug)]
pub struct InMemoryBackend {
    state: Mutex<MemoryState>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                online: true,
                permission_denied: false,
                latency: None,
                accounts: HashMap::new(),
                collections: HashMap::new(),
                upserts: 0,
                sign_outs: 0,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.state().online = online;
    }

    pub fn set_permission_denied(&self, denied: bool) {
        self.state().permission_denied = denied;
    }

    /// Delay every call by `latency` before answering.
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.state().latency = latency;
    }

    /// Register an account directly.
    pub fn add_account(&self, name: &str, email: &str, password: &str) {
        self.state().accounts.insert(
            email.to_lowercase(),
            MemoryAccount {
                id: uuid::Uuid::new_v4().to_string(),
                name: name.to_string(),
                password: password.to_string(),
            },
        );
    }

    /// Seed the remote copy of a collection.
    pub fn seed(&self, identity: &str, collection: Collection, value: serde_json::Value) {
        self.state()
            .collections
            .insert((identity.to_string(), collection), value);
    }

    /// Current remote copy of a collection.
    pub fn stored(&self, identity: &str, collection: Collection) -> Option<serde_json::Value> {
        self.state()
            .collections
            .get(&(identity.to_string(), collection))
            .cloned()
    }

    /// Number of accepted upserts.
    pub fn upsert_count(&self) -> usize {
        self.state().upserts
    }

    pub fn sign_out_count(&self) -> usize {
        self.state().sign_outs
    }

    async fn simulate_network(&self) -> RemoteResult<()> {
        let latency = self.state().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if !self.state().online {
            return Err(RemoteError::Offline("connection refused".into()));
        }
        Ok(())
    }

    fn check_permission(&self) -> RemoteResult<()> {
        if self.state().permission_denied {
            return Err(RemoteError::PermissionDenied(
                "identity not allowed to access collection".into(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteBackend for InMemoryBackend {
    async fn sign_up(&self, name: &str, email: &str, password: &str) -> RemoteResult<AuthUser> {
        self.simulate_network().await?;
        let email = email.to_lowercase();
        let mut state = self.state();
        if state.accounts.contains_key(&email) {
            return Err(RemoteError::AlreadyExists);
        }

        let account = MemoryAccount {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            password: password.to_string(),
        };
        let user = AuthUser {
            name: account.name.clone(),
            email: email.clone(),
            id: Some(account.id.clone()),
            is_local: false,
        };
        state.accounts.insert(email, account);
        Ok(user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> RemoteResult<AuthUser> {
        self.simulate_network().await?;
        let email = email.to_lowercase();
        let state = self.state();
        let account = state
            .accounts
            .get(&email)
            .ok_or(RemoteError::AccountNotFound)?;
        if account.password != password {
            return Err(RemoteError::InvalidCredentials);
        }

        Ok(AuthUser {
            name: account.name.clone(),
            email,
            id: Some(account.id.clone()),
            is_local: false,
        })
    }

    async fn sign_out(&self, _identity: &str) -> RemoteResult<()> {
        self.simulate_network().await?;
        self.state().sign_outs += 1;
        Ok(())
    }

    async fn fetch_collection(
        &self,
        collection: Collection,
        identity: &str,
    ) -> RemoteResult<serde_json::Value> {
        self.simulate_network().await?;
        self.check_permission()?;
        let empty = match collection {
            Collection::Profile => serde_json::Value::Null,
            _ => serde_json::Value::Array(Vec::new()),
        };
        Ok(self.stored(identity, collection).unwrap_or(empty))
    }

    async fn upsert_collection(
        &self,
        collection: Collection,
        identity: &str,
        records: serde_json::Value,
    ) -> RemoteResult<()> {
        self.simulate_network().await?;
        self.check_permission()?;
        let mut state = self.state();
        state
            .collections
            .insert((identity.to_string(), collection), records);
        state.upserts += 1;
        Ok(())
    }

    async fn probe_liveness(&self) -> bool {
        self.simulate_network().await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_accounts() {
        let backend = InMemoryBackend::new();

        let user = backend.sign_up("Pat", "Pat@Example.com", "secret1").await.unwrap();
        assert_eq!(user.email, "pat@example.com");
        assert!(!user.is_local);

        assert_eq!(
            backend.sign_up("Pat", "pat@example.com", "x").await,
            Err(RemoteError::AlreadyExists)
        );
        assert!(backend.sign_in("pat@example.com", "secret1").await.is_ok());
        assert_eq!(
            backend.sign_in("pat@example.com", "wrong").await,
            Err(RemoteError::InvalidCredentials)
        );
        assert_eq!(
            backend.sign_in("nobody@example.com", "x").await,
            Err(RemoteError::AccountNotFound)
        );
    }

    #[tokio::test]
    async fn test_collections_scoped_by_identity() {
        let backend = InMemoryBackend::new();
        backend
            .upsert_collection(Collection::Logs, "pat", serde_json::json!([1]))
            .await
            .unwrap();

        assert_eq!(
            backend.fetch_collection(Collection::Logs, "pat").await.unwrap(),
            serde_json::json!([1])
        );
        assert_eq!(
            backend.fetch_collection(Collection::Logs, "sam").await.unwrap(),
            serde_json::json!([])
        );
        assert_eq!(
            backend.fetch_collection(Collection::Profile, "sam").await.unwrap(),
            serde_json::Value::Null
        );
        assert_eq!(backend.upsert_count(), 1);
    }

    #[tokio::test]
    async fn test_switches() {
        let backend = InMemoryBackend::new();
        assert!(backend.probe_liveness().await);

        backend.set_permission_denied(true);
        assert!(matches!(
            backend.fetch_collection(Collection::Logs, "pat").await,
            Err(RemoteError::PermissionDenied(_))
        ));

        backend.set_online(false);
        assert!(!backend.probe_liveness().await);
        assert!(matches!(
            backend.fetch_collection(Collection::Logs, "pat").await,
            Err(RemoteError::Offline(_))
        ));
    }
}
