//! Sign-up, sign-in and sign-out with offline fallbacks.
//!
//! Auth is the only surface that reports typed errors, so the UI can tell a
//! wrong password from a missing account from an unreachable server.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use log::{error, info, warn};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::cache::{Partition, EMULATED_USERS_KEY};
use crate::remote::{AuthUser, RemoteError};
use crate::session::normalize;

use super::SyncGateway;

/// Fixed credentials that always open a local session.
pub const DEMO_EMAIL: &str = "admin@example.com";
pub const DEMO_PASSWORD: &str = "password123";
pub const DEMO_NAME: &str = "Demo User";

pub const GUEST_EMAIL: &str = "guest@local.health";
pub const GUEST_NAME: &str = "Guest User";

pub const MIN_PASSWORD_LEN: usize = 6;

/// Auth outcomes surfaced to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account not found")]
    AccountNotFound,

    #[error("Account already exists")]
    AlreadyExists,

    #[error("Server unreachable: {0}")]
    Connectivity(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Local storage error: {0}")]
    Storage(String),
}

impl From<RemoteError> for AuthError {
    fn from(e: RemoteError) -> Self {
        match e {
            RemoteError::InvalidCredentials => AuthError::InvalidCredentials,
            RemoteError::AccountNotFound => AuthError::AccountNotFound,
            RemoteError::AlreadyExists => AuthError::AlreadyExists,
            other => AuthError::Connectivity(other.to_string()),
        }
    }
}

/// Account registered on this device only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
struct LocalAccount {
    id: String,
    name: String,
    email: String,
    password_hash: String,
}

/// Salted argon2 PHC string stored in the local registry.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("argon2 hash_password error: {}", e);
            AuthError::Storage(e.to_string())
        })
}

/// Check `password` against a stored PHC string. Unparseable hashes never match.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            error!("argon2 parse hash error: {}", e);
            false
        }
    }
}

/// Validate sign-up fields, returning the normalized email.
pub fn validate_sign_up(name: &str, email: &str, password: &str) -> Result<String, AuthError> {
    if name.trim().is_empty() {
        return Err(AuthError::InvalidInput("Please enter your full name".into()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::InvalidInput(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    match normalize(email) {
        Some(email) if email.contains('@') => Ok(email),
        _ => Err(AuthError::InvalidInput("Please enter a valid email".into())),
    }
}

impl SyncGateway {
    /// Register remotely and start a session.
    ///
    /// `AlreadyExists` lets the UI redirect to sign-in; `Connectivity` lets it
    /// offer [`SyncGateway::sign_up_offline`].
    pub async fn sign_up(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthUser, AuthError> {
        let email = validate_sign_up(name, email, password)?;

        match self
            .bounded(self.backend.sign_up(name.trim(), &email, password))
            .await
        {
            Ok(user) => {
                self.session.set_active(&email);
                info!("Registered {}", email);
                Ok(user)
            }
            Err(e) => {
                warn!("Remote registration for {} failed: {}", email, e);
                Err(e.into())
            }
        }
    }

    /// Register in the device-local account registry and start a session.
    pub fn sign_up_offline(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthUser, AuthError> {
        let email = validate_sign_up(name, email, password)?;
        let mut accounts = self.local_accounts();
        if accounts.contains_key(&email) {
            return Err(AuthError::AlreadyExists);
        }

        let account = LocalAccount {
            id: format!("local-{}", uuid::Uuid::new_v4()),
            name: name.trim().to_string(),
            email: email.clone(),
            password_hash: hash_password(password)?,
        };
        let user = AuthUser {
            name: account.name.clone(),
            email: email.clone(),
            id: Some(account.id.clone()),
            is_local: true,
        };
        accounts.insert(email.clone(), account);
        self.store
            .set(&Partition::Global, EMULATED_USERS_KEY, &accounts)
            .map_err(|e| AuthError::Storage(e.to_string()))?;

        self.session.set_active(&email);
        info!("Registered {} on this device only", email);
        Ok(user)
    }

    /// Authenticate and start a session.
    ///
    /// The demo pair never touches the network. Any remote failure consults
    /// the device-local registry first, so accounts created offline still
    /// sign in once the server is reachable. Without a local match the remote
    /// outcome is reported; a local password mismatch while offline is
    /// `InvalidCredentials`.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        let email =
            normalize(email).ok_or_else(|| AuthError::InvalidInput("Email is required".into()))?;

        if email == DEMO_EMAIL && password == DEMO_PASSWORD {
            self.session.set_active(&email);
            info!("Started demo session");
            return Ok(AuthUser {
                name: DEMO_NAME.into(),
                email,
                id: None,
                is_local: true,
            });
        }

        match self.bounded(self.backend.sign_in(&email, password)).await {
            Ok(user) => {
                self.session.set_active(&email);
                info!("Signed in {}", email);
                Ok(user)
            }
            Err(e) => {
                warn!("Remote sign-in for {} failed ({}), checking local registry", email, e);
                match self.local_accounts().remove(&email) {
                    Some(account) if verify_password(password, &account.password_hash) => {
                        self.session.set_active(&email);
                        info!("Signed in {} from local registry", email);
                        Ok(AuthUser {
                            name: account.name,
                            email,
                            id: Some(account.id),
                            is_local: true,
                        })
                    }
                    Some(_) if e.is_connectivity() => Err(AuthError::InvalidCredentials),
                    _ => Err(e.into()),
                }
            }
        }
    }

    /// Force a purely local session without any credentials.
    pub fn start_guest_session(&self, email: Option<&str>, name: Option<&str>) -> AuthUser {
        let email = email
            .and_then(normalize)
            .unwrap_or_else(|| GUEST_EMAIL.to_string());
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(GUEST_NAME)
            .to_string();

        self.session.set_active(&email);
        info!("Started offline session for {}", email);
        AuthUser {
            name,
            email,
            id: None,
            is_local: true,
        }
    }

    /// Best-effort remote sign-out, then drop the identity and its cached
    /// partition locally regardless of the remote outcome.
    pub async fn sign_out(&self) {
        let Some(identity) = self.session.current() else {
            return;
        };

        if let Err(e) = self.bounded(self.backend.sign_out(&identity)).await {
            warn!("Remote sign-out for {} failed: {}", identity, e);
        }
        if let Err(e) = self.store.clear_identity(&identity) {
            error!("Failed to clear cached data for {}: {}", identity, e);
        }
        self.session.clear_active();
        info!("Signed out {}", identity);
    }

    fn local_accounts(&self) -> BTreeMap<String, LocalAccount> {
        self.store
            .get(&Partition::Global, EMULATED_USERS_KEY, BTreeMap::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("password123").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("password123", &hash));
        assert!(!verify_password("password124", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        assert_ne!(
            hash_password("password123").unwrap(),
            hash_password("password123").unwrap()
        );
    }

    #[test]
    fn test_verify_rejects_malformed_hash() {
        assert!(!verify_password("anything", "not-a-valid-hash"));
    }

    #[test]
    fn test_validate_sign_up() {
        assert_eq!(
            validate_sign_up("Pat", " Pat@Example.com ", "secret1"),
            Ok("pat@example.com".to_string())
        );
        assert!(matches!(
            validate_sign_up(" ", "pat@example.com", "secret1"),
            Err(AuthError::InvalidInput(_))
        ));
        assert!(matches!(
            validate_sign_up("Pat", "pat@example.com", "short"),
            Err(AuthError::InvalidInput(_))
        ));
        assert!(matches!(
            validate_sign_up("Pat", "not-an-email", "secret1"),
            Err(AuthError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_remote_error_mapping() {
        assert_eq!(
            AuthError::from(RemoteError::InvalidCredentials),
            AuthError::InvalidCredentials
        );
        assert_eq!(
            AuthError::from(RemoteError::AccountNotFound),
            AuthError::AccountNotFound
        );
        assert_eq!(AuthError::from(RemoteError::AlreadyExists), AuthError::AlreadyExists);
        assert!(matches!(
            AuthError::from(RemoteError::Timeout),
            AuthError::Connectivity(_)
        ));
    }
}
