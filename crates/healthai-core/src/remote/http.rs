//! HTTP adapter for the JSON API backend.
//!
//! Endpoints: `POST /register`, `POST /login`, `GET|POST /{collection}` with
//! the identity in `X-User-Email`, and `HEAD /medications` as liveness probe.

use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

use super::{AuthUser, Collection, RemoteBackend, RemoteError, RemoteResult};

const USER_HEADER: &str = "x-user-email";
const MAX_LOG_BODY_CHARS: usize = 512;

#[derive(Debug, Deserialize)]
struct AuthResponse {
    user: RemoteUser,
}

#[derive(Debug, Deserialize)]
struct RemoteUser {
    name: String,
    email: String,
    #[serde(default)]
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}

/// Which call a non-success status came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Register,
    Login,
    Data,
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RemoteError::Timeout
        } else if e.is_decode() {
            RemoteError::Malformed(e.to_string())
        } else {
            RemoteError::Offline(e.to_string())
        }
    }
}

/// Map a non-success status and error detail to a typed error.
pub fn classify_status(kind: RequestKind, status: u16, detail: &str) -> RemoteError {
    let lowered = detail.to_lowercase();
    match (kind, status) {
        (RequestKind::Register, 400 | 409) if lowered.contains("exists") => {
            RemoteError::AlreadyExists
        }
        (RequestKind::Login, 401) => RemoteError::InvalidCredentials,
        (RequestKind::Login, 404) => RemoteError::AccountNotFound,
        (_, 401 | 403) => RemoteError::PermissionDenied(detail.to_string()),
        _ => RemoteError::Http {
            status,
            message: detail.to_string(),
        },
    }
}

/// Backend speaking the JSON API over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// `base_url` is the API root, e.g. "http://localhost:8000/api".
    pub fn new(base_url: &str, timeout: Duration) -> RemoteResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Offline(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn headers(&self, identity: Option<&str>) -> RemoteResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(identity) = identity {
            let value = HeaderValue::from_str(identity)
                .map_err(|_| RemoteError::PermissionDenied("Invalid identity header".into()))?;
            headers.insert(USER_HEADER, value);
        }
        Ok(headers)
    }

    async fn read_body(
        kind: RequestKind,
        response: reqwest::Response,
    ) -> RemoteResult<serde_json::Value> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let mut preview: String = body.chars().take(MAX_LOG_BODY_CHARS).collect();
            if body.chars().count() > MAX_LOG_BODY_CHARS {
                preview.push_str("...");
            }
            debug!("API response error ({}): {}", status, preview);

            let detail = serde_json::from_str::<ErrorBody>(&body)
                .map(|e| e.detail)
                .unwrap_or_else(|_| format!("Server Error: {}", status.as_u16()));
            return Err(classify_status(kind, status.as_u16(), &detail));
        }

        debug!("API response status: {}", status);
        if body.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn authenticate(
        &self,
        kind: RequestKind,
        path: &str,
        body: serde_json::Value,
    ) -> RemoteResult<AuthUser> {
        let response = self
            .client
            .post(self.url(path))
            .headers(self.headers(None)?)
            .json(&body)
            .send()
            .await?;

        let value = Self::read_body(kind, response).await?;
        let parsed: AuthResponse = serde_json::from_value(value)?;
        Ok(AuthUser {
            name: parsed.user.name,
            email: parsed.user.email,
            id: parsed.user.id,
            is_local: false,
        })
    }
}

#[async_trait]
impl RemoteBackend for HttpBackend {
    async fn sign_up(&self, name: &str, email: &str, password: &str) -> RemoteResult<AuthUser> {
        let body = serde_json::json!({ "name": name, "email": email, "password": password });
        self.authenticate(RequestKind::Register, "register", body)
            .await
    }

    async fn sign_in(&self, email: &str, password: &str) -> RemoteResult<AuthUser> {
        let body = serde_json::json!({ "email": email, "password": password });
        self.authenticate(RequestKind::Login, "login", body).await
    }

    async fn sign_out(&self, identity: &str) -> RemoteResult<()> {
        // The API is stateless per request; there is no session to revoke.
        debug!("Remote sign-out for {} is a no-op", identity);
        Ok(())
    }

    async fn fetch_collection(
        &self,
        collection: Collection,
        identity: &str,
    ) -> RemoteResult<serde_json::Value> {
        let response = self
            .client
            .get(self.url(collection.as_str()))
            .headers(self.headers(Some(identity))?)
            .send()
            .await?;
        Self::read_body(RequestKind::Data, response).await
    }

    async fn upsert_collection(
        &self,
        collection: Collection,
        identity: &str,
        records: serde_json::Value,
    ) -> RemoteResult<()> {
        let response = self
            .client
            .post(self.url(collection.as_str()))
            .headers(self.headers(Some(identity))?)
            .json(&records)
            .send()
            .await?;
        Self::read_body(RequestKind::Data, response).await?;
        Ok(())
    }

    async fn probe_liveness(&self) -> bool {
        match self
            .client
            .head(self.url(Collection::Medications.as_str()))
            .send()
            .await
        {
            // 401 means the server is there but wants an identity
            Ok(response) => {
                response.status().is_success() || response.status() == StatusCode::UNAUTHORIZED
            }
            Err(e) => {
                debug!("Liveness probe failed: {}", e);
                false
            }
        }
    }
}
