//! Request ids and bearer-token checks.
//!
//! API keys and the cron secret are held only as SHA-256 digests and
//! compared in constant time.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};
use subtle::{Choice, ConstantTimeEq};
use uuid::Uuid;

use crate::api::ApiError;

type TokenDigest = [u8; 32];

fn digest(token: &str) -> TokenDigest {
    Sha256::digest(token.as_bytes()).into()
}

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// API key auth for the `/api/v1` routes other than health.
#[derive(Clone)]
pub struct AuthState {
    key_digests: Arc<Vec<TokenDigest>>,
    pub enabled: bool,
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthState")
            .field("keys", &self.key_digests.len())
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl AuthState {
    /// Reads `SCORELINE_API_KEYS` (comma-separated bearer tokens).
    ///
    /// # Errors
    ///
    /// Fails outside development when no key is configured.
    pub fn from_env(is_development: bool) -> anyhow::Result<Self> {
        let raw = std::env::var("SCORELINE_API_KEYS").unwrap_or_default();
        Self::from_raw(&raw, is_development)
    }

    /// Parses a comma-separated key list. An empty list disables auth in
    /// development and is an error anywhere else.
    ///
    /// # Errors
    ///
    /// Fails outside development when `raw` holds no key.
    pub fn from_raw(raw: &str, is_development: bool) -> anyhow::Result<Self> {
        let key_digests: Vec<TokenDigest> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(digest)
            .collect();

        if key_digests.is_empty() && !is_development {
            anyhow::bail!(
                "SCORELINE_API_KEYS is required outside development; provide comma-separated bearer tokens"
            );
        }
        if key_digests.is_empty() {
            tracing::warn!("SCORELINE_API_KEYS not set; bearer auth disabled in development");
        }

        Ok(Self {
            enabled: !key_digests.is_empty(),
            key_digests: Arc::new(key_digests),
        })
    }

    fn allows(&self, token: &str) -> bool {
        let presented = digest(token);
        self.key_digests
            .iter()
            .fold(Choice::from(0), |found, key| found | key.ct_eq(&presented))
            .into()
    }
}

/// Shared secret guarding the `/cron/*` endpoints.
#[derive(Clone)]
pub struct CronSecret {
    digest: Option<TokenDigest>,
}

impl std::fmt::Debug for CronSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronSecret")
            .field("configured", &self.is_configured())
            .finish()
    }
}

impl CronSecret {
    #[must_use]
    pub fn new(secret: Option<&str>) -> Self {
        Self {
            digest: secret.filter(|s| !s.trim().is_empty()).map(digest),
        }
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.digest.is_some()
    }

    #[must_use]
    pub fn verify(&self, header: Option<&HeaderValue>) -> bool {
        let (Some(expected), Some(token)) = (self.digest, bearer_token(header)) else {
            return false;
        };
        expected.ct_eq(&digest(token)).into()
    }
}

/// Takes `x-request-id` from the request or generates a `UUIDv4`, stores it
/// as a [`RequestId`] extension, and echoes it on the response.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;
    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }
    res
}

/// Rejects requests without a configured API key when auth is enabled.
pub async fn require_bearer_auth(
    State(auth): State<AuthState>,
    req: Request,
    next: Next,
) -> Response {
    if !auth.enabled {
        return next.run(req).await;
    }

    if bearer_token(req.headers().get(AUTHORIZATION)).is_some_and(|token| auth.allows(token)) {
        return next.run(req).await;
    }

    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();
    ApiError::unauthorized(request_id, "missing or invalid bearer token").into_response()
}

fn bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|s| !s.trim().is_empty())
}
