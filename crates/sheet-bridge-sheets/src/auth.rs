//! Token providers for authorizing transport calls.
//!
//! The transport fetches a token immediately before every request so that a
//! provider can refresh transparently without the caller noticing.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use sheet_bridge_common::{Result, SheetBridgeError};
use tokio::sync::Mutex;
use tracing::debug;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Refresh this long before the reported expiry to avoid using a token that
/// dies mid-request.
const EXPIRY_LEEWAY: Duration = Duration::from_secs(30);

/// Supplies bearer tokens for transport calls.
///
/// Implementations must be safe to call concurrently; the transport calls
/// `access_token` once per request.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns a currently valid bearer token.
    async fn access_token(&self) -> Result<String>;
}

/// A fixed, never-refreshed token. Useful for tests and short-lived jobs
/// where the caller manages token lifetime externally.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}

/// OAuth2 refresh-token credentials.
#[derive(Debug, Clone)]
pub struct OAuth2Config {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    /// Token endpoint. Overridable for tests.
    pub token_uri: String,
}

impl OAuth2Config {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            refresh_token: refresh_token.into(),
            token_uri: DEFAULT_TOKEN_URI.to_string(),
        }
    }

    pub fn token_uri(mut self, token_uri: impl Into<String>) -> Self {
        self.token_uri = token_uri.into();
        self
    }
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// Exchanges an OAuth2 refresh token for access tokens, caching each token
/// until shortly before its reported expiry.
pub struct OAuth2TokenProvider {
    http: reqwest::Client,
    config: OAuth2Config,
    cached: Mutex<Option<CachedToken>>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

impl OAuth2TokenProvider {
    pub fn new(config: OAuth2Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            cached: Mutex::new(None),
        }
    }

    async fn refresh(&self) -> Result<CachedToken> {
        debug!(token_uri = %self.config.token_uri, "refreshing access token");

        let params = [
            ("grant_type", "refresh_token"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("refresh_token", self.config.refresh_token.as_str()),
        ];

        let response = self
            .http
            .post(&self.config.token_uri)
            .form(&params)
            .send()
            .await
            .map_err(|e| SheetBridgeError::Auth(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SheetBridgeError::Auth(format!(
                "token refresh failed with status {}: {}",
                status.as_u16(),
                body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| SheetBridgeError::Auth(format!("invalid token response: {}", e)))?;

        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(0));
        let expires_at = Instant::now() + lifetime.saturating_sub(EXPIRY_LEEWAY);

        Ok(CachedToken {
            token: token.access_token,
            expires_at,
        })
    }
}

#[async_trait]
impl TokenProvider for OAuth2TokenProvider {
    async fn access_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;

        if let Some(entry) = cached.as_ref() {
            if entry.expires_at > Instant::now() {
                return Ok(entry.token.clone());
            }
        }

        let fresh = self.refresh().await?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }
}
