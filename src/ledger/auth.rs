//! Google service-account authentication
//!
//! Exchanges an RS256-signed JWT assertion for an OAuth access token and
//! reuses the token until shortly before it expires.

use super::SheetError;
use crate::config::ConfigError;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::Mutex;

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const TOKEN_LIFETIME_SECS: i64 = 3600;
/// Tokens are refreshed this long before their reported expiry
const EXPIRY_MARGIN_SECS: i64 = 60;

/// The fields of a service account JSON key file that are used here
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::CredentialFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &raw)
    }

    fn parse(path: &Path, raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|e| ConfigError::MalformedCredential {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Hands out bearer tokens for one service account
pub struct TokenSource {
    client: Client,
    client_email: String,
    token_uri: String,
    signing_key: EncodingKey,
    scopes: String,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenSource {
    pub fn new(
        client: Client,
        key: &ServiceAccountKey,
        path: &Path,
        scopes: &[&str],
    ) -> Result<Self, ConfigError> {
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|e| {
            ConfigError::MalformedCredential {
                path: path.to_path_buf(),
                reason: format!("private_key: {e}"),
            }
        })?;

        Ok(Self {
            client,
            client_email: key.client_email.clone(),
            token_uri: key.token_uri.clone(),
            signing_key,
            scopes: scopes.join(" "),
            cached: Mutex::new(None),
        })
    }

    /// A valid access token, fetching a new one when the cached one is stale
    pub async fn token(&self) -> Result<String, SheetError> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now();

        if let Some(token) = cached.as_ref().filter(|t| is_fresh(t, now)) {
            return Ok(token.value.clone());
        }

        let fresh = self.fetch(now).await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    async fn fetch(&self, now: DateTime<Utc>) -> Result<CachedToken, SheetError> {
        let assertion = self.assertion(now)?;

        let response = self
            .client
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| SheetError::new(format!("token request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SheetError::new(format!("failed to read token response: {e}")))?;

        if !status.is_success() {
            return Err(SheetError::new(format!(
                "token request rejected with HTTP {status}: {body}"
            )));
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| SheetError::new(format!("malformed token response: {e}")))?;

        tracing::debug!(account = %self.client_email, "Fetched spreadsheet access token");

        Ok(CachedToken {
            value: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in.unwrap_or(TOKEN_LIFETIME_SECS)),
        })
    }

    fn assertion(&self, now: DateTime<Utc>) -> Result<String, SheetError> {
        let iat = now.timestamp();
        let claims = Claims {
            iss: &self.client_email,
            scope: &self.scopes,
            aud: &self.token_uri,
            iat,
            exp: iat + TOKEN_LIFETIME_SECS,
        };
        encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)
            .map_err(|e| SheetError::new(format!("failed to sign token assertion: {e}")))
    }
}

fn is_fresh(token: &CachedToken, now: DateTime<Utc>) -> bool {
    token.expires_at - Duration::seconds(EXPIRY_MARGIN_SECS) > now
}
