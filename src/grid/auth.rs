//! Service-account authentication for the Sheets API: a signed RS256 JWT
//! assertion is exchanged for a short-lived bearer token.

use std::path::Path;
use std::sync::{Mutex, PoisonError};

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::now_unix_seconds;

use super::GridError;

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn load(path: &Path) -> Result<Self, GridError> {
        let credentials_error = |reason: String| GridError::Credentials {
            path: path.display().to_string(),
            reason,
        };
        let raw = std::fs::read_to_string(path).map_err(|err| credentials_error(err.to_string()))?;
        Self::parse(&raw).map_err(credentials_error)
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        let key: ServiceAccountKey = serde_json::from_str(raw).map_err(|err| err.to_string())?;
        if key.client_email.trim().is_empty() {
            return Err("client_email is empty".to_string());
        }
        if !key.private_key.contains("PRIVATE KEY") {
            return Err("private_key is not a PEM private key".to_string());
        }
        Ok(key)
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: i64,
}

fn still_fresh(expires_at: i64, now: i64) -> bool {
    expires_at - REFRESH_MARGIN_SECS > now
}

pub struct TokenSource {
    key: ServiceAccountKey,
    scope: String,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenSource {
    pub fn new(key: ServiceAccountKey, scope: &str) -> Self {
        Self {
            key,
            scope: scope.to_string(),
            cached: Mutex::new(None),
        }
    }

    /// Cached bearer token, refreshed shortly before it expires.
    pub fn bearer(&self, http: &Client) -> Result<String, GridError> {
        let now = now_unix_seconds();
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = cached.as_ref().filter(|token| still_fresh(token.expires_at, now)) {
            return Ok(token.value.clone());
        }

        let fresh = self.exchange(http, now)?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    fn claims(&self, now: i64) -> AssertionClaims<'_> {
        AssertionClaims {
            iss: &self.key.client_email,
            scope: &self.scope,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        }
    }

    fn assertion(&self, now: i64) -> Result<String, GridError> {
        let signing_key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .map_err(|err| GridError::Token(format!("invalid private key: {err}")))?;
        encode(&Header::new(Algorithm::RS256), &self.claims(now), &signing_key)
            .map_err(|err| GridError::Token(format!("failed to sign assertion: {err}")))
    }

    fn exchange(&self, http: &Client, now: i64) -> Result<CachedToken, GridError> {
        let assertion = self.assertion(now)?;
        debug!(account = %self.key.client_email, "requesting access token");
        let response = http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GridError::Token(format!(
                "token endpoint answered {status}: {body}"
            )));
        }
        let token: TokenResponse = response
            .json()
            .map_err(|err| GridError::Decode(format!("token response: {err}")))?;
        Ok(CachedToken {
            value: token.access_token,
            expires_at: now + token.expires_in,
        })
    }
}
