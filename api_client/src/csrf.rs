//! CSRF token cache.
//!
//! Mutating calls reuse one cached token. A rejected token is replaced by
//! exactly one refresh; the rejected request itself is never replayed.

use crate::envelope::parse_lenient;
use crate::error::{csrf_error, http_error, CsrfErrorKind, Error, HttpErrorKind};
use log::*;
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

/// Request header carrying the token.
pub const CSRF_HEADER: &str = "X-CSRF-Token";
/// Body field carrying the token.
pub const CSRF_FIELD: &str = "csrf_token";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default, alias = "token")]
    csrf_token: Option<String>,
}

pub struct CsrfTokens {
    url: String,
    token: Mutex<Option<String>>,
    fetches: AtomicU64,
}

impl CsrfTokens {
    pub fn new(url: String) -> Self {
        Self {
            url,
            token: Mutex::new(None),
            fetches: AtomicU64::new(0),
        }
    }

    /// The cached token, fetching one first if none is cached.
    pub async fn current(&self, http: &reqwest::Client) -> Result<String, Error> {
        // Holding the lock across the fetch makes concurrent callers share one request.
        let mut token = self.token.lock().await;
        if let Some(cached) = token.as_ref() {
            return Ok(cached.clone());
        }

        let fresh = self.fetch(http).await?;
        *token = Some(fresh.clone());
        Ok(fresh)
    }

    /// Drop the cached token and fetch a new one.
    pub async fn refresh(&self, http: &reqwest::Client) -> Result<String, Error> {
        let mut token = self.token.lock().await;
        *token = None;

        let fresh = self.fetch(http).await?;
        *token = Some(fresh.clone());
        info!("CSRF token refreshed");
        Ok(fresh)
    }

    pub async fn invalidate(&self) {
        *self.token.lock().await = None;
    }

    /// Number of tokens fetched from the backend so far.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::SeqCst)
    }

    async fn fetch(&self, http: &reqwest::Client) -> Result<String, Error> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        debug!("Fetching CSRF token from {}", self.url);

        let response = http.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(http_error(
                HttpErrorKind::Status(status.as_u16()),
                "CSRF token endpoint failed",
            ));
        }

        let body = response.text().await?;
        let parsed: TokenResponse = serde_json::from_value(parse_lenient(&body)?)
            .map_err(|e| csrf_error(CsrfErrorKind::TokenUnavailable, &e.to_string()))?;

        parsed
            .csrf_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                csrf_error(
                    CsrfErrorKind::TokenUnavailable,
                    "token endpoint returned no token",
                )
            })
    }
}
