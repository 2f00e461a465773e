//! Credential/session providers for the source clients.
//!
//! A [`CredentialProvider`] owns the cache-then-acquire contract: it hands
//! back an unexpired credential from memory or the cache file when it can,
//! and otherwise asks its [`CredentialAcquirer`] for a fresh one and persists
//! it. How a credential is actually obtained (headless browser, static
//! token) lives behind the acquirer trait.

mod browser;
mod cache;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::error::CredentialError;

pub use browser::{
    token_from_page_source, token_from_request_headers, BrowserSettings, SessionCookieAcquirer,
    StorefrontTokenAcquirer, STOREFRONT_TOKEN_HEADER,
};
pub use cache::{CachedCredential, CredentialCache};

/// The secret part of a credential.
#[derive(Clone, PartialEq, Eq)]
pub enum Secret {
    /// An API access token sent as a request header.
    Token(String),
    /// Browser-session cookies, name to value.
    Cookies(BTreeMap<String, String>),
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Secret::Token(_) => f.write_str("Token([redacted])"),
            Secret::Cookies(cookies) => f
                .debug_tuple("Cookies")
                .field(&cookies.keys().collect::<Vec<_>>())
                .finish(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    /// Cache key, e.g. the storefront domain.
    pub identity: String,
    pub secret: Secret,
    /// `None` for entries cached without a timestamp.
    pub acquired_at: Option<DateTime<Utc>>,
    /// How long the credential stays usable; `None` means until the server
    /// rejects it.
    pub validity: Option<Duration>,
}

impl Credential {
    /// A credential with a validity window but no known acquisition time is
    /// treated as expired.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match (self.validity, self.acquired_at) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(validity), Some(acquired_at)) => now - acquired_at >= validity,
        }
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        match &self.secret {
            Secret::Token(token) => Some(token),
            Secret::Cookies(_) => None,
        }
    }

    /// Cookies rendered as a `Cookie` request header value (`a=1; b=2`).
    #[must_use]
    pub fn cookie_header(&self) -> Option<String> {
        match &self.secret {
            Secret::Cookies(cookies) if !cookies.is_empty() => Some(
                cookies
                    .iter()
                    .map(|(name, value)| format!("{name}={value}"))
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
            _ => None,
        }
    }
}

/// Obtains a fresh secret for a source identity.
#[async_trait]
pub trait CredentialAcquirer: Send + Sync {
    /// # Errors
    ///
    /// Returns [`CredentialError::Acquisition`] when no token or cookie could
    /// be extracted.
    async fn acquire(&self, identity: &str) -> Result<Secret, CredentialError>;
}

/// Hands out a pre-issued token without touching the network.
pub struct StaticTokenAcquirer {
    token: String,
}

impl StaticTokenAcquirer {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl CredentialAcquirer for StaticTokenAcquirer {
    async fn acquire(&self, identity: &str) -> Result<Secret, CredentialError> {
        if self.token.trim().is_empty() {
            return Err(CredentialError::Acquisition {
                identity: identity.to_string(),
                reason: "configured token is empty".to_string(),
            });
        }
        Ok(Secret::Token(self.token.clone()))
    }
}

/// Cache-backed credential source for one identity.
pub struct CredentialProvider {
    identity: String,
    acquirer: Box<dyn CredentialAcquirer>,
    cache: CredentialCache,
    validity: Option<Duration>,
    current: Option<Credential>,
}

impl CredentialProvider {
    pub fn new(
        identity: impl Into<String>,
        acquirer: Box<dyn CredentialAcquirer>,
        cache: CredentialCache,
    ) -> Self {
        Self {
            identity: identity.into(),
            acquirer,
            cache,
            validity: None,
            current: None,
        }
    }

    /// Expire credentials `validity` after they were acquired.
    #[must_use]
    pub fn with_validity(mut self, validity: Duration) -> Self {
        self.validity = Some(validity);
        self
    }

    /// Returns a usable credential, acquiring one only when needed.
    ///
    /// Without `force_refresh`, an unexpired credential held in memory or in
    /// the cache file is returned as is. Otherwise the acquirer runs and the
    /// result is written to the cache file.
    ///
    /// # Errors
    ///
    /// - [`CredentialError::Acquisition`] if the acquirer cannot produce a secret.
    /// - [`CredentialError::CacheIo`] / [`CredentialError::CacheSerialize`] if
    ///   the fresh credential cannot be persisted.
    pub async fn get_credential(
        &mut self,
        force_refresh: bool,
    ) -> Result<Credential, CredentialError> {
        let now = Utc::now();

        if !force_refresh {
            if let Some(current) = self.current.as_ref().filter(|c| !c.is_expired(now)) {
                return Ok(current.clone());
            }

            let cached = self
                .cache
                .load(&self.identity)
                .and_then(|entry| entry.into_credential(&self.identity, self.validity))
                .filter(|c| !c.is_expired(now));
            if let Some(credential) = cached {
                tracing::debug!(identity = %self.identity, "using cached credential");
                self.current = Some(credential.clone());
                return Ok(credential);
            }
        }

        tracing::info!(identity = %self.identity, force_refresh, "acquiring credential");
        let secret = self.acquirer.acquire(&self.identity).await?;
        let credential = Credential {
            identity: self.identity.clone(),
            secret,
            acquired_at: Some(now),
            validity: self.validity,
        };
        self.cache
            .store(&self.identity, &CachedCredential::from(&credential))?;
        self.current = Some(credential.clone());
        Ok(credential)
    }
}

#[cfg(test)]
#[path = "provider_test.rs"]
mod tests;
