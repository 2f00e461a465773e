//! JSON credential cache file keyed by source identity.
//!
//! Layout: `{ "<identity>": { "token": "...", "acquired_at": "..." } }`.
//! Cookie sessions store a `cookies` map instead of `token`. Entries with
//! only a `token` (no timestamp) load as non-expiring tokens.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{Credential, Secret};
use crate::error::CredentialError;

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedCredential {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub cookies: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acquired_at: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for CachedCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedCredential")
            .field("token", &self.token.as_ref().map(|_| "[redacted]"))
            .field("cookies", &self.cookies.keys().collect::<Vec<_>>())
            .field("acquired_at", &self.acquired_at)
            .finish()
    }
}

impl CachedCredential {
    /// Converts the entry back into a [`Credential`]. Returns `None` when the
    /// entry holds neither a token nor cookies.
    #[must_use]
    pub fn into_credential(self, identity: &str, validity: Option<Duration>) -> Option<Credential> {
        let secret = match self.token {
            Some(token) if !token.is_empty() => Secret::Token(token),
            _ if !self.cookies.is_empty() => Secret::Cookies(self.cookies),
            _ => return None,
        };
        Some(Credential {
            identity: identity.to_string(),
            secret,
            acquired_at: self.acquired_at,
            validity,
        })
    }
}

impl From<&Credential> for CachedCredential {
    fn from(credential: &Credential) -> Self {
        let (token, cookies) = match &credential.secret {
            Secret::Token(token) => (Some(token.clone()), BTreeMap::new()),
            Secret::Cookies(cookies) => (None, cookies.clone()),
        };
        Self {
            token,
            cookies,
            acquired_at: credential.acquired_at,
        }
    }
}

/// Handle to the credential cache file.
///
/// Every [`CredentialCache::store`] re-reads the file and merges the entry
/// in before rewriting, so several providers can share one file.
#[derive(Debug, Clone)]
pub struct CredentialCache {
    path: PathBuf,
}

impl CredentialCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the entry for `identity`. A missing file, unreadable file, or
    /// malformed entry all read as `None`.
    #[must_use]
    pub fn load(&self, identity: &str) -> Option<CachedCredential> {
        let entry = self.read_entries().remove(identity)?;
        match serde_json::from_value::<CachedCredential>(entry) {
            Ok(cached) => Some(cached),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    identity,
                    error = %e,
                    "ignoring malformed credential cache entry"
                );
                None
            }
        }
    }

    /// Writes `entry` under `identity`, keeping other identities' entries.
    ///
    /// The file is replaced atomically: the merged map is written to a
    /// sibling temp file which is then renamed over the original.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::CacheIo`] if the directory, temp file, or
    /// rename fails, and [`CredentialError::CacheSerialize`] if encoding fails.
    pub fn store(&self, identity: &str, entry: &CachedCredential) -> Result<(), CredentialError> {
        let mut entries = self.read_entries();
        entries.insert(identity.to_string(), serde_json::to_value(entry)?);
        let rendered = serde_json::to_string_pretty(&entries)?;

        let io_err = |source| CredentialError::CacheIo {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, rendered).map_err(io_err)?;
        std::fs::rename(&tmp_path, &self.path).map_err(io_err)?;
        Ok(())
    }

    fn read_entries(&self) -> serde_json::Map<String, serde_json::Value> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return serde_json::Map::new(),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "credential cache unreadable; treating as empty"
                );
                return serde_json::Map::new();
            }
        };
        match serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "credential cache is not a JSON object; treating as empty"
                );
                serde_json::Map::new()
            }
        }
    }
}
