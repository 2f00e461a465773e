use std::path::PathBuf;

use thiserror::Error;

/// Failures obtaining or persisting a source credential.
///
/// These are hard failures: a source client cannot search without one.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("could not acquire credential for {identity}: {reason}")]
    Acquisition { identity: String, reason: String },

    #[error("credential cache I/O error at {}: {source}", path.display())]
    CacheIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("credential cache serialization error: {0}")]
    CacheSerialize(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unauthorized by {source_name}")]
    Unauthorized { source_name: String },

    #[error("rate limited by {source_name}")]
    RateLimited {
        source_name: String,
        retry_after_secs: Option<u64>,
    },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid value for header {name}")]
    InvalidHeader { name: &'static str },

    #[error("invalid endpoint \"{url}\": {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error(transparent)]
    Credential(#[from] CredentialError),
}
