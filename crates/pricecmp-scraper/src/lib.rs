//! Source clients and credential providers for the price comparison.

pub mod credentials;
pub mod error;
mod retry;
pub mod sources;
pub mod types;
pub mod user_agent;

pub use credentials::{
    BrowserSettings, CachedCredential, Credential, CredentialAcquirer, CredentialCache,
    CredentialProvider, Secret, SessionCookieAcquirer, StaticTokenAcquirer,
    StorefrontTokenAcquirer,
};
pub use error::{CredentialError, ScraperError};
pub use retry::RetryPolicy;
pub use sources::{
    SourceClient, StorefrontClient, WoolworthsClient, REJECT_SHOP_DOMAIN, WOOLWORTHS_ORIGIN,
};
pub use user_agent::UserAgentPool;
