//! Builds the two source clients from [`AppConfig`].

use pricecmp_core::AppConfig;
use pricecmp_scraper::{
    BrowserSettings, CredentialAcquirer, CredentialCache, CredentialProvider, RetryPolicy,
    SessionCookieAcquirer, StaticTokenAcquirer, StorefrontClient, StorefrontTokenAcquirer,
    WoolworthsClient, REJECT_SHOP_DOMAIN, WOOLWORTHS_ORIGIN,
};

/// Cache key for the Woolworths session cookies.
pub const WOOLWORTHS_IDENTITY: &str = "www.woolworths.com.au";

fn retry_policy(config: &AppConfig) -> RetryPolicy {
    RetryPolicy::from_millis(config.retry_backoff_ms, config.rate_limit_backoff_ms)
}

fn browser_settings(config: &AppConfig, headless: bool) -> BrowserSettings {
    BrowserSettings::new(headless, config.chrome_path.clone())
}

/// Storefront token acquisition: the configured token when set, otherwise a
/// headless browser visit to the store.
pub fn storefront_acquirer(config: &AppConfig) -> Box<dyn CredentialAcquirer> {
    match &config.storefront_token {
        Some(token) => {
            tracing::debug!("using configured storefront token");
            Box::new(StaticTokenAcquirer::new(token.clone()))
        }
        None => Box::new(StorefrontTokenAcquirer::new(
            REJECT_SHOP_DOMAIN,
            browser_settings(config, true),
        )),
    }
}

/// # Errors
///
/// Returns an error if the HTTP client cannot be built.
pub fn build_storefront_client(config: &AppConfig) -> anyhow::Result<StorefrontClient> {
    let provider = CredentialProvider::new(
        REJECT_SHOP_DOMAIN,
        storefront_acquirer(config),
        CredentialCache::new(config.token_cache_path.clone()),
    );
    Ok(StorefrontClient::new(
        provider,
        config.request_timeout_secs,
        retry_policy(config),
    )?)
}

/// # Errors
///
/// Returns an error if the session TTL is out of range or the HTTP client
/// cannot be built.
pub fn build_woolworths_client(config: &AppConfig) -> anyhow::Result<WoolworthsClient> {
    let ttl = chrono::Duration::try_seconds(i64::try_from(config.session_ttl_secs)?)
        .ok_or_else(|| anyhow::anyhow!("session TTL {}s is out of range", config.session_ttl_secs))?;
    let provider = CredentialProvider::new(
        WOOLWORTHS_IDENTITY,
        Box::new(SessionCookieAcquirer::new(
            WOOLWORTHS_ORIGIN,
            browser_settings(config, config.browser_headless),
        )),
        CredentialCache::new(config.token_cache_path.clone()),
    )
    .with_validity(ttl);
    Ok(
        WoolworthsClient::new(provider, config.request_timeout_secs, retry_policy(config))?
            .with_exact_name(config.woolworths_exact_name),
    )
}
