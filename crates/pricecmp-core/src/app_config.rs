use std::path::PathBuf;

/// Reject Shop catalog codes compared when `PRICECMP_SKUS` is not set.
pub const DEFAULT_SKUS: &[&str] = &[
    "30087959", "30061292", "30115549", "30121649", "30115976", "30148814", "30140778", "30132927",
    "30107779", "30043588", "30035731", "30142504", "30061641", "30110732", "30140779", "30142505",
    "30113527",
];

#[derive(Clone)]
pub struct AppConfig {
    pub log_level: String,
    /// Directory the per-source and aggregated JSON reports are written to.
    pub data_dir: PathBuf,
    pub token_cache_path: PathBuf,
    /// Source A catalog codes, in the order they are queried.
    pub skus: Vec<String>,
    pub request_timeout_secs: u64,
    /// Additional attempts after the first failed request.
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub rate_limit_backoff_ms: u64,
    pub session_ttl_secs: u64,
    pub chrome_path: Option<PathBuf>,
    pub browser_headless: bool,
    /// Pre-issued storefront token; skips the browser when set.
    pub storefront_token: Option<String>,
    pub woolworths_exact_name: bool,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("log_level", &self.log_level)
            .field("data_dir", &self.data_dir)
            .field("token_cache_path", &self.token_cache_path)
            .field("skus", &self.skus)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("rate_limit_backoff_ms", &self.rate_limit_backoff_ms)
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("chrome_path", &self.chrome_path)
            .field("browser_headless", &self.browser_headless)
            .field(
                "storefront_token",
                &self.storefront_token.as_ref().map(|_| "[redacted]"),
            )
            .field("woolworths_exact_name", &self.woolworths_exact_name)
            .finish()
    }
}
