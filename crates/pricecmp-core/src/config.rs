use crate::app_config::{AppConfig, DEFAULT_SKUS};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but cannot be parsed.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but cannot be parsed.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a plain
/// `HashMap` lookup.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but cannot be parsed.
pub fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_bool = |var: &str, default: bool| -> Result<bool, ConfigError> {
        match lookup(var) {
            Err(_) => Ok(default),
            Ok(raw) => parse_flag(&raw).ok_or_else(|| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: format!("expected true/false, got \"{raw}\""),
            }),
        }
    };

    let non_empty = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let log_level = or_default("PRICECMP_LOG_LEVEL", "info");
    let data_dir = PathBuf::from(or_default("PRICECMP_DATA_DIR", "./data"));
    let token_cache_path = PathBuf::from(or_default(
        "PRICECMP_TOKEN_CACHE_PATH",
        "./data/tokens/shopify_tokens.json",
    ));

    let skus = match non_empty("PRICECMP_SKUS") {
        Some(raw) => parse_sku_list(&raw)?,
        None => DEFAULT_SKUS.iter().map(|s| (*s).to_string()).collect(),
    };

    let request_timeout_secs = parse_u64("PRICECMP_REQUEST_TIMEOUT_SECS", "10")?;
    if request_timeout_secs == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "PRICECMP_REQUEST_TIMEOUT_SECS".to_string(),
            reason: "timeout must be at least 1 second".to_string(),
        });
    }
    let max_retries = parse_u32("PRICECMP_MAX_RETRIES", "3")?;
    let retry_backoff_ms = parse_u64("PRICECMP_RETRY_BACKOFF_MS", "1000")?;
    let rate_limit_backoff_ms = parse_u64("PRICECMP_RATE_LIMIT_BACKOFF_MS", "3000")?;
    let session_ttl_secs = parse_u64("PRICECMP_SESSION_TTL_SECS", "3600")?;
    let chrome_path = non_empty("PRICECMP_CHROME_PATH").map(PathBuf::from);
    let browser_headless = parse_bool("PRICECMP_BROWSER_HEADLESS", true)?;
    let storefront_token = non_empty("PRICECMP_STOREFRONT_TOKEN");
    let woolworths_exact_name = parse_bool("PRICECMP_WOOLWORTHS_EXACT_NAME", false)?;

    Ok(AppConfig {
        log_level,
        data_dir,
        token_cache_path,
        skus,
        request_timeout_secs,
        max_retries,
        retry_backoff_ms,
        rate_limit_backoff_ms,
        session_ttl_secs,
        chrome_path,
        browser_headless,
        storefront_token,
        woolworths_exact_name,
    })
}

/// Parse a boolean flag. Accepts `true/false`, `1/0`, `yes/no` (case-insensitive).
fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Split a comma-separated SKU list, dropping blanks.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` if no SKU survives trimming.
fn parse_sku_list(raw: &str) -> Result<Vec<String>, ConfigError> {
    let skus: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if skus.is_empty() {
        return Err(ConfigError::InvalidEnvVar {
            var: "PRICECMP_SKUS".to_string(),
            reason: "no SKUs listed".to_string(),
        });
    }
    Ok(skus)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
