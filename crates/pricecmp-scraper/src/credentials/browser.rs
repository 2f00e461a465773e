//! Headless-Chrome credential acquisition.
//!
//! Both acquirers drive a real browser against the storefront: one watches
//! outgoing requests for the Shopify storefront token header, the other
//! collects the session cookies a first page load sets. `headless_chrome`
//! is blocking, so each session runs on the blocking pool.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::{Arc, LazyLock, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use headless_chrome::protocol::cdp::types::Event;
use headless_chrome::protocol::cdp::Network;
use headless_chrome::{Browser, LaunchOptions, Tab};
use regex::Regex;

use super::{CredentialAcquirer, Secret};
use crate::error::CredentialError;

pub const STOREFRONT_TOKEN_HEADER: &str = "x-shopify-storefront-access-token";

/// Time given to the page's own scripts after load so their API calls fire.
const DEFAULT_SETTLE: Duration = Duration::from_secs(2);

static PAGE_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"x-shopify-storefront-access-token["']:\s*["']([^"']+)["']"#)
        .expect("valid storefront token regex")
});

#[derive(Debug, Clone)]
pub struct BrowserSettings {
    pub headless: bool,
    pub chrome_path: Option<PathBuf>,
    pub settle: Duration,
}

impl BrowserSettings {
    #[must_use]
    pub fn new(headless: bool, chrome_path: Option<PathBuf>) -> Self {
        Self {
            headless,
            chrome_path,
            settle: DEFAULT_SETTLE,
        }
    }

    fn launch(&self) -> Result<Browser, String> {
        let mut options = LaunchOptions::default_builder()
            .headless(self.headless)
            .sandbox(false)
            .args(vec![
                OsStr::new("--no-sandbox"),
                OsStr::new("--disable-dev-shm-usage"),
            ])
            .build()
            .map_err(|e| format!("failed to build launch options: {e}"))?;
        if let Some(path) = &self.chrome_path {
            options.path = Some(path.clone());
        }
        Browser::new(options).map_err(|e| format!("failed to launch browser: {e}"))
    }

    fn new_tab(browser: &Browser) -> Result<Arc<Tab>, String> {
        browser
            .new_tab()
            .map_err(|e| format!("failed to open tab: {e}"))
    }

    /// Navigates `tab` to `url` and waits for load plus the settle time.
    fn load(&self, tab: &Tab, url: &str) -> Result<(), String> {
        tab.navigate_to(url)
            .map_err(|e| format!("navigation to {url} failed: {e}"))?;
        tab.wait_until_navigated()
            .map_err(|e| format!("page load of {url} failed: {e}"))?;
        std::thread::sleep(self.settle);
        Ok(())
    }
}

/// Reads the storefront token out of a request-header object, matching the
/// header name case-insensitively.
#[must_use]
pub fn token_from_request_headers(headers: &serde_json::Value) -> Option<String> {
    headers
        .as_object()?
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(STOREFRONT_TOKEN_HEADER))
        .and_then(|(_, value)| value.as_str())
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Finds a storefront token embedded in page source, e.g. in an inline
/// script's fetch headers.
#[must_use]
pub fn token_from_page_source(html: &str) -> Option<String> {
    PAGE_TOKEN_RE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Captures the storefront API token by loading the shop in a browser.
pub struct StorefrontTokenAcquirer {
    store_domain: String,
    settings: BrowserSettings,
}

impl StorefrontTokenAcquirer {
    pub fn new(store_domain: impl Into<String>, settings: BrowserSettings) -> Self {
        Self {
            store_domain: store_domain.into(),
            settings,
        }
    }
}

#[async_trait]
impl CredentialAcquirer for StorefrontTokenAcquirer {
    async fn acquire(&self, identity: &str) -> Result<Secret, CredentialError> {
        let url = format!("https://{}", self.store_domain);
        let settings = self.settings.clone();
        let outcome = tokio::task::spawn_blocking(move || capture_storefront_token(&settings, &url))
            .await
            .map_err(|e| acquisition_error(identity, format!("browser task failed: {e}")))?;

        match outcome {
            Ok(Some(token)) => Ok(Secret::Token(token)),
            Ok(None) => Err(acquisition_error(
                identity,
                "no storefront token in network traffic or page source".to_string(),
            )),
            Err(reason) => Err(acquisition_error(identity, reason)),
        }
    }
}

fn capture_storefront_token(
    settings: &BrowserSettings,
    url: &str,
) -> Result<Option<String>, String> {
    let browser = settings.launch()?;
    let tab = BrowserSettings::new_tab(&browser)?;
    tab.call_method(Network::Enable {
        max_total_buffer_size: None,
        max_resource_buffer_size: None,
        max_post_data_size: None,
        report_direct_socket_traffic: None,
        enable_durable_messages: None,
    })
    .map_err(|e| format!("failed to enable network events: {e}"))?;

    let captured: Arc<Mutex<Option<String>>> = Arc::default();
    let sink = Arc::clone(&captured);
    tab.add_event_listener(Arc::new(move |event: &Event| {
        if let Event::NetworkRequestWillBeSent(sent) = event {
            let token = serde_json::to_value(&sent.params.request.headers)
                .ok()
                .and_then(|headers| token_from_request_headers(&headers));
            if let (Some(token), Ok(mut slot)) = (token, sink.lock()) {
                slot.get_or_insert(token);
            }
        }
    }))
    .map_err(|e| format!("failed to watch network events: {e}"))?;

    settings.load(&tab, url)?;

    if let Some(token) = captured.lock().ok().and_then(|slot| slot.clone()) {
        tracing::debug!(url, "storefront token captured from request headers");
        return Ok(Some(token));
    }

    let html = tab
        .get_content()
        .map_err(|e| format!("failed to read page source: {e}"))?;
    let token = token_from_page_source(&html);
    if token.is_some() {
        tracing::debug!(url, "storefront token found in page source");
    }
    Ok(token)
}

/// Collects the cookies a site sets on first visit.
pub struct SessionCookieAcquirer {
    site_url: String,
    settings: BrowserSettings,
}

impl SessionCookieAcquirer {
    pub fn new(site_url: impl Into<String>, settings: BrowserSettings) -> Self {
        Self {
            site_url: site_url.into(),
            settings,
        }
    }
}

#[async_trait]
impl CredentialAcquirer for SessionCookieAcquirer {
    async fn acquire(&self, identity: &str) -> Result<Secret, CredentialError> {
        let url = self.site_url.clone();
        let settings = self.settings.clone();
        let cookies = tokio::task::spawn_blocking(move || capture_cookies(&settings, &url))
            .await
            .map_err(|e| acquisition_error(identity, format!("browser task failed: {e}")))?
            .map_err(|reason| acquisition_error(identity, reason))?;

        if cookies.is_empty() {
            return Err(acquisition_error(
                identity,
                format!("{} set no cookies", self.site_url),
            ));
        }
        tracing::debug!(identity, count = cookies.len(), "session cookies captured");
        Ok(Secret::Cookies(cookies))
    }
}

fn capture_cookies(
    settings: &BrowserSettings,
    url: &str,
) -> Result<BTreeMap<String, String>, String> {
    let browser = settings.launch()?;
    let tab = BrowserSettings::new_tab(&browser)?;
    settings.load(&tab, url)?;
    let cookies = tab
        .get_cookies()
        .map_err(|e| format!("failed to read cookies: {e}"))?;
    Ok(cookies
        .into_iter()
        .map(|cookie| (cookie.name, cookie.value))
        .collect())
}

fn acquisition_error(identity: &str, reason: String) -> CredentialError {
    CredentialError::Acquisition {
        identity: identity.to_string(),
        reason,
    }
}
