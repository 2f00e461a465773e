//! Woolworths (AU) product search client.

use std::time::Duration;

use async_trait::async_trait;
use pricecmp_core::Product;
use reqwest::header::HeaderMap;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{
    header_value, insert_static, price_from_json, priced_product, read_json_response, SourceClient,
};
use crate::credentials::{Credential, CredentialProvider};
use crate::error::{CredentialError, ScraperError};
use crate::retry::RetryPolicy;
use crate::types::{WoolworthsProduct, WoolworthsSearchResponse};
use crate::user_agent::UserAgentPool;

pub const WOOLWORTHS_ORIGIN: &str = "https://www.woolworths.com.au";
pub const WOOLWORTHS_SEARCH_PATH: &str = "/apis/ui/Search/products";

const SOURCE_NAME: &str = "woolworths";

const PAGE_SIZE: u32 = 5;

/// Client for the Woolworths web search API.
///
/// Requests carry browser-session cookies from the owned provider. A 429
/// rotates the user-agent and refreshes the session; 401 and 403 refresh
/// the session.
pub struct WoolworthsClient {
    http: Client,
    endpoint: Url,
    origin: String,
    credentials: CredentialProvider,
    user_agents: UserAgentPool,
    retry: RetryPolicy,
    exact_name: bool,
}

impl WoolworthsClient {
    /// Creates a client for the production site.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(
        credentials: CredentialProvider,
        timeout_secs: u64,
        retry: RetryPolicy,
    ) -> Result<Self, ScraperError> {
        Self::with_origin(credentials, timeout_secs, retry, WOOLWORTHS_ORIGIN)
    }

    /// Creates a client against another origin (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidEndpoint`] if `origin` is not an
    /// absolute URL, or [`ScraperError::Http`] if the client cannot be built.
    pub fn with_origin(
        credentials: CredentialProvider,
        timeout_secs: u64,
        retry: RetryPolicy,
        origin: &str,
    ) -> Result<Self, ScraperError> {
        let raw = format!("{}{WOOLWORTHS_SEARCH_PATH}", origin.trim_end_matches('/'));
        let endpoint = Url::parse(&raw).map_err(|e| ScraperError::InvalidEndpoint {
            url: raw.clone(),
            reason: e.to_string(),
        })?;
        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            origin: endpoint.origin().ascii_serialization(),
            endpoint,
            credentials,
            user_agents: UserAgentPool::desktop(),
            retry,
            exact_name: false,
        })
    }

    /// Keep only products whose display name equals the query.
    #[must_use]
    pub fn with_exact_name(mut self, exact_name: bool) -> Self {
        self.exact_name = exact_name;
        self
    }

    #[must_use]
    pub fn user_agent(&self) -> &str {
        self.user_agents.current()
    }

    fn build_headers(&self, credential: &Credential) -> Result<HeaderMap, ScraperError> {
        let mut headers = HeaderMap::new();
        insert_static(
            &mut headers,
            &[
                ("accept", "application/json, text/plain, */*"),
                ("accept-language", "en-US,en;q=0.9"),
                ("content-type", "application/json"),
                ("priority", "u=1, i"),
                ("sec-ch-ua-mobile", "?0"),
                ("sec-ch-ua-platform", "\"macOS\""),
                ("sec-fetch-dest", "empty"),
                ("sec-fetch-mode", "cors"),
                ("sec-fetch-site", "same-origin"),
            ],
        );
        headers.insert("origin", header_value("origin", &self.origin)?);
        headers.insert(
            "user-agent",
            header_value("user-agent", self.user_agents.current())?,
        );
        if let Some(cookies) = credential.cookie_header() {
            headers.insert("cookie", header_value("cookie", &cookies)?);
        }
        Ok(headers)
    }
}

fn search_payload(search_term: &str) -> Value {
    json!({
        "Filters": [],
        "IsSpecial": false,
        "Location": format!("/shop/search/products?searchTerm={search_term}"),
        "PageNumber": 1,
        "PageSize": PAGE_SIZE,
        "SearchTerm": search_term,
        "SortType": "TraderRelevance",
        "IsRegisteredRewardCardPromotion": null,
        "ExcludeSearchTypes": ["UntraceableVendors"],
        "GpBoost": 0,
        "GroupEdmVariants": true,
        "EnableAdReRanking": false,
        "flags": { "EnableProductBoostExperiment": false }
    })
}

/// Products from a search response, groups flattened in response order.
///
/// A response carrying a `SuggestedTerm` counts as no result. With
/// `exact_name`, only products named exactly `query` are kept.
fn parse_search_response(body: &Value, query: &str, exact_name: bool) -> Vec<Product> {
    let response = match WoolworthsSearchResponse::deserialize(body) {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(source = SOURCE_NAME, error = %e, "unexpected search response shape");
            return Vec::new();
        }
    };

    if let Some(suggested_term) = response.suggested_term.as_deref() {
        tracing::info!(
            source = SOURCE_NAME,
            query,
            suggested_term,
            "site suggested a different search term; treating as no result"
        );
        return Vec::new();
    }

    let Some(groups) = response.products else {
        return Vec::new();
    };

    groups
        .into_iter()
        .flat_map(|group| group.into_products())
        .filter(|product| !exact_name || product.display_name.as_deref() == Some(query))
        .filter_map(product_from_entry)
        .collect()
}

fn product_from_entry(entry: WoolworthsProduct) -> Option<Product> {
    let name = entry.display_name.unwrap_or_default();
    let sku = match entry.stockcode {
        Value::Number(n) => n.to_string(),
        Value::String(s) if !s.trim().is_empty() => s,
        _ => "N/A".to_string(),
    };
    let Some(price) = price_from_json(&entry.price) else {
        tracing::warn!(source = SOURCE_NAME, sku = %sku, name = %name, "skipping product without a usable price");
        return None;
    };
    priced_product(SOURCE_NAME, sku, name, price)
}

#[async_trait]
impl SourceClient for WoolworthsClient {
    fn source_name(&self) -> &str {
        SOURCE_NAME
    }

    fn report_label(&self) -> &str {
        "Woolworths"
    }

    async fn send_search(&mut self, query: &str) -> Result<Value, ScraperError> {
        let credential = self.credentials.get_credential(false).await?;
        let headers = self.build_headers(&credential)?;
        tracing::debug!(source = SOURCE_NAME, query, "searching woolworths");

        let response = self
            .http
            .post(self.endpoint.clone())
            .headers(headers)
            .json(&search_payload(query))
            .send()
            .await?;
        read_json_response(response, SOURCE_NAME).await
    }

    fn parse_response(&self, body: &Value, query: &str) -> Vec<Product> {
        parse_search_response(body, query, self.exact_name)
    }

    async fn recover(&mut self, err: &ScraperError) -> Result<Duration, CredentialError> {
        match err {
            ScraperError::RateLimited {
                retry_after_secs, ..
            } => {
                let user_agent = self.user_agents.rotate();
                tracing::info!(source = SOURCE_NAME, user_agent, "rate limited; rotated user-agent");
                self.credentials.get_credential(true).await?;
                Ok(RetryPolicy::rate_limit_delay(
                    self.retry.rate_limit_backoff,
                    *retry_after_secs,
                ))
            }
            ScraperError::Unauthorized { .. } | ScraperError::UnexpectedStatus { status: 403, .. } => {
                tracing::info!(source = SOURCE_NAME, "session rejected; refreshing cookies");
                self.credentials.get_credential(true).await?;
                Ok(self.retry.backoff)
            }
            _ => Ok(self.retry.backoff),
        }
    }
}

#[cfg(test)]
#[path = "woolworths_test.rs"]
mod tests;
