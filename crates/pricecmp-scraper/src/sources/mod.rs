//! Per-source search clients behind one [`SourceClient`] contract.

mod storefront;
mod woolworths;

use std::time::Duration;

use async_trait::async_trait;
use pricecmp_core::{parse_price, Product};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Response, StatusCode};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::error::{CredentialError, ScraperError};
use crate::retry::search_with_retries;

pub use storefront::{StorefrontClient, REJECT_SHOP_DOMAIN, STOREFRONT_API_VERSION};
pub use woolworths::{WoolworthsClient, WOOLWORTHS_ORIGIN, WOOLWORTHS_SEARCH_PATH};

/// A retail source that can be searched by free-text query.
///
/// Implementors supply one request/response round trip plus recovery
/// between attempts; [`SourceClient::search`] wraps them in the shared retry
/// loop.
#[async_trait]
pub trait SourceClient: Send {
    /// Name used in logs and as the report file stem.
    fn source_name(&self) -> &str;

    /// Name used in comparison report columns (`Price_<label>`).
    fn report_label(&self) -> &str {
        self.source_name()
    }

    /// Sends one search request and returns the decoded JSON body.
    ///
    /// # Errors
    ///
    /// Any [`ScraperError`]; [`ScraperError::Credential`] aborts the search.
    async fn send_search(&mut self, query: &str) -> Result<Value, ScraperError>;

    /// Extracts products from a response body. A body of the wrong shape
    /// yields no products.
    fn parse_response(&self, body: &Value, query: &str) -> Vec<Product>;

    /// Reacts to a failed attempt and returns how long to wait before the
    /// next one.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError`] if a forced credential refresh fails.
    async fn recover(&mut self, err: &ScraperError) -> Result<Duration, CredentialError>;

    /// Searches for `query`, retrying transient failures up to `max_retries`
    /// times after the first attempt.
    ///
    /// `None` means no data: nothing matched, the body was unusable, or every
    /// attempt failed. With `return_first` at most one product is returned.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError`] when no credential can be obtained.
    async fn search(
        &mut self,
        query: &str,
        return_first: bool,
        max_retries: u32,
    ) -> Result<Option<Vec<Product>>, CredentialError> {
        search_with_retries(self, query, return_first, max_retries).await
    }

    /// The first product for `query`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError`] when no credential can be obtained.
    async fn search_first(
        &mut self,
        query: &str,
        max_retries: u32,
    ) -> Result<Option<Product>, CredentialError> {
        let found = self.search(query, true, max_retries).await?;
        Ok(found.and_then(|products| products.into_iter().next()))
    }
}

/// Maps a search response to its JSON body or a typed error.
///
/// 401 becomes [`ScraperError::Unauthorized`], 429 becomes
/// [`ScraperError::RateLimited`] carrying any `Retry-After` seconds, and any
/// other non-2xx becomes [`ScraperError::UnexpectedStatus`].
pub(crate) async fn read_json_response(
    response: Response,
    source_name: &str,
) -> Result<Value, ScraperError> {
    let status = response.status();
    let url = response.url().to_string();

    if status == StatusCode::UNAUTHORIZED {
        return Err(ScraperError::Unauthorized {
            source_name: source_name.to_string(),
        });
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok());
        return Err(ScraperError::RateLimited {
            source_name: source_name.to_string(),
            retry_after_secs,
        });
    }

    if !status.is_success() {
        return Err(ScraperError::UnexpectedStatus {
            status: status.as_u16(),
            url,
        });
    }

    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|source| ScraperError::Deserialize {
        context: format!("{source_name} search response from {url}"),
        source,
    })
}

/// Reads a price given either as a JSON number or a decimal string.
pub(crate) fn price_from_json(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => parse_price(&n.to_string()).ok(),
        Value::String(s) => parse_price(s).ok(),
        _ => None,
    }
}

/// Builds a product, logging and skipping records with a negative price.
pub(crate) fn priced_product(
    source_name: &str,
    sku: String,
    name: String,
    price: Decimal,
) -> Option<Product> {
    match Product::new(sku, name, price) {
        Ok(product) => Some(product),
        Err(err) => {
            tracing::warn!(source = source_name, error = %err, "skipping product");
            None
        }
    }
}

pub(crate) fn header_value(name: &'static str, value: &str) -> Result<HeaderValue, ScraperError> {
    HeaderValue::from_str(value).map_err(|_| ScraperError::InvalidHeader { name })
}

/// Inserts static header pairs into `headers`.
pub(crate) fn insert_static(headers: &mut HeaderMap, pairs: &[(&'static str, &'static str)]) {
    for (name, value) in pairs {
        headers.insert(*name, HeaderValue::from_static(*value));
    }
}
