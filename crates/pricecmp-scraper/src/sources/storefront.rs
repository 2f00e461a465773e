//! Shopify Storefront GraphQL client for The Reject Shop.

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
use crate::credentials::{Credential, CredentialProvider, STOREFRONT_TOKEN_HEADER};
use crate::error::{CredentialError, ScraperError};
use crate::retry::RetryPolicy;
use crate::types::{StorefrontProduct, StorefrontSearchResponse};
use crate::user_agent::UserAgentPool;

pub const REJECT_SHOP_DOMAIN: &str = "therejectshop.myshopify.com";
pub const STOREFRONT_API_VERSION: &str = "2024-07";

const SOURCE_NAME: &str = "rejectshop";

/// Search hits requested per query.
const SEARCH_PAGE_SIZE: u32 = 4;

const SEARCH_QUERY: &str = r"query search(
  $query: String!
  $filters: [ProductFilter!]
  $first: Int
  $after: String
  $sortKey: SearchSortKeys
  $reverse: Boolean
) {
  search(
    query: $query
    productFilters: $filters
    first: $first
    after: $after
    sortKey: $sortKey
    reverse: $reverse
    types: [PRODUCT]
  ) {
    edges {
      node {
        ... on Product {
          id
          title
          handle
          variants(first: 1) {
            edges {
              node {
                sku
                price {
                  amount
                  currencyCode
                }
              }
            }
          }
        }
      }
    }
  }
}";

/// Client for a Shopify Storefront API `search` endpoint.
///
/// Owns its token provider and user-agent pool. A 401 forces a token
/// refresh before the next attempt; a 429 rotates the user-agent.
pub struct StorefrontClient {
    http: Client,
    endpoint: Url,
    origin: String,
    credentials: CredentialProvider,
    user_agents: UserAgentPool,
    retry: RetryPolicy,
}

impl StorefrontClient {
    /// Creates a client for The Reject Shop's production storefront.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(
        credentials: CredentialProvider,
        timeout_secs: u64,
        retry: RetryPolicy,
    ) -> Result<Self, ScraperError> {
        let endpoint =
            format!("https://{REJECT_SHOP_DOMAIN}/api/{STOREFRONT_API_VERSION}/graphql.json");
        Self::with_endpoint(credentials, timeout_secs, retry, &endpoint)
    }

    /// Creates a client posting to `endpoint` (for testing with wiremock).
    /// `origin` and `referer` headers are derived from it.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidEndpoint`] if `endpoint` is not an
    /// absolute URL, or [`ScraperError::Http`] if the client cannot be built.
    pub fn with_endpoint(
        credentials: CredentialProvider,
        timeout_secs: u64,
        retry: RetryPolicy,
        endpoint: &str,
    ) -> Result<Self, ScraperError> {
        let endpoint = Url::parse(endpoint).map_err(|e| ScraperError::InvalidEndpoint {
            url: endpoint.to_owned(),
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
        })
    }

    /// The user-agent the next request will carry.
    #[must_use]
    pub fn user_agent(&self) -> &str {
        self.user_agents.current()
    }

    fn build_headers(&self, credential: &Credential) -> Result<HeaderMap, ScraperError> {
        let mut headers = HeaderMap::new();
        insert_static(
            &mut headers,
            &[
                ("accept", "*/*"),
                ("accept-language", "en-US,en;q=0.9"),
                ("content-type", "application/json"),
            ],
        );
        headers.insert("origin", header_value("origin", &self.origin)?);
        headers.insert(
            "referer",
            header_value("referer", &format!("{}/", self.origin))?,
        );
        headers.insert(
            "user-agent",
            header_value("user-agent", self.user_agents.current())?,
        );
        let token = credential.token().unwrap_or_default();
        headers.insert(
            STOREFRONT_TOKEN_HEADER,
            header_value(STOREFRONT_TOKEN_HEADER, token)?,
        );
        Ok(headers)
    }
}

/// GraphQL request body for a product search.
fn search_request(query: &str) -> Value {
    json!({
        "query": SEARCH_QUERY,
        "variables": {
            "query": query,
            "first": SEARCH_PAGE_SIZE,
            "filters": [
                {
                    "productMetafield": {
                        "namespace": "custom",
                        "key": "product_lifecycle_status",
                        "value": "Active"
                    }
                },
                {
                    "productMetafield": {
                        "namespace": "custom",
                        "key": "product_lifecycle_status",
                        "value": "active"
                    }
                }
            ],
            "after": null,
            "sortKey": null,
            "reverse": false
        }
    })
}

/// Products from a `search` response, in response order.
///
/// Products without variants are skipped, as are variants without a
/// parsable non-negative price.
fn parse_search_response(body: &Value) -> Vec<Product> {
    let response = match StorefrontSearchResponse::deserialize(body) {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(source = SOURCE_NAME, error = %e, "unexpected search response shape");
            return Vec::new();
        }
    };

    for error in &response.errors {
        tracing::warn!(source = SOURCE_NAME, message = %error.message, "graphql error");
    }

    let Some(search) = response.data.and_then(|data| data.search) else {
        tracing::warn!(source = SOURCE_NAME, "search response carries no data.search");
        return Vec::new();
    };

    search
        .edges
        .into_iter()
        .filter_map(|edge| product_from_node(edge.node))
        .collect()
}

fn product_from_node(node: StorefrontProduct) -> Option<Product> {
    let title = node.title.unwrap_or_default();
    let Some(variant) = node.variants.edges.into_iter().next().map(|edge| edge.node) else {
        tracing::debug!(source = SOURCE_NAME, title = %title, "skipping product without variants");
        return None;
    };

    let Some(price) = variant
        .price
        .as_ref()
        .and_then(|money| price_from_json(&money.amount))
    else {
        tracing::warn!(source = SOURCE_NAME, title = %title, "skipping variant without a usable price");
        return None;
    };

    let sku = variant
        .sku
        .filter(|sku| !sku.trim().is_empty())
        .unwrap_or_else(|| "N/A".to_string());
    priced_product(SOURCE_NAME, sku, title, price)
}

#[async_trait]
impl SourceClient for StorefrontClient {
    fn source_name(&self) -> &str {
        SOURCE_NAME
    }

    fn report_label(&self) -> &str {
        "RejectShop"
    }

    async fn send_search(&mut self, query: &str) -> Result<Value, ScraperError> {
        let credential = self.credentials.get_credential(false).await?;
        let headers = self.build_headers(&credential)?;
        tracing::debug!(source = SOURCE_NAME, query, "searching storefront");

        let response = self
            .http
            .post(self.endpoint.clone())
            .headers(headers)
            .json(&search_request(query))
            .send()
            .await?;
        read_json_response(response, SOURCE_NAME).await
    }

    fn parse_response(&self, body: &Value, _query: &str) -> Vec<Product> {
        parse_search_response(body)
    }

    async fn recover(&mut self, err: &ScraperError) -> Result<Duration, CredentialError> {
        match err {
            ScraperError::Unauthorized { .. } => {
                tracing::info!(source = SOURCE_NAME, "storefront token rejected; refreshing");
                self.credentials.get_credential(true).await?;
                Ok(self.retry.backoff)
            }
            ScraperError::RateLimited {
                retry_after_secs, ..
            } => {
                let user_agent = self.user_agents.rotate();
                tracing::info!(source = SOURCE_NAME, user_agent, "rate limited; rotated user-agent");
                Ok(RetryPolicy::rate_limit_delay(
                    self.retry.backoff,
                    *retry_after_secs,
                ))
            }
            _ => Ok(self.retry.backoff),
        }
    }
}

#[cfg(test)]
#[path = "storefront_test.rs"]
mod tests;
