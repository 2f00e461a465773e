//! Bounded retry loop shared by the source clients.
//!
//! A search is attempted once plus up to `max_retries` more times. Between
//! attempts the client gets a chance to recover (refresh its credential,
//! rotate its user-agent) and names the delay to wait. Exhausting the budget
//! degrades to "no result"; only a credential failure is returned as an error.

use std::time::Duration;

use pricecmp_core::Product;

use crate::error::{CredentialError, ScraperError};
use crate::sources::SourceClient;

/// Upper bound on a server-supplied `Retry-After` delay.
const MAX_RETRY_AFTER_SECS: u64 = 10;

/// Delays a client waits between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Wait after an ordinary failure (5xx, transport error, 401).
    pub backoff: Duration,
    /// Wait after a 429 when the server gives no `Retry-After`.
    pub rate_limit_backoff: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn from_millis(backoff_ms: u64, rate_limit_backoff_ms: u64) -> Self {
        Self {
            backoff: Duration::from_millis(backoff_ms),
            rate_limit_backoff: Duration::from_millis(rate_limit_backoff_ms),
        }
    }

    /// No waiting at all; used by tests.
    #[must_use]
    pub fn immediate() -> Self {
        Self::from_millis(0, 0)
    }

    /// Delay after a 429: the server's `Retry-After` (capped) when present,
    /// otherwise `base`.
    #[must_use]
    pub fn rate_limit_delay(base: Duration, retry_after_secs: Option<u64>) -> Duration {
        retry_after_secs.map_or(base, |secs| {
            Duration::from_secs(secs.min(MAX_RETRY_AFTER_SECS))
        })
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_millis(1_000, 3_000)
    }
}

/// Runs `client`'s search for `query` until it yields data, the body turns
/// out not to be JSON, or the retry budget runs out.
///
/// # Errors
///
/// Returns [`CredentialError`] when the client cannot obtain a credential.
pub(crate) async fn search_with_retries<C>(
    client: &mut C,
    query: &str,
    return_first: bool,
    max_retries: u32,
) -> Result<Option<Vec<Product>>, CredentialError>
where
    C: SourceClient + ?Sized,
{
    let mut attempt = 0u32;

    loop {
        let err = match client.send_search(query).await {
            Ok(body) => {
                let mut products = client.parse_response(&body, query);
                if products.is_empty() {
                    tracing::info!(source = client.source_name(), query, "no products found");
                    return Ok(None);
                }
                if return_first {
                    products.truncate(1);
                }
                return Ok(Some(products));
            }
            Err(ScraperError::Credential(err)) => return Err(err),
            Err(err @ ScraperError::Deserialize { .. }) => {
                tracing::warn!(
                    source = client.source_name(),
                    query,
                    error = %err,
                    "response body is not JSON; treating as no data"
                );
                return Ok(None);
            }
            Err(err) => err,
        };

        if attempt >= max_retries {
            tracing::warn!(
                source = client.source_name(),
                query,
                attempts = attempt + 1,
                error = %err,
                "search failed; retries exhausted"
            );
            return Ok(None);
        }

        let delay = client.recover(&err).await?;
        tracing::warn!(
            source = client.source_name(),
            query,
            attempt,
            max_retries,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "search attempt failed; retrying after backoff"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use serde_json::{json, Value};

    use super::*;

    /// Replays a fixed script of outcomes, one per `send_search`.
    struct ScriptedClient {
        script: VecDeque<Result<Value, ScraperError>>,
        sends: u32,
        recoveries: Vec<String>,
    }

    impl ScriptedClient {
        fn new(script: Vec<Result<Value, ScraperError>>) -> Self {
            Self {
                script: script.into(),
                sends: 0,
                recoveries: Vec::new(),
            }
        }
    }

    fn server_error() -> ScraperError {
        ScraperError::UnexpectedStatus {
            status: 500,
            url: "http://test/search".to_string(),
        }
    }

    fn names(count: usize) -> Value {
        json!((0..count).map(|i| format!("item {i}")).collect::<Vec<_>>())
    }

    #[async_trait]
    impl SourceClient for ScriptedClient {
        fn source_name(&self) -> &str {
            "scripted"
        }

        async fn send_search(&mut self, _query: &str) -> Result<Value, ScraperError> {
            self.sends += 1;
            self.script.pop_front().unwrap_or_else(|| Err(server_error()))
        }

        fn parse_response(&self, body: &Value, _query: &str) -> Vec<Product> {
            body.as_array()
                .into_iter()
                .flatten()
                .filter_map(Value::as_str)
                .map(|name| Product::new("N/A", name, Decimal::ONE).unwrap())
                .collect()
        }

        async fn recover(&mut self, err: &ScraperError) -> Result<Duration, CredentialError> {
            self.recoveries.push(err.to_string());
            Ok(Duration::ZERO)
        }
    }

    #[tokio::test]
    async fn first_success_returns_all_products() {
        let mut client = ScriptedClient::new(vec![Ok(names(3))]);
        let found = search_with_retries(&mut client, "q", false, 3).await.unwrap();
        assert_eq!(found.unwrap().len(), 3);
        assert_eq!(client.sends, 1);
    }

    #[tokio::test]
    async fn return_first_keeps_only_the_first_product() {
        let mut client = ScriptedClient::new(vec![Ok(names(3))]);
        let found = search_with_retries(&mut client, "q", true, 3)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].display_name, "item 0");
    }

    #[tokio::test]
    async fn three_failures_then_success_succeeds_with_three_retries() {
        let mut client = ScriptedClient::new(vec![
            Err(server_error()),
            Err(server_error()),
            Err(server_error()),
            Ok(names(1)),
        ]);
        let found = search_with_retries(&mut client, "q", false, 3).await.unwrap();
        assert!(found.is_some());
        assert_eq!(client.sends, 4);
        assert_eq!(client.recoveries.len(), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_yield_none() {
        let mut client = ScriptedClient::new(vec![]);
        let found = search_with_retries(&mut client, "q", false, 3).await.unwrap();
        assert!(found.is_none());
        assert_eq!(client.sends, 4);
    }

    #[tokio::test]
    async fn zero_retries_makes_a_single_attempt() {
        let mut client = ScriptedClient::new(vec![Err(server_error()), Ok(names(1))]);
        let found = search_with_retries(&mut client, "q", false, 0).await.unwrap();
        assert!(found.is_none());
        assert_eq!(client.sends, 1);
        assert!(client.recoveries.is_empty());
    }

    #[tokio::test]
    async fn empty_result_is_none_without_retrying() {
        let mut client = ScriptedClient::new(vec![Ok(json!([]))]);
        let found = search_with_retries(&mut client, "q", false, 3).await.unwrap();
        assert!(found.is_none());
        assert_eq!(client.sends, 1);
    }

    #[tokio::test]
    async fn non_json_body_is_not_retried() {
        let source = serde_json::from_str::<Value>("<html>").unwrap_err();
        let mut client = ScriptedClient::new(vec![
            Err(ScraperError::Deserialize {
                context: "test".to_string(),
                source,
            }),
            Ok(names(1)),
        ]);
        let found = search_with_retries(&mut client, "q", false, 3).await.unwrap();
        assert!(found.is_none());
        assert_eq!(client.sends, 1);
    }

    #[tokio::test]
    async fn credential_failure_is_returned() {
        let mut client = ScriptedClient::new(vec![Err(ScraperError::Credential(
            CredentialError::Acquisition {
                identity: "shop".to_string(),
                reason: "browser unavailable".to_string(),
            },
        ))]);
        let err = search_with_retries(&mut client, "q", false, 3)
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::Acquisition { .. }));
    }

    #[test]
    fn retry_after_is_capped() {
        let base = Duration::from_secs(3);
        assert_eq!(RetryPolicy::rate_limit_delay(base, None), base);
        assert_eq!(
            RetryPolicy::rate_limit_delay(base, Some(2)),
            Duration::from_secs(2)
        );
        assert_eq!(
            RetryPolicy::rate_limit_delay(base, Some(120)),
            Duration::from_secs(MAX_RETRY_AFTER_SECS)
        );
    }
}
