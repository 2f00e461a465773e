//! Integration tests for `StorefrontClient` against a wiremock GraphQL endpoint.
//!
//! Credentials come from a counting fake acquirer that mints `token-1`,
//! `token-2`, ... so token refreshes are observable from the mock side.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pricecmp_scraper::{
    CredentialAcquirer, CredentialCache, CredentialError, CredentialProvider, RetryPolicy,
    Secret, SourceClient, StorefrontClient,
};

const GRAPHQL_PATH: &str = "/api/2024-07/graphql.json";
const TOKEN_HEADER: &str = "x-shopify-storefront-access-token";

struct MintingAcquirer {
    calls: Arc<AtomicU32>,
}

#[async_trait]
impl CredentialAcquirer for MintingAcquirer {
    async fn acquire(&self, _identity: &str) -> Result<Secret, CredentialError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Secret::Token(format!("token-{n}")))
    }
}

struct BrokenAcquirer;

#[async_trait]
impl CredentialAcquirer for BrokenAcquirer {
    async fn acquire(&self, identity: &str) -> Result<Secret, CredentialError> {
        Err(CredentialError::Acquisition {
            identity: identity.to_string(),
            reason: "token not found in page".to_string(),
        })
    }
}

struct Harness {
    server: MockServer,
    calls: Arc<AtomicU32>,
    _dir: tempfile::TempDir,
    client: StorefrontClient,
}

async fn harness() -> Harness {
    harness_with_timeout(5).await
}

async fn harness_with_timeout(timeout_secs: u64) -> Harness {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let calls = Arc::new(AtomicU32::new(0));
    let provider = CredentialProvider::new(
        "shop.test",
        Box::new(MintingAcquirer {
            calls: Arc::clone(&calls),
        }),
        CredentialCache::new(dir.path().join("tokens.json")),
    );
    let client = StorefrontClient::with_endpoint(
        provider,
        timeout_secs,
        RetryPolicy::immediate(),
        &format!("{}{GRAPHQL_PATH}", server.uri()),
    )
    .expect("failed to build test StorefrontClient");
    Harness {
        server,
        calls,
        _dir: dir,
        client,
    }
}

fn search_response(products: &[(&str, &str, &str)]) -> serde_json::Value {
    let edges: Vec<_> = products
        .iter()
        .map(|(title, sku, amount)| {
            json!({
                "node": {
                    "id": "gid://shopify/Product/1",
                    "title": title,
                    "handle": "h",
                    "variants": { "edges": [
                        { "node": { "sku": sku, "price": { "amount": amount, "currencyCode": "AUD" } } }
                    ] }
                }
            })
        })
        .collect();
    json!({ "data": { "search": { "edges": edges } } })
}

// ---------------------------------------------------------------------------
// Happy path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn search_sends_token_and_returns_products() {
    let mut h = harness().await;
    let origin = h.server.uri();

    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(header(TOKEN_HEADER, "token-1"))
        .and(header("origin", origin.as_str()))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(json!({ "variables": { "query": "10038821", "first": 4 } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_response(&[
            ("Widget", "10038821", "4.50"),
            ("Widget Twin", "10038822", "5.00"),
        ])))
        .expect(1)
        .mount(&h.server)
        .await;

    let products = h
        .client
        .search("10038821", false, 3)
        .await
        .expect("credential ok")
        .expect("products");

    assert_eq!(products.len(), 2);
    assert_eq!(products[0].display_name, "Widget");
    assert_eq!(h.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn search_first_returns_only_the_first_product() {
    let mut h = harness().await;

    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_response(&[
            ("Widget", "1", "4.50"),
            ("Gadget", "2", "9.00"),
        ])))
        .mount(&h.server)
        .await;

    let product = h
        .client
        .search_first("1", 3)
        .await
        .expect("credential ok")
        .expect("a product");
    assert_eq!(product.source_sku, "1");
}

#[tokio::test]
async fn empty_search_returns_none() {
    let mut h = harness().await;

    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_response(&[])))
        .expect(1)
        .mount(&h.server)
        .await;

    let result = h.client.search("missing", false, 3).await.expect("credential ok");
    assert!(result.is_none());
}

// ---------------------------------------------------------------------------
// Recovery
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unauthorized_forces_token_refresh() {
    let mut h = harness().await;

    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(header(TOKEN_HEADER, "token-1"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(header(TOKEN_HEADER, "token-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_response(&[(
            "Widget", "1", "4.50",
        )])))
        .mount(&h.server)
        .await;

    let result = h.client.search("1", false, 3).await.expect("credential ok");

    assert!(result.is_some(), "refreshed token should succeed");
    assert_eq!(h.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn rate_limit_rotates_user_agent() {
    let mut h = harness().await;
    let first_agent = h.client.user_agent().to_string();

    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_response(&[(
            "Widget", "1", "4.50",
        )])))
        .mount(&h.server)
        .await;

    let result = h.client.search("1", false, 3).await.expect("credential ok");
    assert!(result.is_some());

    let requests = h.server.received_requests().await.expect("recording on");
    assert_eq!(requests.len(), 2);
    let agents: Vec<_> = requests
        .iter()
        .map(|r| r.headers.get("user-agent").and_then(|v| v.to_str().ok()).map(str::to_owned))
        .collect();
    assert_eq!(agents[0].as_deref(), Some(first_agent.as_str()));
    assert_ne!(agents[0], agents[1], "user-agent should change after 429");
    // 429 does not touch the token
    assert_eq!(h.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn three_server_errors_then_success_with_three_retries() {
    let mut h = harness().await;

    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(3)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_response(&[(
            "Widget", "1", "4.50",
        )])))
        .mount(&h.server)
        .await;

    let result = h.client.search("1", false, 3).await.expect("credential ok");
    assert!(result.is_some());
    let requests = h.server.received_requests().await.expect("recording on");
    assert_eq!(requests.len(), 4);
}

#[tokio::test]
async fn timed_out_request_is_retried() {
    let mut h = harness_with_timeout(1).await;

    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(search_response(&[("Stale", "0", "1.00")]))
                .set_delay(Duration::from_secs(3)),
        )
        .up_to_n_times(1)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_response(&[(
            "Widget", "1", "4.50",
        )])))
        .mount(&h.server)
        .await;

    let products = h
        .client
        .search("1", false, 3)
        .await
        .expect("credential ok")
        .expect("second attempt should succeed");

    assert_eq!(products[0].display_name, "Widget");
    let requests = h.server.received_requests().await.expect("recording on");
    assert_eq!(requests.len(), 2);
    // a timeout is not an auth failure
    assert_eq!(h.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn transport_failure_on_every_attempt_yields_none() {
    let mut h = harness_with_timeout(1).await;

    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .expect(2)
        .mount(&h.server)
        .await;

    let result = h.client.search("1", false, 1).await.expect("credential ok");
    assert!(result.is_none());
}

#[tokio::test]
async fn persistent_failure_yields_none_after_budget() {
    let mut h = harness().await;

    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(4)
        .mount(&h.server)
        .await;

    let result = h.client.search("1", false, 3).await.expect("credential ok");
    assert!(result.is_none());
}

#[tokio::test]
async fn non_json_body_is_not_retried() {
    let mut h = harness().await;

    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .expect(1)
        .mount(&h.server)
        .await;

    let result = h.client.search("1", false, 3).await.expect("credential ok");
    assert!(result.is_none());
}

// ---------------------------------------------------------------------------
// Credential failure
// ---------------------------------------------------------------------------

#[tokio::test]
async fn acquisition_failure_is_an_error() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let provider = CredentialProvider::new(
        "shop.test",
        Box::new(BrokenAcquirer),
        CredentialCache::new(dir.path().join("tokens.json")),
    );
    let mut client = StorefrontClient::with_endpoint(
        provider,
        5,
        RetryPolicy::immediate(),
        &format!("{}{GRAPHQL_PATH}", server.uri()),
    )
    .expect("client");

    let err = client.search("1", false, 3).await.unwrap_err();
    assert!(matches!(err, CredentialError::Acquisition { .. }));
    let requests = server.received_requests().await.expect("recording on");
    assert!(requests.is_empty(), "no request without a credential");
}
