use std::str::FromStr;

use rust_decimal::Decimal;

use super::*;

fn edge(title: &str, sku: Value, amount: Value) -> Value {
    json!({
        "node": {
            "id": "gid://shopify/Product/1",
            "title": title,
            "handle": "handle",
            "variants": {
                "edges": [
                    { "node": { "sku": sku, "price": { "amount": amount, "currencyCode": "AUD" } } }
                ]
            }
        }
    })
}

fn search_body(edges: Vec<Value>) -> Value {
    json!({ "data": { "search": { "edges": edges } } })
}

#[test]
fn parses_products_in_response_order() {
    let body = search_body(vec![
        edge("Widget", json!("W-1"), json!("4.50")),
        edge("Gadget", json!("G-2"), json!("10.00")),
    ]);
    let products = parse_search_response(&body);

    assert_eq!(products.len(), 2);
    assert_eq!(products[0].display_name, "Widget");
    assert_eq!(products[0].source_sku, "W-1");
    assert_eq!(products[0].price(), Decimal::from_str("4.50").unwrap());
    assert_eq!(products[1].display_name, "Gadget");
}

#[test]
fn product_without_variants_is_skipped() {
    let body = search_body(vec![
        json!({ "node": { "title": "No variants", "variants": { "edges": [] } } }),
        edge("Widget", json!("W-1"), json!("4.50")),
    ]);
    let products = parse_search_response(&body);
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].display_name, "Widget");
}

#[test]
fn non_product_hits_are_skipped() {
    let body = search_body(vec![json!({ "node": {} })]);
    assert!(parse_search_response(&body).is_empty());
}

#[test]
fn missing_sku_becomes_placeholder() {
    let body = search_body(vec![edge("Widget", Value::Null, json!("1.00"))]);
    let products = parse_search_response(&body);
    assert_eq!(products[0].source_sku, "N/A");
}

#[test]
fn numeric_amount_is_accepted() {
    let body = search_body(vec![edge("Widget", json!("W-1"), json!(2.5))]);
    let products = parse_search_response(&body);
    assert_eq!(products[0].price(), Decimal::from_str("2.5").unwrap());
}

#[test]
fn bad_and_negative_prices_are_skipped() {
    let body = search_body(vec![
        edge("Free text", json!("A"), json!("call us")),
        edge("Refund", json!("B"), json!("-3.00")),
        edge("Widget", json!("C"), json!("3.00")),
    ]);
    let products = parse_search_response(&body);
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].source_sku, "C");
}

#[test]
fn missing_search_data_yields_nothing() {
    assert!(parse_search_response(&json!({})).is_empty());
    assert!(parse_search_response(&json!({ "data": {} })).is_empty());
    assert!(parse_search_response(&json!({
        "errors": [{ "message": "Field 'search' doesn't exist" }]
    }))
    .is_empty());
}

#[test]
fn wrong_shape_yields_nothing() {
    assert!(parse_search_response(&json!([1, 2, 3])).is_empty());
    assert!(parse_search_response(&json!({ "data": { "search": { "edges": "x" } } })).is_empty());
}

#[test]
fn request_carries_query_and_lifecycle_filters() {
    let body = search_request("10038821");
    assert_eq!(body["variables"]["query"], "10038821");
    assert_eq!(body["variables"]["first"], 4);
    let filters = body["variables"]["filters"].as_array().unwrap();
    let values: Vec<_> = filters
        .iter()
        .map(|f| f["productMetafield"]["value"].as_str().unwrap())
        .collect();
    assert_eq!(values, ["Active", "active"]);
    assert!(body["query"].as_str().unwrap().contains("types: [PRODUCT]"));
}
