//! Response types for the two source search APIs.
//!
//! ## Storefront GraphQL `search`
//! Products sit at `data.search.edges[].node`. Non-product search hits come
//! back as `{}` under the `... on Product` fragment, so every field defaults.
//! `price.amount` is a decimal *string* (`"4.50"`); modelled as a raw
//! [`Value`] so a numeric amount parses too. `sku` is `null` on variants
//! without one.
//!
//! A failed query still returns 200 with a top-level `errors` array and no
//! `data`.
//!
//! ## Woolworths `Search/products`
//! PascalCase keys. `Products` is `null` when nothing matched. Each entry is
//! either a group (`{ "Products": [...] }`) or a bare product. `Stockcode` is
//! a number and `Price` is a number or `null` (unavailable items).
//! `SuggestedTerm` is non-null when the site offers a spelling correction.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StorefrontSearchResponse {
    pub data: Option<StorefrontData>,
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GraphQlError {
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StorefrontData {
    pub search: Option<SearchConnection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchConnection {
    pub edges: Vec<ProductEdge>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProductEdge {
    pub node: StorefrontProduct,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StorefrontProduct {
    pub id: Option<String>,
    pub title: Option<String>,
    pub handle: Option<String>,
    pub variants: VariantConnection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct VariantConnection {
    pub edges: Vec<VariantEdge>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct VariantEdge {
    pub node: StorefrontVariant,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StorefrontVariant {
    pub sku: Option<String>,
    pub price: Option<MoneyV2>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MoneyV2 {
    pub amount: Value,
    pub currency_code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct WoolworthsSearchResponse {
    pub products: Option<Vec<WoolworthsProductGroup>>,
    pub suggested_term: Option<String>,
    pub search_result_count: Option<u64>,
}

/// A result entry: a group of variants, or a single product when
/// `products` is absent.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct WoolworthsProductGroup {
    pub products: Option<Vec<WoolworthsProduct>>,
    #[serde(flatten)]
    pub product: WoolworthsProduct,
}

impl WoolworthsProductGroup {
    /// The products this entry stands for, in response order.
    #[must_use]
    pub fn into_products(self) -> Vec<WoolworthsProduct> {
        match self.products {
            Some(products) => products,
            None => vec![self.product],
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct WoolworthsProduct {
    pub stockcode: Value,
    pub display_name: Option<String>,
    pub price: Value,
}
