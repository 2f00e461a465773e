use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::CoreError;

/// A priced product observed at one source.
///
/// `internal_id` is minted when the product is first observed and is the
/// join key between sources; a second source's record adopts the id of the
/// record it was looked up from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    internal_id: Uuid,
    /// Source-local catalog code (`"N/A"` when the source omits one).
    pub source_sku: String,
    pub display_name: String,
    price: Decimal,
    pub observed_at: DateTime<Utc>,
}

impl Product {
    /// Creates a product observed now, with a fresh internal id.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NegativePrice`] if `price` is below zero.
    pub fn new(
        source_sku: impl Into<String>,
        display_name: impl Into<String>,
        price: Decimal,
    ) -> Result<Self, CoreError> {
        let source_sku = source_sku.into();
        if price < Decimal::ZERO {
            return Err(CoreError::NegativePrice {
                sku: source_sku,
                price: price.to_string(),
            });
        }
        Ok(Self {
            internal_id: Uuid::new_v4(),
            source_sku,
            display_name: display_name.into(),
            price,
            observed_at: Utc::now(),
        })
    }

    #[must_use]
    pub fn with_observed_at(mut self, observed_at: DateTime<Utc>) -> Self {
        self.observed_at = observed_at;
        self
    }

    #[must_use]
    pub fn internal_id(&self) -> Uuid {
        self.internal_id
    }

    #[must_use]
    pub fn price(&self) -> Decimal {
        self.price
    }

    /// Takes over `primary`'s internal id so the two records join in a
    /// comparison.
    pub fn adopt_identity_of(&mut self, primary: &Product) {
        self.internal_id = primary.internal_id;
    }
}

/// Products retrieved from one source during a run, in retrieval order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCatalog {
    pub source_name: String,
    pub products: Vec<Product>,
}

impl SourceCatalog {
    #[must_use]
    pub fn new(source_name: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            products: Vec::new(),
        }
    }

    pub fn push(&mut self, product: Product) {
        self.products.push(product);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// First product carrying `internal_id`, if any.
    #[must_use]
    pub fn find(&self, internal_id: Uuid) -> Option<&Product> {
        self.products.iter().find(|p| p.internal_id == internal_id)
    }
}
