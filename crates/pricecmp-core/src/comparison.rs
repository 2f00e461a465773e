//! Joins two source catalogs into per-product price comparisons.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::products::SourceCatalog;

/// Which of the two compared sources a value refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    A,
    B,
}

/// One row of the comparison: a source A product and, when found, the
/// source B price for the same internal id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonRecord {
    pub sku: String,
    pub display_name: String,
    pub price_a: Decimal,
    pub price_b: Option<Decimal>,
    /// `|price_a - price_b|`; present only when both prices are.
    pub difference: Option<Decimal>,
    /// Strictly cheaper side; `None` on equal prices or a missing match.
    pub cheaper: Option<Side>,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub source_a: String,
    pub source_b: String,
    pub records: Vec<ComparisonRecord>,
}

impl Comparison {
    /// Name of the source on `side`.
    #[must_use]
    pub fn source_name(&self, side: Side) -> &str {
        match side {
            Side::A => &self.source_a,
            Side::B => &self.source_b,
        }
    }

    /// Number of records that found a counterpart in source B.
    #[must_use]
    pub fn matched_count(&self) -> usize {
        self.records.iter().filter(|r| r.price_b.is_some()).count()
    }
}

/// Builds one [`ComparisonRecord`] per product in `a`, in `a`'s order.
///
/// Each product is joined to the first product in `b` sharing its internal
/// id. `date` stamps every record.
#[must_use]
pub fn compare_catalogs(a: &SourceCatalog, b: &SourceCatalog, date: NaiveDate) -> Comparison {
    let records = a
        .products
        .iter()
        .map(|product| {
            let price_a = product.price();
            let price_b = b.find(product.internal_id()).map(crate::Product::price);
            let difference = price_b.map(|pb| (price_a - pb).abs());
            let cheaper = price_b.and_then(|pb| cheaper_side(price_a, pb));
            ComparisonRecord {
                sku: product.source_sku.clone(),
                display_name: product.display_name.clone(),
                price_a,
                price_b,
                difference,
                cheaper,
                date,
            }
        })
        .collect();

    Comparison {
        source_a: a.source_name.clone(),
        source_b: b.source_name.clone(),
        records,
    }
}

fn cheaper_side(price_a: Decimal, price_b: Decimal) -> Option<Side> {
    match price_a.cmp(&price_b) {
        std::cmp::Ordering::Less => Some(Side::A),
        std::cmp::Ordering::Greater => Some(Side::B),
        std::cmp::Ordering::Equal => None,
    }
}

#[cfg(test)]
#[path = "comparison_test.rs"]
mod tests;
