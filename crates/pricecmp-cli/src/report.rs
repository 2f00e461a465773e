//! JSON report files: one per source catalog plus the aggregated comparison.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use pricecmp_core::{format_price, Comparison, ComparisonRecord, Product, Side, SourceCatalog};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

pub const COMPARISON_FILE: &str = "aggregated.json";

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("report I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("report JSON error at {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// One product in a per-source report file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRow {
    #[serde(rename = "SKU")]
    pub sku: String,
    #[serde(rename = "Product Name")]
    pub product_name: String,
    #[serde(rename = "Price")]
    pub price: String,
    #[serde(rename = "Date")]
    pub date: String,
}

impl From<&Product> for CatalogRow {
    fn from(product: &Product) -> Self {
        Self {
            sku: product.source_sku.clone(),
            product_name: product.display_name.clone(),
            price: format_price(product.price()),
            date: product
                .observed_at
                .with_timezone(&Local)
                .format(DATE_FORMAT)
                .to_string(),
        }
    }
}

/// One comparison record keyed with the sources' column labels.
struct ComparisonRow<'a> {
    comparison: &'a Comparison,
    record: &'a ComparisonRecord,
}

impl Serialize for ComparisonRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let record = self.record;
        let mut map = serializer.serialize_map(Some(7))?;
        map.serialize_entry("SKU", &record.sku)?;
        map.serialize_entry("Product Name", &record.display_name)?;
        map.serialize_entry(
            &format!("Price_{}", self.comparison.source_a),
            &format_price(record.price_a),
        )?;
        map.serialize_entry(
            &format!("Price_{}", self.comparison.source_b),
            &record.price_b.map(format_price),
        )?;
        map.serialize_entry("Price Difference", &record.difference.map(format_price))?;
        map.serialize_entry(
            "Cheaper Source",
            &record.cheaper.map(|side: Side| self.comparison.source_name(side)),
        )?;
        map.serialize_entry("Date", &record.date.format(DATE_FORMAT).to_string())?;
        map.end()
    }
}

/// Writes report files under one directory, creating it as needed and
/// overwriting existing files.
pub struct ReportWriter {
    dir: PathBuf,
}

impl ReportWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Writes `<dir>/<source_name>.json` and returns its path.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] if the directory or file cannot be written.
    pub fn write(&self, catalog: &SourceCatalog) -> Result<PathBuf, ReportError> {
        let rows: Vec<CatalogRow> = catalog.products.iter().map(CatalogRow::from).collect();
        let path = self.dir.join(format!("{}.json", catalog.source_name));
        write_json(&path, &rows)?;
        tracing::info!(source = %catalog.source_name, products = rows.len(), path = %path.display(), "wrote catalog");
        Ok(path)
    }

    /// Writes `<dir>/aggregated.json` and returns its path.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] if the directory or file cannot be written.
    pub fn write_comparison(&self, comparison: &Comparison) -> Result<PathBuf, ReportError> {
        let rows: Vec<ComparisonRow<'_>> = comparison
            .records
            .iter()
            .map(|record| ComparisonRow { comparison, record })
            .collect();
        let path = self.dir.join(COMPARISON_FILE);
        write_json(&path, &rows)?;
        tracing::info!(
            records = rows.len(),
            matched = comparison.matched_count(),
            path = %path.display(),
            "wrote comparison"
        );
        Ok(path)
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ReportError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| ReportError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let body = serde_json::to_vec_pretty(value).map_err(|source| ReportError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, body).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads a per-source report file back into rows.
///
/// # Errors
///
/// Returns [`ReportError`] if the file cannot be read or is not a list of rows.
pub fn read_catalog(path: &Path) -> Result<Vec<CatalogRow>, ReportError> {
    let raw = fs::read(path).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&raw).map_err(|source| ReportError::Json {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
#[path = "report_test.rs"]
mod tests;
