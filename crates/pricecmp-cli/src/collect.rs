//! The comparison run: query source A by catalog code, look each hit up at
//! source B by name, then join and write the reports.
//!
//! A code or name that yields nothing is logged and skipped. A credential
//! failure or a report write failure aborts the run.

use std::path::PathBuf;

use chrono::Local;
use pricecmp_core::{compare_catalogs, SourceCatalog};
use pricecmp_scraper::SourceClient;

use crate::report::ReportWriter;

/// Files written by a completed run.
#[derive(Debug)]
pub struct RunSummary {
    pub source_a_report: PathBuf,
    pub source_b_report: PathBuf,
    pub comparison_report: PathBuf,
    pub compared: usize,
    pub matched: usize,
}

/// Runs one full comparison and writes all three reports.
///
/// # Errors
///
/// Returns an error if either client cannot obtain a credential or a report
/// cannot be written.
pub async fn run_comparison(
    source_a: &mut dyn SourceClient,
    source_b: &mut dyn SourceClient,
    skus: &[String],
    max_retries: u32,
    writer: &ReportWriter,
) -> anyhow::Result<RunSummary> {
    let mut catalog_a = SourceCatalog::new(source_a.source_name());
    for sku in skus {
        match source_a.search_first(sku, max_retries).await? {
            Some(product) => {
                tracing::info!(source = source_a.source_name(), sku = %sku, name = %product.display_name, "found product");
                catalog_a.push(product);
            }
            None => tracing::info!(source = source_a.source_name(), sku = %sku, "sku not found; skipping"),
        }
    }
    let source_a_report = writer.write(&catalog_a)?;
    if catalog_a.is_empty() {
        tracing::warn!(
            source = source_a.source_name(),
            skus = skus.len(),
            "no products found; nothing to look up at the second source"
        );
    }

    let mut catalog_b = SourceCatalog::new(source_b.source_name());
    for primary in &catalog_a.products {
        match source_b.search_first(&primary.display_name, max_retries).await? {
            Some(mut product) => {
                product.adopt_identity_of(primary);
                catalog_b.push(product);
            }
            None => tracing::info!(
                source = source_b.source_name(),
                name = %primary.display_name,
                "no counterpart found"
            ),
        }
    }
    let source_b_report = writer.write(&catalog_b)?;

    let mut comparison = compare_catalogs(&catalog_a, &catalog_b, Local::now().date_naive());
    comparison.source_a = source_a.report_label().to_string();
    comparison.source_b = source_b.report_label().to_string();
    let comparison_report = writer.write_comparison(&comparison)?;

    Ok(RunSummary {
        source_a_report,
        source_b_report,
        comparison_report,
        compared: comparison.records.len(),
        matched: comparison.matched_count(),
    })
}

#[cfg(test)]
#[path = "collect_test.rs"]
mod tests;
