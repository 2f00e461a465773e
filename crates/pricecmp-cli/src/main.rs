mod clients;
mod collect;
mod report;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::report::ReportWriter;

#[derive(Debug, Parser)]
#[command(name = "pricecmp")]
#[command(version)]
#[command(about = "Compare The Reject Shop prices against Woolworths")]
struct Cli {}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _cli = Cli::parse();
    let config = pricecmp_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(
        skus = config.skus.len(),
        data_dir = %config.data_dir.display(),
        max_retries = config.max_retries,
        "starting price comparison"
    );

    let mut storefront = clients::build_storefront_client(&config)?;
    let mut woolworths = clients::build_woolworths_client(&config)?;
    let writer = ReportWriter::new(config.data_dir.clone());

    let summary = collect::run_comparison(
        &mut storefront,
        &mut woolworths,
        &config.skus,
        config.max_retries,
        &writer,
    )
    .await?;

    tracing::info!(
        compared = summary.compared,
        matched = summary.matched,
        source_a = %summary.source_a_report.display(),
        source_b = %summary.source_b_report.display(),
        "run complete"
    );
    println!("Saved data to {}", summary.comparison_report.display());
    Ok(())
}
