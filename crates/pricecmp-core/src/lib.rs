//! Domain types, matching, and configuration shared by the pricecmp crates.

mod app_config;
pub mod comparison;
mod config;
pub mod money;
pub mod products;

use thiserror::Error;

pub use app_config::{AppConfig, DEFAULT_SKUS};
pub use comparison::{compare_catalogs, Comparison, ComparisonRecord, Side};
pub use config::{build_app_config, load_app_config, load_app_config_from_env};
pub use money::{format_price, parse_price};
pub use products::{Product, SourceCatalog};

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("negative price {price} for sku {sku}")]
    NegativePrice { sku: String, price: String },

    #[error("invalid price \"{raw}\": {reason}")]
    InvalidPrice { raw: String, reason: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
