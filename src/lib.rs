pub mod models;
pub mod errors;
pub mod config;
pub mod scrapers;
pub mod assembler;
pub mod analytics;
pub mod render;
pub mod services;
pub mod util;

// Re-exports for common use
pub use models::price::{Company, PriceRecord, PriceSeries};
pub use models::table::{PriceRow, PriceTable, Sentiment};
pub use scrapers::base::PriceSource;
pub use services::analysis_service::{AnalysisReport, AnalysisService};
pub use config::Config;
pub use errors::{Result, AnalysisError};
