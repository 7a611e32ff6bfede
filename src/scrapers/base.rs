use crate::models::price::PriceRecord;
use crate::errors::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Base trait for daily price sources
#[async_trait]
pub trait PriceSource {
    /// Name of the market data provider
    fn source_name(&self) -> &'static str;

    /// Fetch daily records for `symbol` between `start` and `end`.
    /// Records come back sorted by date ascending.
    async fn fetch_history(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<PriceRecord>>;
}
