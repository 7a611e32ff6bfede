use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A company tracked by the analysis, identified by its display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub name: String,
    pub symbol: String,
}

impl Company {
    pub fn new(name: &str, symbol: &str) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
        }
    }
}

/// Daily OHLCV record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Records fetched for a single company
#[derive(Debug, Clone, Serialize)]
pub struct PriceSeries {
    pub company: String,
    pub symbol: String,
    pub records: Vec<PriceRecord>,
}

impl PriceSeries {
    pub fn new(company: &Company, records: Vec<PriceRecord>) -> Self {
        Self {
            company: company.name.clone(),
            symbol: company.symbol.clone(),
            records,
        }
    }
}
