use crate::errors::{AnalysisError, Result};
use crate::models::price::Company;
use chrono::{Months, NaiveDate};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_YAHOO_BASE_URL: &str = "https://query2.finance.yahoo.com";

pub struct Config {
    pub companies: Vec<Company>,
    pub lookback_months: u32,
    pub moving_average_windows: Vec<usize>,
    pub volatility_window: usize,
    pub pair: (String, String),
    pub output_dir: PathBuf,
    pub preview_rows: usize,
    pub request_interval: Duration,
    pub yahoo_base_url: String,
}

impl Config {
    pub fn new() -> Self {
        Self {
            companies: default_companies(),
            lookback_months: 3,
            moving_average_windows: vec![10, 20],
            volatility_window: 10,
            pair: ("Apple".to_string(), "Microsoft".to_string()),
            output_dir: PathBuf::from("charts"),
            preview_rows: 5,
            request_interval: Duration::from_millis(500),
            yahoo_base_url: DEFAULT_YAHOO_BASE_URL.to_string(),
        }
    }

    pub fn with_companies(mut self, companies: Vec<Company>) -> Self {
        self.companies = companies;
        self
    }

    pub fn with_lookback_months(mut self, months: u32) -> Self {
        self.lookback_months = months;
        self
    }

    pub fn with_moving_average_windows(mut self, windows: Vec<usize>) -> Self {
        self.moving_average_windows = windows;
        self
    }

    pub fn with_volatility_window(mut self, window: usize) -> Self {
        self.volatility_window = window;
        self
    }

    pub fn with_pair(mut self, left: &str, right: &str) -> Self {
        self.pair = (left.to_string(), right.to_string());
        self
    }

    pub fn with_output_dir(mut self, dir: &str) -> Self {
        self.output_dir = PathBuf::from(dir);
        self
    }

    pub fn with_preview_rows(mut self, rows: usize) -> Self {
        self.preview_rows = rows;
        self
    }

    pub fn with_request_interval(mut self, interval: Duration) -> Self {
        self.request_interval = interval;
        self
    }

    pub fn with_yahoo_base_url(mut self, url: &str) -> Self {
        self.yahoo_base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Checks the settings before any request goes out
    pub fn validate(&self) -> Result<()> {
        self.validate_companies()?;

        for name in [&self.pair.0, &self.pair.1] {
            if self.company(name).is_none() {
                return Err(AnalysisError::ConfigError(format!(
                    "Correlation pair member {} is not a configured company", name
                )));
            }
        }

        if self.lookback_months == 0 {
            return Err(AnalysisError::ConfigError("Lookback must be at least one month".to_string()));
        }
        if self.moving_average_windows.iter().any(|&w| w == 0) {
            return Err(AnalysisError::ConfigError("Moving average window must be positive".to_string()));
        }
        if self.volatility_window < 2 {
            return Err(AnalysisError::ConfigError(
                "Volatility window needs at least two observations".to_string(),
            ));
        }

        Ok(())
    }

    /// Non-empty company list with unique, non-blank names
    pub fn validate_companies(&self) -> Result<()> {
        if self.companies.is_empty() {
            return Err(AnalysisError::ConfigError("No companies configured".to_string()));
        }

        for (i, company) in self.companies.iter().enumerate() {
            if company.name.is_empty() || company.symbol.is_empty() {
                return Err(AnalysisError::ConfigError(format!(
                    "Company entry {} needs both a name and a symbol", i + 1
                )));
            }
            if self.companies[..i].iter().any(|c| c.name == company.name) {
                return Err(AnalysisError::ConfigError(format!(
                    "Company {} is configured more than once", company.name
                )));
            }
        }

        Ok(())
    }

    pub fn company(&self, name: &str) -> Option<&Company> {
        self.companies.iter().find(|c| c.name == name)
    }

    /// Trailing window ending at `end`
    pub fn date_window(&self, end: NaiveDate) -> Result<(NaiveDate, NaiveDate)> {
        let start = end
            .checked_sub_months(Months::new(self.lookback_months))
            .ok_or_else(|| AnalysisError::ConfigError(format!(
                "Cannot go back {} months from {}", self.lookback_months, end
            )))?;
        Ok((start, end))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// Microsoft, Netflix, Google and Apple, in that order
pub fn default_companies() -> Vec<Company> {
    vec![
        Company::new("Microsoft", "MSFT"),
        Company::new("Netflix", "NFLX"),
        Company::new("Google", "GOOGL"),
        Company::new("Apple", "AAPL"),
    ]
}

/// Parses a `Name=SYMBOL` pair
pub fn parse_company(arg: &str) -> Result<Company> {
    let (name, symbol) = arg.split_once('=').ok_or_else(|| {
        AnalysisError::ConfigError(format!("Expected NAME=SYMBOL, got {}", arg))
    })?;
    let name = name.trim();
    let symbol = symbol.trim();
    if name.is_empty() || symbol.is_empty() {
        return Err(AnalysisError::ConfigError(format!("Expected NAME=SYMBOL, got {}", arg)));
    }
    Ok(Company::new(name, &symbol.to_uppercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.companies.len(), 4);
        assert_eq!(config.companies[0].symbol, "MSFT");
    }

    #[test]
    fn rejects_pair_outside_companies() {
        let config = Config::new()
            .with_companies(vec![Company::new("Apple", "AAPL"), Company::new("Google", "GOOGL")]);
        assert!(matches!(config.validate(), Err(AnalysisError::ConfigError(_))));

        let config = config.with_pair("Apple", "Google");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_duplicates_and_bad_windows() {
        let config = Config::new().with_companies(vec![
            Company::new("Apple", "AAPL"),
            Company::new("Microsoft", "MSFT"),
            Company::new("Apple", "AAPL"),
        ]);
        assert!(config.validate().is_err());

        assert!(Config::new().with_volatility_window(1).validate().is_err());
        assert!(Config::new().with_moving_average_windows(vec![0]).validate().is_err());
        assert!(Config::new().with_lookback_months(0).validate().is_err());
    }

    #[test]
    fn date_window_goes_back_calendar_months() {
        let end = NaiveDate::from_ymd_opt(2024, 5, 31).unwrap();
        let (start, to) = Config::new().date_window(end).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(to, end);
    }

    #[test]
    fn parses_company_pairs() {
        let company = parse_company("Tesla=tsla").unwrap();
        assert_eq!(company, Company::new("Tesla", "TSLA"));
        assert!(parse_company("Tesla").is_err());
        assert!(parse_company("=TSLA").is_err());
    }
}
