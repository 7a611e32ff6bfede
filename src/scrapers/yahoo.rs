use crate::config::Config;
use crate::models::price::PriceRecord;
use crate::errors::{Result, AnalysisError};
use crate::scrapers::base::PriceSource;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use log::{debug, info};

const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<u64>>,
}

/// Yahoo Finance daily chart scraper
pub struct YahooScraper {
    client: Client,
    base_url: String,
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl YahooScraper {
    pub fn new(base_url: &str, min_interval: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(AnalysisError::RequestError)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            min_interval,
            last_request: Mutex::new(None),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.yahoo_base_url, config.request_interval)
    }

    async fn wait_for_rate_limit(&self) {
        let now = Instant::now();
        let should_wait = match self.last_request.lock() {
            Ok(mut last) => {
                let previous: Option<Instant> = *last;
                let should_wait = previous
                    .map(|instant| instant.elapsed())
                    .filter(|elapsed| *elapsed < self.min_interval)
                    .map(|elapsed| self.min_interval - elapsed);
                *last = Some(now);
                should_wait
            }
            Err(_) => None,
        };

        if let Some(wait_time) = should_wait {
            debug!("Waiting {:?} before next request", wait_time);
            tokio::time::sleep(wait_time).await;
        }
    }

    fn chart_url(&self, symbol: &str) -> String {
        format!("{}/v8/finance/chart/{}", self.base_url, symbol)
    }

    /// Unix timestamps covering `start` 00:00 to `end` 23:59:59 UTC
    fn period(start: NaiveDate, end: NaiveDate) -> (i64, i64) {
        let start_ts = start.and_time(NaiveTime::MIN).and_utc().timestamp();
        let end_ts = end.and_time(NaiveTime::MIN).and_utc().timestamp() + SECONDS_PER_DAY - 1;
        (start_ts, end_ts)
    }
}

/// Turns a chart response body into records sorted by date ascending
fn parse_chart(symbol: &str, body: &str) -> Result<Vec<PriceRecord>> {
    let response: ChartResponse = serde_json::from_str(body)?;

    let data = match response.chart.result {
        Some(result) => result.into_iter().next(),
        None => None,
    };

    let data = match (data, response.chart.error) {
        (Some(data), _) => data,
        (None, Some(err)) if err.code == "Not Found" => {
            return Err(AnalysisError::SymbolNotFound(symbol.to_string()));
        }
        (None, Some(err)) => {
            return Err(AnalysisError::DataError(format!(
                "{} for {}: {}", err.code, symbol, err.description
            )));
        }
        (None, None) => {
            return Err(AnalysisError::DataError(format!("Empty chart result for {}", symbol)));
        }
    };

    let offset = data.meta.and_then(|m| m.gmtoffset).unwrap_or(0);
    let timestamps = data.timestamp.unwrap_or_default();
    let quote = data.indicators.quote.into_iter().next().unwrap_or_default();

    let mut records = Vec::with_capacity(timestamps.len());

    for (i, &ts) in timestamps.iter().enumerate() {
        let open = quote.open.get(i).copied().flatten();
        let high = quote.high.get(i).copied().flatten();
        let low = quote.low.get(i).copied().flatten();
        let volume = quote.volume.get(i).copied().flatten();

        // Holidays and partial rows come back without a close
        let close = match quote.close.get(i).copied().flatten() {
            Some(close) => close,
            None => continue,
        };

        let date = DateTime::from_timestamp(ts + offset, 0)
            .map(|dt| dt.date_naive())
            .ok_or_else(|| AnalysisError::DataError(format!("Invalid timestamp {} for {}", ts, symbol)))?;

        records.push(PriceRecord {
            date,
            open: open.unwrap_or(close),
            high: high.unwrap_or(close),
            low: low.unwrap_or(close),
            close,
            volume: volume.unwrap_or(0),
        });
    }

    if records.is_empty() {
        return Err(AnalysisError::SymbolNotFound(symbol.to_string()));
    }

    records.sort_by(|a, b| a.date.cmp(&b.date));
    Ok(records)
}

#[async_trait]
impl PriceSource for YahooScraper {
    fn source_name(&self) -> &'static str {
        "Yahoo Finance"
    }

    async fn fetch_history(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<PriceRecord>> {
        if start > end {
            return Err(AnalysisError::DataError(format!(
                "Empty date range for {}: {} is after {}", symbol, start, end
            )));
        }

        info!("Fetching {} from {} to {}", symbol, start, end);
        self.wait_for_rate_limit().await;

        let (period1, period2) = Self::period(start, end);
        let response = self.client
            .get(self.chart_url(symbol))
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
                ("events", "history".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        let records = read_response(symbol, status, &body)?;
        debug!("Received {} daily records for {}", records.len(), symbol);
        Ok(records)
    }
}

/// Unknown symbols answer 404 with a chart error body, so the body is parsed
/// first and the status only matters when it is not chart JSON.
fn read_response(symbol: &str, status: StatusCode, body: &str) -> Result<Vec<PriceRecord>> {
    match parse_chart(symbol, body) {
        Err(AnalysisError::JsonError(_)) if !status.is_success() => Err(AnalysisError::DataError(
            format!("HTTP {} while fetching {}", status, symbol),
        )),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{"chart":{"result":[{
        "meta":{"symbol":"AAPL","gmtoffset":-14400},
        "timestamp":[1710423000,1710336600,1710509400,1710768600],
        "indicators":{"quote":[{
            "open":[171.0,172.0,null,175.0],
            "high":[173.0,174.0,null,176.5],
            "low":[170.0,171.5,null,174.0],
            "close":[172.6,171.1,null,175.2],
            "volume":[72000000,null,null,55000000]
        }],"adjclose":[{"adjclose":[172.6,171.1,null,175.2]}]}
    }],"error":null}}"#;

    #[test]
    fn parses_and_sorts_records() {
        let records = parse_chart("AAPL", BODY).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].date, NaiveDate::from_ymd_opt(2024, 3, 13).unwrap());
        assert_eq!(records[1].date, NaiveDate::from_ymd_opt(2024, 3, 14).unwrap());
        assert_eq!(records[2].date, NaiveDate::from_ymd_opt(2024, 3, 18).unwrap());
        assert_eq!(records[0].close, 171.1);
        assert_eq!(records[0].volume, 0);
        assert_eq!(records[2].high, 176.5);
    }

    #[test]
    fn maps_not_found_error() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        assert!(matches!(parse_chart("NOPE", body), Err(AnalysisError::SymbolNotFound(s)) if s == "NOPE"));

        let body = r#"{"chart":{"result":null,"error":{"code":"Bad Request","description":"Invalid input"}}}"#;
        assert!(matches!(parse_chart("AAPL", body), Err(AnalysisError::DataError(_))));
    }

    #[test]
    fn empty_series_is_not_found() {
        let body = r#"{"chart":{"result":[{"meta":{},"indicators":{"quote":[{}]}}],"error":null}}"#;
        assert!(matches!(parse_chart("AAPL", body), Err(AnalysisError::SymbolNotFound(_))));
    }

    #[test]
    fn malformed_body_is_json_error() {
        assert!(matches!(parse_chart("AAPL", "<html>"), Err(AnalysisError::JsonError(_))));
    }

    #[test]
    fn period_covers_whole_end_day() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let (from, to) = YahooScraper::period(day, day);
        assert_eq!(from, 1704153600);
        assert_eq!(to - from, SECONDS_PER_DAY - 1);
    }

    #[test]
    fn error_status_with_html_body_is_data_error() {
        let err = read_response("AAPL", StatusCode::SERVICE_UNAVAILABLE, "<html>busy</html>").unwrap_err();
        assert!(matches!(err, AnalysisError::DataError(ref m) if m.contains("503")));

        let not_found = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"delisted"}}}"#;
        assert!(matches!(
            read_response("NOPE", StatusCode::NOT_FOUND, not_found),
            Err(AnalysisError::SymbolNotFound(_))
        ));

        assert!(matches!(read_response("AAPL", StatusCode::OK, "<html>"), Err(AnalysisError::JsonError(_))));
        assert_eq!(read_response("AAPL", StatusCode::OK, BODY).unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn spaces_requests_by_min_interval() {
        let config = Config::new()
            .with_yahoo_base_url("http://127.0.0.1:9/")
            .with_request_interval(Duration::from_millis(500));
        let scraper = YahooScraper::from_config(&config).unwrap();
        assert_eq!(scraper.chart_url("MSFT"), "http://127.0.0.1:9/v8/finance/chart/MSFT");

        let start = Instant::now();
        scraper.wait_for_rate_limit().await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        scraper.wait_for_rate_limit().await;
        assert!(start.elapsed() >= Duration::from_millis(500));

        // a gap already longer than the interval costs nothing
        tokio::time::advance(Duration::from_secs(1)).await;
        let before = Instant::now();
        scraper.wait_for_rate_limit().await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn rejects_inverted_range() {
        let scraper = YahooScraper::new("http://127.0.0.1:9", Duration::ZERO).unwrap();
        let start = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(matches!(
            scraper.fetch_history("AAPL", start, end).await,
            Err(AnalysisError::DataError(_))
        ));
    }
}
