use crate::analytics;
use crate::assembler;
use crate::config::Config;
use crate::errors::{AnalysisError, Result};
use crate::models::price::PriceSeries;
use crate::models::table::{moving_average_column, PriceTable};
use crate::render::{self, ChartSpec};
use crate::scrapers::base::PriceSource;
use crate::util::arrow_utils;
use chrono::NaiveDate;
use log::info;
use std::path::PathBuf;
use std::sync::Arc;

/// What a full run produced
#[derive(Debug)]
pub struct AnalysisReport {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub table: PriceTable,
    pub charts: Vec<ChartSpec>,
    pub written: Vec<PathBuf>,
}

/// Analysis service: fetch, assemble, derive, chart
pub struct AnalysisService {
    config: Config,
    source: Arc<dyn PriceSource + Send + Sync>,
    echo: bool,
}

impl AnalysisService {
    pub fn new(config: Config, source: Arc<dyn PriceSource + Send + Sync>) -> Self {
        Self {
            config,
            source,
            echo: true,
        }
    }

    /// Turns the console checkpoints on or off
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Fetches every company in order; the first failure aborts
    pub async fn fetch_all(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<PriceSeries>> {
        let mut series = Vec::with_capacity(self.config.companies.len());

        for company in &self.config.companies {
            info!("Fetching {} ({}) from {}", company.name, company.symbol, self.source.source_name());
            let records = self.source.fetch_history(&company.symbol, start, end).await?;
            if records.is_empty() {
                return Err(AnalysisError::DataError(format!(
                    "No records for {} ({}) between {} and {}",
                    company.name, company.symbol, start, end
                )));
            }
            info!("Found {} daily records for {}", records.len(), company.name);
            series.push(PriceSeries::new(company, records));
        }

        Ok(series)
    }

    /// Fetches and assembles the table, printing the first checkpoint
    pub async fn build_table(&self, start: NaiveDate, end: NaiveDate) -> Result<PriceTable> {
        self.config.validate_companies()?;
        let series = self.fetch_all(start, end).await?;
        let table = assembler::assemble(series)?;

        self.echo_table("Assembled price table", &table, false)?;
        Ok(table)
    }

    /// Appends derived columns and prints the second checkpoint
    pub fn analyze(&self, table: &mut PriceTable) -> Result<()> {
        analytics::apply_all(table, &self.config)?;

        if self.echo {
            let columns: Vec<String> = self
                .config
                .moving_average_windows
                .iter()
                .map(|&w| moving_average_column(w))
                .collect();
            for company in table.companies() {
                println!("Moving Average for {}:", company);
                println!("{}", arrow_utils::format_company_columns(table, company, &columns)?);
            }
        }

        self.echo_table("Price table with derived columns", table, true)
    }

    /// Builds the chart specs and writes them to the output directory
    pub fn render(&self, table: &PriceTable) -> Result<(Vec<ChartSpec>, Vec<PathBuf>)> {
        let charts = render::build_charts(table, &self.config)?;
        let written = render::write_charts(&charts, &self.config.output_dir)?;
        Ok((charts, written))
    }

    /// Whole pipeline over the window ending at `end`
    pub async fn run(&self, end: NaiveDate) -> Result<AnalysisReport> {
        self.config.validate()?;
        let (start, end) = self.config.date_window(end)?;
        info!("Analyzing {} companies from {} to {}", self.config.companies.len(), start, end);

        let mut table = self.build_table(start, end).await?;
        self.analyze(&mut table)?;
        let (charts, written) = self.render(&table)?;

        info!("Analysis finished: {} rows, {} charts", table.len(), charts.len());
        Ok(AnalysisReport {
            start,
            end,
            table,
            charts,
            written,
        })
    }

    fn echo_table(&self, heading: &str, table: &PriceTable, with_index: bool) -> Result<()> {
        if self.echo {
            println!("{} ({} rows)", heading, table.len());
            println!("{}", arrow_utils::format_head_tail(table, self.config.preview_rows, with_index)?);
        }
        Ok(())
    }
}
