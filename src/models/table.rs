use crate::errors::{AnalysisError, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

pub const COMPANY: &str = "Company";
pub const SYMBOL: &str = "Symbol";
pub const DATE: &str = "Date";
pub const OPEN: &str = "Open";
pub const HIGH: &str = "High";
pub const LOW: &str = "Low";
pub const CLOSE: &str = "Close";
pub const VOLUME: &str = "Volume";
pub const VOLATILITY: &str = "Volatility";
pub const DAILY_RETURN: &str = "Daily_Return";
pub const CUMULATIVE_RETURN: &str = "Cumulative_Return";
pub const SENTIMENT: &str = "Sentiment";

/// Name of the moving average column for a window size
pub fn moving_average_column(window: usize) -> String {
    format!("Moving_Average_{}", window)
}

/// Sign of a daily return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    /// Undefined and zero returns are both neutral
    pub fn from_return(daily_return: Option<f64>) -> Self {
        match daily_return {
            Some(r) if r > 0.0 => Sentiment::Positive,
            Some(r) if r < 0.0 => Sentiment::Negative,
            _ => Sentiment::Neutral,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Negative => "Negative",
            Sentiment::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the flattened price table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceRow {
    pub company: String,
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Numeric column appended after assembly; `None` marks an undefined value
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedColumn {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

/// Row positions belonging to one company, in table order
#[derive(Debug, Clone, PartialEq)]
pub struct Partition<'a> {
    pub company: &'a str,
    pub indices: Vec<usize>,
}

/// Price table keyed by (company, date). The ordinal index of a row is its position.
#[derive(Debug, Clone, Default)]
pub struct PriceTable {
    rows: Vec<PriceRow>,
    columns: Vec<DerivedColumn>,
    sentiment: Option<Vec<Sentiment>>,
}

impl PriceTable {
    pub fn new(rows: Vec<PriceRow>) -> Self {
        Self {
            rows,
            columns: Vec::new(),
            sentiment: None,
        }
    }

    pub fn rows(&self) -> &[PriceRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Company names in order of first appearance
    pub fn companies(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for row in &self.rows {
            if !names.contains(&row.company.as_str()) {
                names.push(&row.company);
            }
        }
        names
    }

    /// Groups row positions by company. Works on any row order, so a derived
    /// value never reads across a company boundary even if rows interleave.
    pub fn partitions(&self) -> Vec<Partition<'_>> {
        let mut parts: Vec<Partition<'_>> = Vec::new();
        for (i, row) in self.rows.iter().enumerate() {
            match parts.iter_mut().find(|p| p.company == row.company) {
                Some(part) => part.indices.push(i),
                None => parts.push(Partition {
                    company: &row.company,
                    indices: vec![i],
                }),
            }
        }
        parts
    }

    /// Close prices of a partition, in row order
    pub fn closes(&self, partition: &Partition<'_>) -> Vec<f64> {
        partition.indices.iter().map(|&i| self.rows[i].close).collect()
    }

    /// Rows of one company together with their positions
    pub fn company_rows<'a>(&'a self, company: &'a str) -> impl Iterator<Item = (usize, &'a PriceRow)> + 'a {
        self.rows
            .iter()
            .enumerate()
            .filter(move |(_, row)| row.company == company)
    }

    pub fn columns(&self) -> &[DerivedColumn] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    /// Appends a derived column, replacing any column with the same name
    pub fn set_column(&mut self, name: &str, values: Vec<Option<f64>>) -> Result<()> {
        if values.len() != self.rows.len() {
            return Err(AnalysisError::DataError(format!(
                "Column {} has {} values but the table has {} rows",
                name,
                values.len(),
                self.rows.len()
            )));
        }

        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.values = values,
            None => self.columns.push(DerivedColumn {
                name: name.to_string(),
                values,
            }),
        }
        Ok(())
    }

    pub fn sentiment(&self) -> Option<&[Sentiment]> {
        self.sentiment.as_deref()
    }

    pub fn set_sentiment(&mut self, labels: Vec<Sentiment>) -> Result<()> {
        if labels.len() != self.rows.len() {
            return Err(AnalysisError::DataError(format!(
                "Sentiment has {} labels but the table has {} rows",
                labels.len(),
                self.rows.len()
            )));
        }
        self.sentiment = Some(labels);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(company: &str, day: u32, close: f64) -> PriceRow {
        PriceRow {
            company: company.to_string(),
            symbol: company.to_uppercase(),
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 100,
        }
    }

    #[test]
    fn partitions_group_interleaved_rows() {
        let table = PriceTable::new(vec![
            row("Apple", 1, 1.0),
            row("Google", 1, 2.0),
            row("Apple", 2, 3.0),
        ]);

        let parts = table.partitions();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].company, "Apple");
        assert_eq!(parts[0].indices, vec![0, 2]);
        assert_eq!(table.closes(&parts[0]), vec![1.0, 3.0]);
        assert_eq!(parts[1].indices, vec![1]);
        assert_eq!(table.companies(), vec!["Apple", "Google"]);
    }

    #[test]
    fn set_column_replaces_and_checks_length() {
        let mut table = PriceTable::new(vec![row("Apple", 1, 1.0), row("Apple", 2, 2.0)]);

        table.set_column("x", vec![None, Some(1.0)]).unwrap();
        table.set_column("x", vec![Some(2.0), Some(3.0)]).unwrap();
        assert_eq!(table.columns().len(), 1);
        assert_eq!(table.column("x"), Some(&[Some(2.0), Some(3.0)][..]));

        assert!(table.set_column("y", vec![None]).is_err());
        assert!(table.set_sentiment(vec![Sentiment::Neutral]).is_err());
    }

    #[test]
    fn sentiment_follows_sign() {
        assert_eq!(Sentiment::from_return(Some(0.5)), Sentiment::Positive);
        assert_eq!(Sentiment::from_return(Some(-0.1)), Sentiment::Negative);
        assert_eq!(Sentiment::from_return(Some(0.0)), Sentiment::Neutral);
        assert_eq!(Sentiment::from_return(None), Sentiment::Neutral);
        assert_eq!(Sentiment::Negative.to_string(), "Negative");
    }
}
