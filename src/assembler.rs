//! Merges per-company series into one flat table keyed by (company, date).

use crate::errors::{AnalysisError, Result};
use crate::models::price::{PriceRecord, PriceSeries};
use crate::models::table::{PriceRow, PriceTable};
use chrono::NaiveDate;
use log::{debug, info};
use std::collections::HashMap;

/// Closing prices of two companies on a shared date
#[derive(Debug, Clone, PartialEq)]
pub struct PairedClose {
    pub date: NaiveDate,
    pub left: f64,
    pub right: f64,
}

/// Concatenates series in the given order. Rows of each series are sorted by
/// date and a repeated date keeps its last record.
pub fn assemble(series: Vec<PriceSeries>) -> Result<PriceTable> {
    let mut rows = Vec::with_capacity(series.iter().map(|s| s.records.len()).sum());
    let mut seen: Vec<String> = Vec::with_capacity(series.len());

    for s in series {
        if seen.contains(&s.company) {
            return Err(AnalysisError::DataError(format!(
                "Company {} appears more than once", s.company
            )));
        }
        seen.push(s.company.clone());

        let records = normalize_records(s.records);
        debug!("{} ({}): {} rows", s.company, s.symbol, records.len());

        rows.extend(records.into_iter().map(|r| PriceRow {
            company: s.company.clone(),
            symbol: s.symbol.clone(),
            date: r.date,
            open: r.open,
            high: r.high,
            low: r.low,
            close: r.close,
            volume: r.volume,
        }));
    }

    info!("Assembled {} rows for {} companies", rows.len(), seen.len());
    Ok(PriceTable::new(rows))
}

fn normalize_records(mut records: Vec<PriceRecord>) -> Vec<PriceRecord> {
    // stable sort keeps the later duplicate after the earlier one
    records.sort_by(|a, b| a.date.cmp(&b.date));

    let mut out: Vec<PriceRecord> = Vec::with_capacity(records.len());
    for record in records {
        match out.last_mut() {
            Some(last) if last.date == record.date => *last = record,
            _ => out.push(record),
        }
    }
    out
}

/// Inner join of two companies' closes on date, ordered as the left company's rows
pub fn merge_on_date(table: &PriceTable, left: &str, right: &str) -> Result<Vec<PairedClose>> {
    let companies = table.companies();
    for name in [left, right] {
        if !companies.contains(&name) {
            return Err(AnalysisError::DataError(format!("Company {} is not in the table", name)));
        }
    }

    let right_closes: HashMap<NaiveDate, f64> = table
        .company_rows(right)
        .map(|(_, row)| (row.date, row.close))
        .collect();

    Ok(table
        .company_rows(left)
        .filter_map(|(_, row)| {
            right_closes.get(&row.date).map(|&close| PairedClose {
                date: row.date,
                left: row.close,
                right: close,
            })
        })
        .collect())
}
