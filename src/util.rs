use chrono::NaiveDate;
use crate::errors::{Result, AnalysisError};

/// Parses a YYYY-MM-DD date
pub fn parse_date(date_str: &str) -> Result<NaiveDate> {
    Ok(NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")?)
}

/// Days since the Unix epoch, as Arrow's Date32 stores them
pub fn naive_date_to_days(date: NaiveDate) -> Result<i32> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)
        .ok_or_else(|| AnalysisError::DataError("Invalid epoch".to_string()))?;
    i32::try_from((date - epoch).num_days())
        .map_err(|e| AnalysisError::DataError(format!("Date {} out of range: {}", date, e)))
}

/// Row positions shown by a head/tail preview
pub fn preview_ranges(len: usize, n: usize) -> (std::ops::Range<usize>, std::ops::Range<usize>) {
    let head = 0..n.min(len);
    let tail = len.saturating_sub(n).max(head.end)..len;
    (head, tail)
}

// Arrow conversion of the price table
pub mod arrow_utils {
    use super::*;
    use crate::models::table::{
        PriceTable, CLOSE, COMPANY, DATE, HIGH, LOW, OPEN, SENTIMENT, SYMBOL, VOLUME,
    };
    use arrow::compute::filter_record_batch;
    use arrow::record_batch::RecordBatch;
    use arrow::util::pretty::pretty_format_batches;
    use arrow_array::{ArrayRef, BooleanArray, Date32Array, Float64Array, StringArray, UInt64Array};
    use arrow_schema::{DataType, Field, Schema};
    use std::sync::Arc;

    pub const INDEX: &str = "index";

    /// Converts the table into a record batch. Derived columns are nullable
    /// Float64 columns where null marks an undefined value.
    pub fn table_to_record_batch(table: &PriceTable, with_index: bool) -> Result<RecordBatch> {
        let rows = table.rows();

        let mut fields = Vec::new();
        let mut arrays: Vec<ArrayRef> = Vec::new();

        if with_index {
            fields.push(Field::new(INDEX, DataType::UInt64, false));
            arrays.push(Arc::new(UInt64Array::from_iter_values(0..rows.len() as u64)));
        }

        let dates = rows
            .iter()
            .map(|r| naive_date_to_days(r.date))
            .collect::<Result<Vec<i32>>>()?;

        fields.push(Field::new(COMPANY, DataType::Utf8, false));
        arrays.push(Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.company.as_str()))));
        fields.push(Field::new(SYMBOL, DataType::Utf8, false));
        arrays.push(Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.symbol.as_str()))));
        fields.push(Field::new(DATE, DataType::Date32, false));
        arrays.push(Arc::new(Date32Array::from(dates)));

        for (name, values) in [
            (OPEN, rows.iter().map(|r| r.open).collect::<Vec<f64>>()),
            (HIGH, rows.iter().map(|r| r.high).collect()),
            (LOW, rows.iter().map(|r| r.low).collect()),
            (CLOSE, rows.iter().map(|r| r.close).collect()),
        ] {
            fields.push(Field::new(name, DataType::Float64, false));
            arrays.push(Arc::new(Float64Array::from(values)));
        }

        fields.push(Field::new(VOLUME, DataType::UInt64, false));
        arrays.push(Arc::new(UInt64Array::from_iter_values(rows.iter().map(|r| r.volume))));

        for column in table.columns() {
            fields.push(Field::new(&column.name, DataType::Float64, true));
            arrays.push(Arc::new(Float64Array::from(column.values.clone())));
        }

        if let Some(labels) = table.sentiment() {
            fields.push(Field::new(SENTIMENT, DataType::Utf8, false));
            arrays.push(Arc::new(StringArray::from_iter_values(labels.iter().map(|s| s.as_str()))));
        }

        RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
            .map_err(|e| AnalysisError::ArrowError(e.to_string()))
    }

    /// Pretty-printed first and last `n` rows
    pub fn format_head_tail(table: &PriceTable, n: usize, with_index: bool) -> Result<String> {
        let batch = table_to_record_batch(table, with_index)?;
        let (head, tail) = preview_ranges(batch.num_rows(), n);

        let mut out = pretty_format_batches(&[batch.slice(head.start, head.len())])?.to_string();
        if !tail.is_empty() {
            out.push_str("\n...\n");
            out.push_str(&pretty_format_batches(&[batch.slice(tail.start, tail.len())])?.to_string());
        }
        Ok(out)
    }

    /// Pretty-printed selection of columns for the rows of one company
    pub fn format_company_columns(table: &PriceTable, company: &str, columns: &[String]) -> Result<String> {
        let batch = table_to_record_batch(table, true)?;
        let mut mask = vec![false; table.len()];
        for (i, _) in table.company_rows(company) {
            mask[i] = true;
        }
        if !mask.contains(&true) {
            return Err(AnalysisError::DataError(format!("Company {} is not in the table", company)));
        }

        let mut names = vec![INDEX.to_string(), DATE.to_string()];
        names.extend(columns.iter().cloned());
        let indices = names
            .iter()
            .map(|name| batch.schema().index_of(name).map_err(AnalysisError::from))
            .collect::<Result<Vec<usize>>>()?;

        let rows = filter_record_batch(&batch, &BooleanArray::from(mask))?.project(&indices)?;
        Ok(pretty_format_batches(&[rows])?.to_string())
    }
}
