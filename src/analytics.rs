//! Derived statistics, always computed per company partition.
//!
//! The slice functions return one value per input position with `None`
//! where the statistic is undefined. The `add_*` functions run them over each
//! company of a [`PriceTable`] and append the result as a column.

use crate::config::Config;
use crate::errors::Result;
use crate::models::table::{
    moving_average_column, PriceTable, Sentiment, CUMULATIVE_RETURN, DAILY_RETURN, VOLATILITY,
};
use log::info;

/// Mean of the trailing `window` values
pub fn moving_average(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }

    values
        .iter()
        .enumerate()
        .scan(0.0_f64, move |sum, (i, &v)| {
            *sum += v;
            if i >= window {
                *sum -= values[i - window];
            }
            Some(if i + 1 >= window { Some(*sum / window as f64) } else { None })
        })
        .collect()
}

/// Relative change against the previous value
pub fn pct_change(values: &[f64]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    if values.is_empty() {
        return out;
    }
    out.push(None);
    out.extend(values.windows(2).map(|w| {
        if w[0] == 0.0 {
            None
        } else {
            Some((w[1] - w[0]) / w[0])
        }
    }));
    out
}

/// Sample standard deviation over the trailing `window` values. Defined only
/// when every value in the window is defined.
pub fn rolling_std(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    if window < 2 {
        return vec![None; values.len()];
    }

    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            let slice = &values[i + 1 - window..=i];
            let defined: Vec<f64> = slice.iter().copied().flatten().collect();
            if defined.len() < window {
                return None;
            }
            let n = window as f64;
            let mean = defined.iter().sum::<f64>() / n;
            let var = defined.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
            Some(var.sqrt())
        })
        .collect()
}

/// `1 + running sum` of returns. Undefined returns add nothing and stay undefined.
pub fn cumulative_return(daily_returns: &[Option<f64>]) -> Vec<Option<f64>> {
    daily_returns
        .iter()
        .scan(0.0_f64, |sum, r| {
            Some(r.map(|r| {
                *sum += r;
                1.0 + *sum
            }))
        })
        .collect()
}

/// Running mean, used for the expanding trend line
pub fn expanding_mean(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .enumerate()
        .scan(0.0_f64, |sum, (i, &v)| {
            *sum += v;
            Some(*sum / (i + 1) as f64)
        })
        .collect()
}

/// Runs `f` over each company's closes and scatters the results back into a
/// column aligned with the table rows.
fn per_company<F>(table: &PriceTable, f: F) -> Vec<Option<f64>>
where
    F: Fn(&[f64]) -> Vec<Option<f64>>,
{
    let mut column = vec![None; table.len()];
    for partition in table.partitions() {
        let closes = table.closes(&partition);
        for (&row, value) in partition.indices.iter().zip(f(&closes)) {
            column[row] = value;
        }
    }
    column
}

pub fn add_moving_average(table: &mut PriceTable, window: usize) -> Result<()> {
    let column = per_company(table, |closes| moving_average(closes, window));
    table.set_column(&moving_average_column(window), column)
}

pub fn add_volatility(table: &mut PriceTable, window: usize) -> Result<()> {
    let column = per_company(table, |closes| rolling_std(&pct_change(closes), window));
    table.set_column(VOLATILITY, column)
}

pub fn add_daily_returns(table: &mut PriceTable) -> Result<()> {
    let column = per_company(table, pct_change);
    table.set_column(DAILY_RETURN, column)
}

/// Resets at each company boundary
pub fn add_cumulative_returns(table: &mut PriceTable) -> Result<()> {
    let column = per_company(table, |closes| cumulative_return(&pct_change(closes)));
    table.set_column(CUMULATIVE_RETURN, column)
}

/// Labels every row from the sign of its daily return
pub fn add_sentiment(table: &mut PriceTable) -> Result<()> {
    let labels: Vec<Sentiment> = match table.column(DAILY_RETURN) {
        Some(returns) => returns.iter().map(|&r| Sentiment::from_return(r)).collect(),
        None => per_company(table, pct_change)
            .into_iter()
            .map(Sentiment::from_return)
            .collect(),
    };
    table.set_sentiment(labels)
}

/// Appends every derived column in a fixed order
pub fn apply_all(table: &mut PriceTable, config: &Config) -> Result<()> {
    for &window in &config.moving_average_windows {
        add_moving_average(table, window)?;
    }
    add_volatility(table, config.volatility_window)?;
    add_daily_returns(table)?;
    add_cumulative_returns(table)?;
    add_sentiment(table)?;

    info!("Derived {} columns over {} rows", table.columns().len() + 1, table.len());
    Ok(())
}
