//! Chart specifications built from the price table, and their HTML output.

pub mod plotly;

use crate::analytics::expanding_mean;
use crate::assembler::merge_on_date;
use crate::config::Config;
use crate::errors::{AnalysisError, Result};
use crate::models::table::{
    moving_average_column, PriceTable, CLOSE, COMPANY, CUMULATIVE_RETURN, DATE, VOLATILITY, VOLUME,
};
use log::{debug, info};
use self::plotly::{color_for, Figure, Layout, Trace};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

/// A named figure, written to `<slug>.html`
#[derive(Debug, Clone)]
pub struct ChartSpec {
    pub slug: String,
    pub figure: Figure,
}

impl ChartSpec {
    fn new(slug: &str, figure: Figure) -> Self {
        Self { slug: slug.to_string(), figure }
    }

    pub fn title(&self) -> &str {
        &self.figure.layout.title.text
    }
}

/// Lower-case, underscore separated file stem
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('_') {
            slug.push('_');
        }
    }
    slug.trim_matches('_').to_string()
}

/// Column of a company's rows by name
fn series(table: &PriceTable, company: &str, column: &str) -> Result<(Vec<Value>, Vec<Option<f64>>)> {
    let derived = match column {
        CLOSE | VOLUME => None,
        name => Some(table.column(name).ok_or_else(|| {
            AnalysisError::DataError(format!("Column {} has not been computed", name))
        })?),
    };

    let mut x = Vec::new();
    let mut y = Vec::new();
    for (i, row) in table.company_rows(company) {
        x.push(Value::String(row.date.format("%Y-%m-%d").to_string()));
        y.push(match (column, derived) {
            (CLOSE, _) => Some(row.close),
            (VOLUME, _) => Some(row.volume as f64),
            (_, Some(values)) => values[i],
            _ => None,
        });
    }
    Ok((x, y))
}

/// One line per company
fn line_by_company(table: &PriceTable, column: &str, title: &str, y_title: &str) -> Result<Figure> {
    let mut data = Vec::new();
    for (idx, company) in table.companies().into_iter().enumerate() {
        let (x, y) = series(table, company, column)?;
        data.push(Trace::line(company, x, y).with_color(color_for(idx)));
    }
    Ok(Figure {
        data,
        layout: Layout::new(title, DATE, y_title).with_legend(COMPANY),
    })
}

/// One area panel per company, wrapping after `columns` panels
fn faceted_area(
    table: &PriceTable,
    column: &str,
    columns: usize,
    title: &str,
    x_title: &str,
    y_title: &str,
) -> Result<Figure> {
    let companies = table.companies();
    let labels: Vec<String> = companies.iter().map(|c| format!("{}={}", COMPANY, c)).collect();

    let mut data = Vec::new();
    for (idx, company) in companies.iter().enumerate() {
        let (x, y) = series(table, company, column)?;
        data.push(
            Trace::area(company, x, y, company)
                .with_color(color_for(idx))
                .on_subplot(idx),
        );
    }

    Ok(Figure {
        data,
        layout: Layout::new(title, x_title, y_title)
            .with_legend(COMPANY)
            .with_facets(&labels, columns, x_title, y_title),
    })
}

fn moving_average_chart(table: &PriceTable, company: &str, windows: &[usize]) -> Result<Figure> {
    let mut columns = vec![CLOSE.to_string()];
    columns.extend(windows.iter().map(|&w| moving_average_column(w)));

    let mut data = Vec::new();
    for (idx, column) in columns.iter().enumerate() {
        let (x, y) = series(table, company, column)?;
        data.push(Trace::line(column, x, y).with_color(color_for(idx)));
    }

    Ok(Figure {
        data,
        layout: Layout::new(&format!("Moving averages of {} stocks", company), DATE, "value")
            .with_legend("variable"),
    })
}

/// Scatter of the date-joined closes with an expanding-mean trend line
fn correlation_chart(table: &PriceTable, left: &str, right: &str) -> Result<Figure> {
    let mut pairs = merge_on_date(table, left, right)?;
    debug!("{} shared dates between {} and {}", pairs.len(), left, right);

    let x: Vec<Value> = pairs.iter().map(|p| Value::from(p.left)).collect();
    let y: Vec<Option<f64>> = pairs.iter().map(|p| Some(p.right)).collect();
    let points = Trace::markers(&format!("{} vs {}", right, left), x, y).with_color(color_for(0));

    pairs.sort_by(|a, b| a.left.total_cmp(&b.left));
    let trend_y = expanding_mean(&pairs.iter().map(|p| p.right).collect::<Vec<_>>());
    let trend = Trace::line(
        "Expanding mean",
        pairs.iter().map(|p| Value::from(p.left)).collect(),
        trend_y.into_iter().map(Some).collect(),
    )
    .with_color(color_for(1));

    Ok(Figure {
        data: vec![points, trend],
        layout: Layout::new(
            &format!("Co-relation (expanding) between {} and {}", left, right),
            left,
            right,
        ),
    })
}

fn volume_chart(table: &PriceTable) -> Result<Figure> {
    let mut data = Vec::new();
    for (idx, company) in table.companies().into_iter().enumerate() {
        let (x, y) = series(table, company, VOLUME)?;
        data.push(Trace::bar(company, x, y).with_color(color_for(idx)));
    }
    Ok(Figure {
        data,
        layout: Layout::new("Trading volume of stocks", DATE, VOLUME)
            .with_legend(COMPANY)
            .with_barmode("relative"),
    })
}

/// Builds every chart. Derived columns must already be on the table.
pub fn build_charts(table: &PriceTable, config: &Config) -> Result<Vec<ChartSpec>> {
    if table.is_empty() {
        return Err(AnalysisError::DataError("Nothing to chart: the table is empty".to_string()));
    }

    let mut charts = Vec::new();

    charts.push(ChartSpec::new(
        "closing_prices",
        line_by_company(
            table,
            CLOSE,
            &format!("Stocks Performance (last {} months)", config.lookback_months),
            "Closing value",
        )?,
    ));

    let companies = table.companies();
    charts.push(ChartSpec::new(
        "closing_prices_area",
        faceted_area(table, CLOSE, companies.len(), "Stock Prices", "Date range", "Closing value")?,
    ));

    for company in &companies {
        charts.push(ChartSpec::new(
            &format!("moving_averages_{}", slugify(company)),
            moving_average_chart(table, company, &config.moving_average_windows)?,
        ));
    }

    charts.push(ChartSpec::new(
        "volatility",
        line_by_company(table, VOLATILITY, "Stocks volatility", VOLATILITY)?,
    ));

    let (left, right) = (&config.pair.0, &config.pair.1);
    charts.push(ChartSpec::new(
        &format!("correlation_{}_{}", slugify(left), slugify(right)),
        correlation_chart(table, left, right)?,
    ));

    charts.push(ChartSpec::new(
        "cumulative_returns",
        faceted_area(table, CUMULATIVE_RETURN, 2, "Cumulative returns of stocks", DATE, "Cumulative returns")?,
    ));

    charts.push(ChartSpec::new("trading_volume", volume_chart(table)?));

    info!("Built {} chart specifications", charts.len());
    Ok(charts)
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Self-contained page that loads plotly.js and draws the figure
pub fn to_html(chart: &ChartSpec) -> Result<String> {
    // `<` only occurs inside JSON strings, where the escape is equivalent
    let figure = serde_json::to_string(&chart.figure)?.replace('<', "\\u003c");
    Ok(format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<script src="{cdn}"></script>
</head>
<body>
<div id="chart" style="width:100%;height:90vh;"></div>
<script>
const figure = {figure};
Plotly.newPlot("chart", figure.data, figure.layout, {{responsive: true}});
</script>
</body>
</html>
"#,
        title = escape_html(chart.title()),
        cdn = PLOTLY_CDN,
        figure = figure,
    ))
}

/// Writes one HTML file per chart and returns their paths
pub fn write_charts(charts: &[ChartSpec], dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;

    let mut paths = Vec::with_capacity(charts.len());
    for chart in charts {
        let path = dir.join(format!("{}.html", chart.slug));
        fs::write(&path, to_html(chart)?)?;
        debug!("Wrote {}", path.display());
        paths.push(path);
    }

    info!("Wrote {} charts to {}", paths.len(), dir.display());
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::apply_all;
    use crate::models::table::PriceRow;
    use chrono::{Days, NaiveDate};

    fn analyzed_table(companies: &[&str], days: u64) -> PriceTable {
        let start = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let mut rows = Vec::new();
        for (c, company) in companies.iter().enumerate() {
            for d in 0..days {
                let close = 100.0 + (c as f64) * 10.0 + (d % 7) as f64;
                rows.push(PriceRow {
                    company: company.to_string(),
                    symbol: company.to_uppercase(),
                    date: start + Days::new(d),
                    open: close,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 1_000 + d,
                });
            }
        }
        let mut table = PriceTable::new(rows);
        apply_all(&mut table, &Config::new()).unwrap();
        table
    }

    #[test]
    fn slugify_names() {
        assert_eq!(slugify("Apple"), "apple");
        assert_eq!(slugify("Berkshire Hathaway (B)"), "berkshire_hathaway_b");
    }

    #[test]
    fn builds_all_charts_for_default_companies() {
        let table = analyzed_table(&["Microsoft", "Netflix", "Google", "Apple"], 30);
        let charts = build_charts(&table, &Config::new()).unwrap();

        let slugs: Vec<&str> = charts.iter().map(|c| c.slug.as_str()).collect();
        assert_eq!(
            slugs,
            vec![
                "closing_prices",
                "closing_prices_area",
                "moving_averages_microsoft",
                "moving_averages_netflix",
                "moving_averages_google",
                "moving_averages_apple",
                "volatility",
                "correlation_apple_microsoft",
                "cumulative_returns",
                "trading_volume",
            ]
        );

        let closing = &charts[0].figure;
        assert_eq!(closing.data.len(), 4);
        assert_eq!(closing.data[3].name, "Apple");
        assert_eq!(closing.data[0].x.len(), 30);

        let cumulative = &charts[8].figure;
        let grid = cumulative.layout.grid.as_ref().unwrap();
        assert_eq!((grid.rows, grid.columns), (2, 2));
        assert_eq!(cumulative.data[0].y[0], None);

        let ma = &charts[5].figure;
        assert_eq!(ma.data.len(), 3);
        assert_eq!(ma.data[1].name, "Moving_Average_10");
        assert!(ma.data[1].y[8].is_none());
        assert!(ma.data[1].y[9].is_some());
    }

    #[test]
    fn correlation_trend_is_sorted_expanding_mean() {
        let table = analyzed_table(&["Microsoft", "Apple"], 10);
        let charts = build_charts(&table, &Config::new().with_companies(vec![
            crate::models::price::Company::new("Microsoft", "MSFT"),
            crate::models::price::Company::new("Apple", "AAPL"),
        ]))
        .unwrap();

        let correlation = charts.iter().find(|c| c.slug == "correlation_apple_microsoft").unwrap();
        let trend = &correlation.figure.data[1];
        let xs: Vec<f64> = trend.x.iter().map(|v| v.as_f64().unwrap()).collect();
        assert!(xs.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(trend.y.len(), 10);
        assert_eq!(trend.y[0], Some(100.0));
    }

    #[test]
    fn missing_columns_are_reported() {
        let table = PriceTable::new(analyzed_table(&["Apple"], 3).rows().to_vec());
        let config = Config::new().with_pair("Apple", "Apple");
        assert!(matches!(build_charts(&table, &config), Err(AnalysisError::DataError(_))));
    }

    #[test]
    fn writes_html_pages() {
        let table = analyzed_table(&["Microsoft", "Apple"], 12);
        let charts = build_charts(&table, &Config::new()).unwrap();
        let dir = tempfile::tempdir().unwrap();

        let paths = write_charts(&charts, dir.path()).unwrap();
        assert_eq!(paths.len(), charts.len());

        let html = fs::read_to_string(dir.path().join("trading_volume.html")).unwrap();
        assert!(html.contains(PLOTLY_CDN));
        assert!(html.contains("Trading volume of stocks"));
        assert!(html.contains("\"type\":\"bar\""));
    }

    #[test]
    fn html_escapes_company_names() {
        let name = "A</script><b>&Co";
        let figure = Figure {
            data: vec![Trace::line(name, vec![Value::from("2024-02-01")], vec![Some(1.0)])],
            layout: Layout::new(&format!("Moving averages of {}", name), DATE, CLOSE),
        };
        let html = to_html(&ChartSpec::new("moving_averages_a", figure)).unwrap();

        assert!(html.contains("<title>Moving averages of A&lt;/script&gt;&lt;b&gt;&amp;Co</title>"));
        assert!(html.contains(r#""name":"A\u003c/script>\u003cb>&Co""#));
        assert_eq!(html.matches("</script>").count(), 2);
    }
}
