use stock_performance::config::{parse_company, Config};
use stock_performance::scrapers::yahoo::YahooScraper;
use stock_performance::services::analysis_service::AnalysisService;
use stock_performance::util;

use anyhow::{anyhow, Context};
use clap::{Arg, ArgMatches, Command};
use log::info;
use std::sync::Arc;

fn data_args(today: &str) -> Vec<Arg<'_>> {
    vec![
        Arg::new("company")
            .short('c')
            .long("company")
            .value_name("NAME=SYMBOL")
            .help("Company to analyze, repeatable (default: Microsoft, Netflix, Google, Apple)")
            .takes_value(true)
            .multiple_occurrences(true),
        Arg::new("months")
            .short('m')
            .long("months")
            .value_name("MONTHS")
            .help("Number of trailing months to fetch")
            .takes_value(true)
            .default_value("3"),
        Arg::new("end-date")
            .short('d')
            .long("end-date")
            .value_name("DATE")
            .help("Last day of the window (YYYY-MM-DD), inclusive: today's bar may still be trading")
            .takes_value(true)
            .default_value(today),
        Arg::new("preview")
            .long("preview")
            .value_name("ROWS")
            .help("Rows shown from each end of the table")
            .takes_value(true)
            .default_value("5"),
    ]
}

fn build_config(matches: &ArgMatches) -> anyhow::Result<Config> {
    let mut config = Config::new();

    if let Some(values) = matches.values_of("company") {
        let companies = values
            .map(parse_company)
            .collect::<Result<Vec<_>, _>>()?;
        config = config.with_companies(companies);
    }

    let months = matches
        .value_of("months")
        .unwrap_or("3")
        .parse::<u32>()
        .context("--months must be a positive integer")?;
    let preview = matches
        .value_of("preview")
        .unwrap_or("5")
        .parse::<usize>()
        .context("--preview must be a non-negative integer")?;

    Ok(config.with_lookback_months(months).with_preview_rows(preview))
}

/// Correlation pair and output directory, only known to `analyze`
fn apply_chart_args(config: Config, matches: &ArgMatches) -> anyhow::Result<Config> {
    let pair = matches.value_of("pair").unwrap_or("Apple,Microsoft");
    let (left, right) = pair
        .split_once(',')
        .ok_or_else(|| anyhow!("--pair expects two company names separated by a comma"))?;

    Ok(config
        .with_pair(left.trim(), right.trim())
        .with_output_dir(matches.value_of("output").unwrap_or("charts")))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let today = chrono::Local::now().format("%Y-%m-%d").to_string();

    let app = Command::new("stock_analysis")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Stock performance analysis of major companies")
        .subcommand(
            Command::new("analyze")
                .about("Fetch prices, derive statistics and write charts")
                .args(data_args(&today))
                .arg(
                    Arg::new("pair")
                        .short('p')
                        .long("pair")
                        .value_name("A,B")
                        .help("Two companies compared in the correlation chart")
                        .takes_value(true)
                        .default_value("Apple,Microsoft"),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_name("DIR")
                        .help("Directory the HTML charts are written to")
                        .takes_value(true)
                        .default_value("charts"),
                ),
        )
        .subcommand(
            Command::new("fetch")
                .about("Fetch prices and print the assembled table")
                .args(data_args(&today)),
        );

    let matches = app.get_matches();

    match matches.subcommand() {
        Some(("analyze", sub)) => {
            let end = util::parse_date(sub.value_of("end-date").unwrap_or(&today))?;
            let config = apply_chart_args(build_config(sub)?, sub)?;
            config.validate()?;

            let source = Arc::new(YahooScraper::from_config(&config)?);
            let service = AnalysisService::new(config, source);

            let report = service.run(end).await.context("analysis failed")?;
            for path in &report.written {
                info!("Chart: {}", path.display());
            }
        }
        Some(("fetch", sub)) => {
            let end = util::parse_date(sub.value_of("end-date").unwrap_or(&today))?;
            let config = build_config(sub)?;
            let (start, end) = config.date_window(end)?;
            let source = Arc::new(YahooScraper::from_config(&config)?);
            let service = AnalysisService::new(config, source);

            let table = service.build_table(start, end).await.context("fetch failed")?;
            info!("Fetched {} rows for {} companies", table.len(), table.companies().len());
        }
        _ => {
            info!("No command specified. Use --help for usage information.");
        }
    }

    Ok(())
}
