//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{run_backtest, BacktestConfig, BacktestResult};
use crate::domain::calendar::TradingCalendar;
use crate::domain::config_validation::{
    load_backtest_config, load_durations, load_instruments, load_screen_spec, load_trend_params,
    validate_config,
};
use crate::domain::error::RotatorError;
use crate::domain::metrics::PerformanceSummary;
use crate::domain::pipeline::{self, RebuildSummary};
use crate::domain::quote::Instrument;
use crate::domain::screen::{self, MetricSource, ScreenEngine, ScreenRow, ScreenSpec};
use crate::domain::series::{QuoteBook, QuoteSeries};
use crate::ports::config_port::ConfigPort;
use crate::ports::quote_port::{QuotePort, QuoteSink};
use crate::ports::report_port::ReportPort;
use crate::ports::store_port::DerivedStore;

#[derive(Parser, Debug)]
#[command(name = "rotator", about = "ETF rotation screening and backtesting")]
pub struct Cli {
    /// INI configuration file
    #[arg(short, long, global = true, default_value = "rotator.ini")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Import instruments and quotes from `<SYMBOL>.csv` files
    Import {
        #[arg(short, long)]
        dir: PathBuf,
    },
    /// Rebuild periods, metrics and trend points
    Compute,
    /// Print the ranked screen as of a date
    Screen {
        #[arg(long)]
        date: NaiveDate,
    },
    /// Run the rotation backtest
    Backtest {
        /// Write the rebalance trail as CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show stored quote ranges per instrument
    Info,
}

pub fn run(cli: Cli) -> ExitCode {
    match execute(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn execute(cli: &Cli) -> Result<(), RotatorError> {
    let config = load_config(&cli.config)?;
    validate_config(&config)?;

    #[cfg(feature = "sqlite")]
    {
        use crate::adapters::sqlite_adapter::SqliteAdapter;

        let store = SqliteAdapter::from_config(&config)?;
        store.initialize_schema()?;

        match &cli.command {
            Command::Import { dir } => {
                let instruments = load_instruments(&config)?;
                let source = CsvAdapter::new(dir.clone());
                let written = import_quotes(&source, &store, &instruments)?;
                // New quotes invalidate every derived table until the next compute.
                store.replace_periods(&load_durations(&config)?, &[])?;
                eprintln!(
                    "Imported {written} quotes for {} instruments",
                    instruments.len()
                );
                Ok(())
            }
            Command::Compute => {
                let summary = compute_derived(&config, &store, &store)?;
                print_rebuild_summary(&summary);
                Ok(())
            }
            Command::Screen { date } => {
                let spec = load_screen_spec(&config)?;
                let rows = screen::screen(&store, *date, &symbols(&config)?, &spec)?;
                print_screen(*date, &spec, &rows);
                Ok(())
            }
            Command::Backtest { output } => {
                let bt_config = load_backtest_config(&config)?;
                let result = run_backtest_pipeline(&config, &store, &store, &bt_config)?;
                print_summary(&result, &bt_config);
                if let Some(path) = output {
                    CsvReportAdapter.write(&result, &bt_config, &path.display().to_string())?;
                    eprintln!("Trail written to {}", path.display());
                }
                Ok(())
            }
            Command::Info => print_info(&store, &load_instruments(&config)?),
        }
    }

    #[cfg(not(feature = "sqlite"))]
    {
        Err(RotatorError::Database {
            reason: "rotator was built without the sqlite feature".to_string(),
        })
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, RotatorError> {
    eprintln!("Loading config from {}", path.display());
    FileConfigAdapter::from_file(path)
}

fn symbols(config: &dyn ConfigPort) -> Result<Vec<String>, RotatorError> {
    Ok(load_instruments(config)?
        .into_iter()
        .map(|i| i.symbol)
        .collect())
}

/// Copies each instrument and its quotes from `source` into `sink`.
/// Instruments without a source file are skipped with a warning.
pub fn import_quotes(
    source: &dyn QuotePort,
    sink: &dyn QuoteSink,
    instruments: &[Instrument],
) -> Result<usize, RotatorError> {
    let mut written = 0;
    for instrument in instruments {
        let quotes = match source.fetch_quotes(&instrument.symbol, None, None) {
            Ok(q) => q,
            Err(RotatorError::NoData { symbol }) => {
                warn!("no quote file for {symbol}, skipping");
                continue;
            }
            Err(e) => return Err(e),
        };
        // Duplicate dates fail here; `save_quotes` upserts.
        let series = QuoteSeries::new(instrument.symbol.as_str(), quotes)?;
        sink.save_instrument(instrument)?;
        let count = sink.save_quotes(&series.quotes)?;
        info!("{}: imported {count} quotes", instrument.symbol);
        written += count;
    }
    Ok(written)
}

/// Loads one validated series per symbol. A symbol without quotes is a
/// `NoData` error.
pub fn load_book(port: &dyn QuotePort, symbols: &[String]) -> Result<QuoteBook, RotatorError> {
    let mut series = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        let loaded = QuoteSeries::new(symbol.as_str(), port.fetch_quotes(symbol, None, None)?)?;
        if loaded.is_empty() {
            return Err(RotatorError::NoData {
                symbol: symbol.clone(),
            });
        }
        info!("{symbol}: loaded {} quotes", loaded.len());
        series.push(loaded);
    }
    Ok(QuoteBook::new(series))
}

/// Full rebuild of the derived tables from stored quotes.
pub fn compute_derived(
    config: &dyn ConfigPort,
    quotes: &dyn QuotePort,
    store: &dyn DerivedStore,
) -> Result<RebuildSummary, RotatorError> {
    let book = load_book(quotes, &symbols(config)?)?;
    let durations = load_durations(config)?;
    let params = load_trend_params(config)?;
    pipeline::rebuild(&book, &durations, &params, store)
}

/// Screens the configured universe against `metrics` and simulates the
/// rotation on the cadence's rebalance dates.
pub fn run_backtest_pipeline(
    config: &dyn ConfigPort,
    quotes: &dyn QuotePort,
    metrics: &dyn MetricSource,
    bt_config: &BacktestConfig,
) -> Result<BacktestResult, RotatorError> {
    let universe = symbols(config)?;
    let spec = load_screen_spec(config)?;

    let mut priced: BTreeSet<String> = universe.iter().cloned().collect();
    priced.insert(bt_config.benchmark.clone());
    let priced: Vec<String> = priced.into_iter().collect();
    let book = load_book(quotes, &priced)?;

    let calendar = TradingCalendar::from_series(book.series());
    let dates = calendar.rebalance_dates(bt_config.cadence, bt_config.start_date, bt_config.end_date);
    eprintln!(
        "Backtesting {} instruments over {} {} rebalance dates",
        universe.len(),
        dates.len(),
        bt_config.cadence
    );

    let engine = ScreenEngine {
        source: metrics,
        instruments: universe,
        spec,
    };
    run_backtest(&dates, &engine, &book, bt_config)
}

fn print_rebuild_summary(summary: &RebuildSummary) {
    println!("durations:  {}", summary.durations);
    println!("periods:    {}", summary.periods);
    println!("returns:    {}", summary.returns);
    println!("volatility: {}", summary.volatility);
    println!("ulcer:      {}", summary.ulcer);
    println!("trend:      {}", summary.trend);
}

fn print_screen(date: NaiveDate, spec: &ScreenSpec, rows: &[ScreenRow]) {
    println!("Screen as of {date} ({} weighted)", spec.aggregation);
    let names: Vec<String> = spec.criteria.iter().map(|c| c.metric.to_string()).collect();
    println!("{:>4}  {:<8} {:>10}  {}", "pos", "symbol", "score", names.join("  "));
    for row in rows {
        let values: Vec<String> = row.values.iter().map(|v| format!("{v:.4}")).collect();
        println!(
            "{:>4}  {:<8} {:>10.4}  {}",
            row.position,
            row.symbol,
            row.score,
            values.join("  ")
        );
    }
    if rows.is_empty() {
        println!("(no instrument has every metric on {date})");
    }
}

fn format_pct(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}%", v * 100.0),
        None => "n/a".to_string(),
    }
}

fn print_performance(label: &str, summary: &PerformanceSummary) {
    println!("{label}");
    println!("  final cash:     {:.2}", summary.final_cash);
    println!("  total return:   {}", format_pct(Some(summary.total_return)));
    println!("  volatility:     {}", format_pct(summary.volatility));
    println!("  max drawdown:   {}", format_pct(Some(summary.max_drawdown)));
    println!(
        "  trades:         {} ({} won, {} lost, win rate {})",
        summary.trades,
        summary.trades_won,
        summary.trades_lost,
        format_pct(Some(summary.win_rate))
    );
    println!(
        "  best / worst:   {} / {}",
        format_pct(summary.best_trade),
        format_pct(summary.worst_trade)
    );
}

fn print_summary(result: &BacktestResult, config: &BacktestConfig) {
    print_performance("Strategy", &result.summary);
    print_performance(&format!("Benchmark ({})", config.benchmark), &result.benchmark_summary);
    if !result.skipped.is_empty() {
        println!("Skipped {} rebalance dates with an empty screen", result.skipped.len());
    }
}

fn print_info(port: &dyn QuotePort, instruments: &[Instrument]) -> Result<(), RotatorError> {
    for instrument in instruments {
        match port.get_data_range(&instrument.symbol)? {
            Some((first, last, count)) => {
                println!("{}: {count} quotes, {first} to {last}", instrument.symbol);
            }
            None => eprintln!("{}: no data found", instrument.symbol),
        }
    }
    Ok(())
}
