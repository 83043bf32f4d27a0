//! Rotation backtest over a schedule of rebalance dates.
//!
//! On each date the screen picks one instrument. The open holding is sold at
//! that date's price and the whole cash balance is rolled into the top
//! candidate. A benchmark account is sold and rebought on the same dates.
//! The final date only liquidates, without consulting the screen. Any other
//! date whose screen is empty is skipped and the holding carries over.

use chrono::NaiveDate;
use log::{debug, info};

use super::calendar::Cadence;
use super::error::RotatorError;
use super::metrics::PerformanceSummary;
use super::portfolio::Account;
use super::position::ClosedTrade;
use super::screen::Screener;

/// Settlement price of an instrument on a date.
pub trait PriceSource {
    fn price(&self, symbol: &str, date: NaiveDate) -> Option<f64>;
}

#[derive(Debug, Clone)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    pub benchmark: String,
    pub cadence: Cadence,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub symbol: String,
    pub shares: i64,
    pub price: f64,
}

/// What happened on one processed rebalance date.
#[derive(Debug, Clone, PartialEq)]
pub struct RebalanceEntry {
    pub date: NaiveDate,
    pub exited: Option<ClosedTrade>,
    pub entered: Option<Fill>,
    pub benchmark_exited: Option<ClosedTrade>,
    pub cash: f64,
    pub benchmark_cash: f64,
    pub equity: f64,
    pub benchmark_equity: f64,
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub strategy: Account,
    pub benchmark: Account,
    pub trail: Vec<RebalanceEntry>,
    pub skipped: Vec<NaiveDate>,
    pub summary: PerformanceSummary,
    pub benchmark_summary: PerformanceSummary,
}

impl BacktestResult {
    pub fn total_return(&self) -> f64 {
        self.summary.total_return
    }

    pub fn benchmark_return(&self) -> f64 {
        self.benchmark_summary.total_return
    }

    pub fn volatility(&self) -> Option<f64> {
        self.summary.volatility
    }

    pub fn benchmark_volatility(&self) -> Option<f64> {
        self.benchmark_summary.volatility
    }
}

pub fn run_backtest(
    dates: &[NaiveDate],
    screener: &dyn Screener,
    prices: &dyn PriceSource,
    config: &BacktestConfig,
) -> Result<BacktestResult, RotatorError> {
    if !config.initial_capital.is_finite() || config.initial_capital <= 0.0 {
        return Err(RotatorError::invalid_config(
            "backtest",
            "initial_capital",
            format!("{} is not a positive amount", config.initial_capital),
        ));
    }
    if dates.is_empty() {
        return Err(RotatorError::InsufficientHistory {
            what: "rebalance dates".into(),
            have: 0,
            need: 1,
        });
    }

    let mut strategy = Account::new(config.initial_capital);
    let mut benchmark = Account::new(config.initial_capital);
    let mut trail = Vec::with_capacity(dates.len());
    let mut skipped = Vec::new();

    info!(
        "backtest: {} rebalance dates {} to {}, benchmark {}",
        dates.len(),
        dates[0],
        dates[dates.len() - 1],
        config.benchmark
    );

    for (i, &date) in dates.iter().enumerate() {
        let is_last = i + 1 == dates.len();

        let pick = if is_last {
            None
        } else {
            let candidates = screener.screen(date)?;
            match candidates.into_iter().next() {
                Some(top) => Some(top.symbol),
                None => {
                    info!("{date}: screen returned no candidates, holding");
                    skipped.push(date);
                    continue;
                }
            }
        };

        let exited = settle(&mut strategy, prices, date)?;
        let benchmark_exited = settle(&mut benchmark, prices, date)?;

        let entered = match pick {
            Some(symbol) => {
                let price = price_on(prices, &symbol, date)?;
                let shares = strategy.open(&symbol, price, date)?;
                let bench_price = price_on(prices, &config.benchmark, date)?;
                benchmark.open(&config.benchmark, bench_price, date)?;
                debug!("{date}: bought {shares} {symbol} at {price:.4}");
                (shares > 0).then_some(Fill {
                    symbol,
                    shares,
                    price,
                })
            }
            None => None,
        };

        let equity = mark(&strategy, prices, date);
        let benchmark_equity = mark(&benchmark, prices, date);
        strategy.record_equity(date, equity);
        benchmark.record_equity(date, benchmark_equity);

        trail.push(RebalanceEntry {
            date,
            exited,
            entered,
            benchmark_exited,
            cash: strategy.cash,
            benchmark_cash: benchmark.cash,
            equity,
            benchmark_equity,
        });
    }

    let periods_per_year = config.cadence.periods_per_year();
    let summary = PerformanceSummary::compute(&strategy, periods_per_year);
    let benchmark_summary = PerformanceSummary::compute(&benchmark, periods_per_year);

    info!(
        "backtest: strategy {:.2}% over {} trades, benchmark {:.2}%",
        summary.total_return * 100.0,
        summary.trades,
        benchmark_summary.total_return * 100.0
    );

    Ok(BacktestResult {
        strategy,
        benchmark,
        trail,
        skipped,
        summary,
        benchmark_summary,
    })
}

fn price_on(prices: &dyn PriceSource, symbol: &str, date: NaiveDate) -> Result<f64, RotatorError> {
    prices
        .price(symbol, date)
        .ok_or_else(|| RotatorError::integrity(format!("no price for {symbol} on {date}")))
}

fn settle(
    account: &mut Account,
    prices: &dyn PriceSource,
    date: NaiveDate,
) -> Result<Option<ClosedTrade>, RotatorError> {
    let Some(symbol) = account.holding().map(str::to_string) else {
        return Ok(None);
    };
    let price = price_on(prices, &symbol, date)?;
    let trade = account.liquidate(price, date);
    if let Some(t) = &trade {
        debug!(
            "{date}: sold {} {} at {price:.4}, pnl {:.2} ({:.2}%)",
            t.shares,
            t.symbol,
            t.pnl,
            t.pnl_pct * 100.0
        );
    }
    Ok(trade)
}

fn mark(account: &Account, prices: &dyn PriceSource, date: NaiveDate) -> f64 {
    let price = account.holding().and_then(|s| prices.price(s, date));
    account.equity(price)
}
