//! CSV report adapter implementing ReportPort.
//!
//! One row per processed rebalance date, followed by a row per skipped date.

use std::path::Path;

use crate::domain::backtest::{BacktestConfig, BacktestResult, RebalanceEntry};
use crate::domain::error::RotatorError;
use crate::ports::report_port::ReportPort;
use chrono::NaiveDate;
use log::info;

const HEADER: [&str; 12] = [
    "date",
    "action",
    "sold",
    "sold_shares",
    "exit_price",
    "pnl",
    "pnl_pct",
    "bought",
    "bought_shares",
    "entry_price",
    "cash",
    "benchmark_cash",
];

pub struct CsvReportAdapter;

fn fmt_money(v: f64) -> String {
    format!("{v:.2}")
}

fn entry_record(entry: &RebalanceEntry) -> Vec<String> {
    let action = match (&entry.exited, &entry.entered) {
        (Some(_), Some(_)) => "rotate",
        (None, Some(_)) => "enter",
        (Some(_), None) => "exit",
        (None, None) => "hold",
    };
    let (sold, sold_shares, exit_price, pnl, pnl_pct) = match &entry.exited {
        Some(t) => (
            t.symbol.clone(),
            t.shares.to_string(),
            format!("{:.4}", t.exit_price),
            fmt_money(t.pnl),
            format!("{:.6}", t.pnl_pct),
        ),
        None => Default::default(),
    };
    let (bought, bought_shares, entry_price) = match &entry.entered {
        Some(f) => (f.symbol.clone(), f.shares.to_string(), format!("{:.4}", f.price)),
        None => Default::default(),
    };
    vec![
        entry.date.to_string(),
        action.to_string(),
        sold,
        sold_shares,
        exit_price,
        pnl,
        pnl_pct,
        bought,
        bought_shares,
        entry_price,
        fmt_money(entry.cash),
        fmt_money(entry.benchmark_cash),
    ]
}

fn skipped_record(date: NaiveDate) -> Vec<String> {
    let mut record = vec![String::new(); HEADER.len()];
    record[0] = date.to_string();
    record[1] = "skip".to_string();
    record
}

impl CsvReportAdapter {
    pub fn render<W: std::io::Write>(
        &self,
        result: &BacktestResult,
        writer: W,
    ) -> Result<(), RotatorError> {
        let to_err = |e: csv::Error| RotatorError::integrity(format!("report write failed: {e}"));
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(HEADER).map_err(to_err)?;
        for entry in &result.trail {
            wtr.write_record(entry_record(entry)).map_err(to_err)?;
        }
        for &date in &result.skipped {
            wtr.write_record(skipped_record(date)).map_err(to_err)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(
        &self,
        result: &BacktestResult,
        config: &BacktestConfig,
        output_path: &str,
    ) -> Result<(), RotatorError> {
        let file = std::fs::File::create(Path::new(output_path))?;
        self.render(result, file)?;
        info!(
            "wrote {} rebalance rows ({} vs {}) to {output_path}",
            result.trail.len(),
            config.cadence,
            config.benchmark
        );
        Ok(())
    }
}
