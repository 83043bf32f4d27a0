//! Annualized volatility of daily returns per multi-day period.
//!
//! VOL[p] = stdev(daily returns ending in (p.start, p.end]) * sqrt(254)
//! Sample standard deviation. No row when fewer than `trading_days`
//! daily returns fall inside the window.

use crate::domain::analytics::window::DatedSeries;
use crate::domain::analytics::{MetricRow, sample_stdev};
use crate::domain::duration::{Duration, find_daily};
use crate::domain::error::RotatorError;
use crate::domain::period::Period;
use chrono::NaiveDate;
use std::collections::HashMap;

pub const ANNUALIZATION_DAYS: f64 = 254.0;

/// `returns` must include the 1-day duration's rows; rows of other durations
/// are ignored. Output is grouped by duration, then by symbol in `symbols` order.
pub fn compute_volatility(
    durations: &[Duration],
    periods: &[Period],
    returns: &[MetricRow],
    symbols: &[String],
) -> Result<Vec<MetricRow>, RotatorError> {
    let daily = find_daily(durations).ok_or_else(|| RotatorError::ConfigMissing {
        section: "durations".into(),
        key: "day_1".into(),
    })?;

    let daily_ends: HashMap<u32, NaiveDate> = periods
        .iter()
        .filter(|p| p.duration_id == daily.id)
        .map(|p| (p.id, p.end))
        .collect();

    let mut by_symbol: HashMap<&str, Vec<(NaiveDate, f64)>> = HashMap::new();
    for row in returns {
        if let Some(&end) = daily_ends.get(&row.period_id) {
            by_symbol
                .entry(row.symbol.as_str())
                .or_default()
                .push((end, row.value));
        }
    }
    let daily_series: HashMap<&str, DatedSeries> = by_symbol
        .into_iter()
        .map(|(sym, points)| (sym, DatedSeries::new(points)))
        .collect();

    let mut rows = Vec::new();
    for duration in durations.iter().filter(|d| !d.is_daily()) {
        let windows: Vec<&Period> = periods
            .iter()
            .filter(|p| p.duration_id == duration.id)
            .collect();

        for symbol in symbols {
            let Some(series) = daily_series.get(symbol.as_str()) else {
                continue;
            };
            rows.extend(instrument_volatility(
                symbol,
                series,
                &windows,
                duration.trading_days,
            ));
        }
    }
    Ok(rows)
}

fn instrument_volatility(
    symbol: &str,
    daily: &DatedSeries,
    periods: &[&Period],
    days: usize,
) -> Vec<MetricRow> {
    daily
        .windows(periods.iter().map(|p| (p.start, p.end)))
        .zip(periods.iter())
        .filter(|(window, _)| window.values.len() >= days)
        .filter_map(|(window, period)| {
            sample_stdev(window.values).map(|sd| MetricRow {
                symbol: symbol.to_string(),
                period_id: period.id,
                value: sd * ANNUALIZATION_DAYS.sqrt(),
            })
        })
        .collect()
}
