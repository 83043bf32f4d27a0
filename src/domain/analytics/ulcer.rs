//! Ulcer index over raw closing prices.
//!
//! For the `n` closes ending at the period end, with a running maximum `mx`
//! restarted at the first close of the window:
//! ULCER = sqrt(sum((100 * (p - mx) / mx)^2) / n)

use crate::domain::analytics::MetricRow;
use crate::domain::analytics::window::DatedSeries;
use crate::domain::duration::Duration;
use crate::domain::error::RotatorError;
use crate::domain::period::Period;
use crate::domain::series::QuoteSeries;

pub fn compute_ulcer_index(
    durations: &[Duration],
    periods: &[Period],
    series: &[QuoteSeries],
) -> Result<Vec<MetricRow>, RotatorError> {
    let closes: Vec<(&str, DatedSeries)> = series
        .iter()
        .map(|s| {
            let points = s.quotes.iter().map(|q| (q.date, q.close)).collect();
            (s.symbol.as_str(), DatedSeries::new(points))
        })
        .collect();

    let mut rows = Vec::new();
    for duration in durations.iter().filter(|d| !d.is_daily()) {
        let days = duration.trading_days;
        for (symbol, prices) in &closes {
            for period in periods.iter().filter(|p| p.duration_id == duration.id) {
                let Some(window) = prices.trailing(period.end, days) else {
                    continue;
                };
                let value = ulcer_index(window).map_err(|reason| {
                    RotatorError::integrity(format!("{symbol} ulcer index at {}: {reason}", period.end))
                })?;
                rows.push(MetricRow {
                    symbol: symbol.to_string(),
                    period_id: period.id,
                    value,
                });
            }
        }
    }
    Ok(rows)
}

/// Ulcer index of one chronological window. Fails on a non-positive running maximum.
pub fn ulcer_index(prices: &[f64]) -> Result<f64, String> {
    if prices.is_empty() {
        return Ok(0.0);
    }
    let mut mx = f64::NEG_INFINITY;
    let mut sum_sq = 0.0;
    for &p in prices {
        if p > mx {
            mx = p;
        }
        if mx <= 0.0 {
            return Err(format!("running maximum {mx} is not positive"));
        }
        let drawdown = 100.0 * (p - mx) / mx;
        sum_sq += drawdown * drawdown;
    }
    Ok((sum_sq / prices.len() as f64).sqrt())
}
