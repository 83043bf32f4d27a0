//! Period returns from adjusted closes.
//!
//! RETURN[p] = (ADJ[p.end] - ADJ[p.start]) / ADJ[p.start]
//! Absent when the instrument lacks a quote on either endpoint.

use crate::domain::analytics::MetricRow;
use crate::domain::error::RotatorError;
use crate::domain::period::Period;
use crate::domain::series::QuoteSeries;

pub fn compute_returns(
    periods: &[Period],
    series: &[QuoteSeries],
) -> Result<Vec<MetricRow>, RotatorError> {
    let mut rows = Vec::new();
    for s in series {
        rows.extend(instrument_returns(periods, s)?);
    }
    Ok(rows)
}

pub fn instrument_returns(
    periods: &[Period],
    series: &QuoteSeries,
) -> Result<Vec<MetricRow>, RotatorError> {
    let mut rows = Vec::new();
    for period in periods {
        let (Some(start), Some(end)) = (series.adj_close(period.start), series.adj_close(period.end))
        else {
            continue;
        };
        if start <= 0.0 {
            return Err(RotatorError::integrity(format!(
                "{} adjusted close on {} is {}, cannot compute return",
                series.symbol, period.start, start
            )));
        }
        rows.push(MetricRow {
            symbol: series.symbol.clone(),
            period_id: period.id,
            value: (end - start) / start,
        });
    }
    Ok(rows)
}
