//! Period generation from a duration and the trading calendar.

use crate::domain::calendar::TradingCalendar;
use crate::domain::duration::Duration;
use crate::domain::error::RotatorError;
use chrono::NaiveDate;

/// A concrete `(start, end)` window of one duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Period {
    pub id: u32,
    pub duration_id: u32,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// One period ending on every calendar date from index `trading_days` onward.
///
/// Ids are assigned sequentially from `first_id`.
pub fn generate_periods(
    duration: &Duration,
    calendar: &TradingCalendar,
    first_id: u32,
) -> Result<Vec<Period>, RotatorError> {
    let days = duration.trading_days;
    let dates = calendar.dates();

    if days == 0 || dates.len() < days + 1 {
        return Err(RotatorError::InsufficientHistory {
            what: format!("{} periods", duration.name()),
            have: dates.len(),
            need: days + 1,
        });
    }

    Ok(dates
        .iter()
        .zip(dates[days..].iter())
        .enumerate()
        .map(|(i, (&start, &end))| Period {
            id: first_id + i as u32,
            duration_id: duration.id,
            start,
            end,
        })
        .collect())
}

/// Generates periods for every duration, numbering ids contiguously across them.
pub fn generate_all_periods(
    durations: &[Duration],
    calendar: &TradingCalendar,
) -> Result<Vec<Period>, RotatorError> {
    let mut periods = Vec::new();
    for duration in durations {
        let next_id = periods.len() as u32 + 1;
        periods.extend(generate_periods(duration, calendar, next_id)?);
    }
    Ok(periods)
}
