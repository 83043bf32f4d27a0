//! Trading calendar and rebalance cadence.
//!
//! The calendar is the sorted union of every instrument's quote dates. It is
//! built once and handed explicitly to the period generator and the
//! rebalance schedule.

use crate::domain::series::QuoteSeries;
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TradingCalendar {
    dates: Vec<NaiveDate>,
}

impl TradingCalendar {
    pub fn from_series(series: &[QuoteSeries]) -> Self {
        let unique: BTreeSet<NaiveDate> = series
            .iter()
            .flat_map(|s| s.quotes.iter().map(|q| q.date))
            .collect();
        Self {
            dates: unique.into_iter().collect(),
        }
    }

    pub fn from_dates<I: IntoIterator<Item = NaiveDate>>(dates: I) -> Self {
        let unique: BTreeSet<NaiveDate> = dates.into_iter().collect();
        Self {
            dates: unique.into_iter().collect(),
        }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Last trading day of each calendar month.
    pub fn month_ends(&self) -> Vec<NaiveDate> {
        self.last_per_bucket(|d| (d.year(), d.month()))
    }

    /// Last trading day of each calendar quarter.
    pub fn quarter_ends(&self) -> Vec<NaiveDate> {
        self.last_per_bucket(|d| (d.year(), d.month0() / 3))
    }

    fn last_per_bucket<K: PartialEq>(&self, key: impl Fn(&NaiveDate) -> K) -> Vec<NaiveDate> {
        let mut ends: Vec<NaiveDate> = Vec::new();
        for (i, date) in self.dates.iter().enumerate() {
            let is_last = match self.dates.get(i + 1) {
                Some(next) => key(next) != key(date),
                None => true,
            };
            if is_last {
                ends.push(*date);
            }
        }
        ends
    }

    /// Rebalance dates for a cadence, restricted to `[start, end]` when given.
    pub fn rebalance_dates(
        &self,
        cadence: Cadence,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Vec<NaiveDate> {
        let dates = match cadence {
            Cadence::Monthly => self.month_ends(),
            Cadence::Quarterly => self.quarter_ends(),
        };
        dates
            .into_iter()
            .filter(|d| start.is_none_or(|s| *d >= s) && end.is_none_or(|e| *d <= e))
            .collect()
    }
}

/// How often the simulator rebalances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    Monthly,
    Quarterly,
}

impl Cadence {
    pub fn periods_per_year(&self) -> f64 {
        match self {
            Cadence::Monthly => 12.0,
            Cadence::Quarterly => 4.0,
        }
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cadence::Monthly => write!(f, "monthly"),
            Cadence::Quarterly => write!(f, "quarterly"),
        }
    }
}

impl FromStr for Cadence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "monthly" | "month" => Ok(Cadence::Monthly),
            "quarterly" | "quarter" => Ok(Cadence::Quarterly),
            other => Err(format!("unknown cadence '{other}'")),
        }
    }
}
