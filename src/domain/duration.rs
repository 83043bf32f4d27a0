//! Named trading-day window lengths.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DurationUnit {
    Day,
    Month,
}

impl fmt::Display for DurationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DurationUnit::Day => write!(f, "day"),
            DurationUnit::Month => write!(f, "month"),
        }
    }
}

impl FromStr for DurationUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(DurationUnit::Day),
            "month" => Ok(DurationUnit::Month),
            other => Err(format!("unknown duration unit '{other}'")),
        }
    }
}

/// A duration such as `month_3`: a label plus the number of trading days it spans.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Duration {
    pub id: u32,
    pub unit: DurationUnit,
    pub unit_qty: u32,
    pub trading_days: usize,
}

impl Duration {
    pub fn new(id: u32, unit: DurationUnit, unit_qty: u32, trading_days: usize) -> Self {
        Duration {
            id,
            unit,
            unit_qty,
            trading_days,
        }
    }

    /// `<unit>_<qty>`, e.g. `day_20`.
    pub fn name(&self) -> String {
        format!("{}_{}", self.unit, self.unit_qty)
    }

    pub fn is_daily(&self) -> bool {
        self.trading_days == 1
    }

    /// Splits a `<unit>_<qty>` name.
    pub fn parse_name(name: &str) -> Result<(DurationUnit, u32), String> {
        let (unit, qty) = name
            .trim()
            .rsplit_once('_')
            .ok_or_else(|| format!("duration name '{name}' is not <unit>_<qty>"))?;
        let unit = unit.to_lowercase().parse::<DurationUnit>()?;
        let qty = qty
            .parse::<u32>()
            .map_err(|_| format!("duration quantity '{qty}' is not a positive integer"))?;
        if qty == 0 {
            return Err(format!("duration '{name}' has zero quantity"));
        }
        Ok((unit, qty))
    }

    /// The window set the original analysis ran with.
    pub fn defaults() -> Vec<Duration> {
        vec![
            Duration::new(1, DurationUnit::Day, 1, 1),
            Duration::new(2, DurationUnit::Day, 10, 10),
            Duration::new(3, DurationUnit::Day, 20, 20),
            Duration::new(4, DurationUnit::Day, 30, 30),
            Duration::new(5, DurationUnit::Month, 1, 21),
            Duration::new(6, DurationUnit::Month, 3, 63),
            Duration::new(7, DurationUnit::Month, 6, 126),
        ]
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} trading days)", self.name(), self.trading_days)
    }
}

pub fn find_daily(durations: &[Duration]) -> Option<&Duration> {
    durations.iter().find(|d| d.is_daily())
}

pub fn find_by_name<'a>(durations: &'a [Duration], name: &str) -> Option<&'a Duration> {
    durations.iter().find(|d| d.name() == name)
}
