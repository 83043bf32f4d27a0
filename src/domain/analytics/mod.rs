//! Derived per-instrument metrics.
//!
//! - `MetricKind`: which derived table a value lives in
//! - `MetricKey`: a metric addressable by name (`return_month_3`, `trend`)
//! - `MetricRow`: one `(symbol, period) -> value` entry

pub mod parabolic;
pub mod returns;
pub mod ulcer;
pub mod volatility;
pub mod window;

use crate::domain::duration::Duration;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricKind {
    Return,
    Volatility,
    Ulcer,
    Trend,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Return => "return",
            MetricKind::Volatility => "volatility",
            MetricKind::Ulcer => "ulcer",
            MetricKind::Trend => "trend",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "return" => Ok(MetricKind::Return),
            "volatility" => Ok(MetricKind::Volatility),
            "ulcer" => Ok(MetricKind::Ulcer),
            "trend" => Ok(MetricKind::Trend),
            other => Err(format!("unknown metric kind '{other}'")),
        }
    }
}

/// A metric usable by the screen. Period metrics carry a duration name;
/// `trend` is a per-date stance and has none.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricKey {
    pub kind: MetricKind,
    pub duration: Option<String>,
}

impl MetricKey {
    pub fn new(kind: MetricKind, duration: &Duration) -> Self {
        MetricKey {
            kind,
            duration: Some(duration.name()),
        }
    }

    pub fn trend() -> Self {
        MetricKey {
            kind: MetricKind::Trend,
            duration: None,
        }
    }

    /// Parses `<kind>_<unit>_<qty>` or `trend`.
    pub fn parse(name: &str) -> Result<Self, String> {
        let name = name.trim().to_lowercase();
        if name == "trend" {
            return Ok(MetricKey::trend());
        }
        let (kind, duration) = name
            .split_once('_')
            .ok_or_else(|| format!("metric '{name}' is not <kind>_<unit>_<qty>"))?;
        let kind = kind.parse::<MetricKind>()?;
        if kind == MetricKind::Trend {
            return Err(format!("metric '{name}': trend takes no duration"));
        }
        Duration::parse_name(duration)?;
        Ok(MetricKey {
            kind,
            duration: Some(duration.to_string()),
        })
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.duration {
            Some(d) => write!(f, "{}_{}", self.kind, d),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// One value keyed by `(symbol, period)`.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRow {
    pub symbol: String,
    pub period_id: u32,
    pub value: f64,
}

/// Sample standard deviation (n - 1 denominator). `None` below two values.
pub fn sample_stdev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let sum_sq: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    Some((sum_sq / (n - 1.0)).sqrt())
}
