//! Instruments and daily quotes.

use chrono::NaiveDate;

use super::error::RotatorError;

/// A tradable instrument. Identity is the symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instrument {
    pub symbol: String,
    pub description: String,
}

impl Instrument {
    pub fn new(symbol: impl Into<String>, description: impl Into<String>) -> Self {
        Instrument {
            symbol: symbol.into().to_uppercase(),
            description: description.into(),
        }
    }
}

/// One daily bar for one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
    pub adj_close: f64,
}

impl Quote {
    /// Rejects negative or non-finite prices and volumes.
    pub fn validate(&self) -> Result<(), RotatorError> {
        let fields = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("adj_close", self.adj_close),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(RotatorError::integrity(format!(
                    "{} {} on {} is {}",
                    self.symbol, name, self.date, value
                )));
            }
        }
        if self.volume < 0 {
            return Err(RotatorError::integrity(format!(
                "{} volume on {} is negative",
                self.symbol, self.date
            )));
        }
        Ok(())
    }
}
