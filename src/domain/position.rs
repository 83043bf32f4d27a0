//! Open holding and settled round trip.

use chrono::NaiveDate;

/// Whole-share long holding.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub symbol: String,
    pub shares: i64,
    pub entry_price: f64,
    pub entry_date: NaiveDate,
}

impl Position {
    pub fn cost(&self) -> f64 {
        self.shares as f64 * self.entry_price
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.shares as f64 * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.shares as f64 * (price - self.entry_price)
    }

    /// Settles the holding at `price` on `date`.
    pub fn close(self, price: f64, date: NaiveDate) -> ClosedTrade {
        ClosedTrade {
            pnl: self.unrealized_pnl(price),
            pnl_pct: price / self.entry_price - 1.0,
            symbol: self.symbol,
            shares: self.shares,
            entry_price: self.entry_price,
            exit_price: price,
            entry_date: self.entry_date,
            exit_date: date,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClosedTrade {
    pub symbol: String,
    pub shares: i64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub pnl: f64,
    pub pnl_pct: f64,
}

impl ClosedTrade {
    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }
}
