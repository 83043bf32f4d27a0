//! Cash account holding at most one position at a time.

use chrono::NaiveDate;

use super::error::RotatorError;
use super::position::{ClosedTrade, Position};

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub cash: f64,
    pub initial_capital: f64,
    pub position: Option<Position>,
    pub closed_trades: Vec<ClosedTrade>,
    pub equity_curve: Vec<EquityPoint>,
}

impl Account {
    pub fn new(initial_capital: f64) -> Self {
        Account {
            cash: initial_capital,
            initial_capital,
            position: None,
            closed_trades: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    pub fn holding(&self) -> Option<&str> {
        self.position.as_ref().map(|p| p.symbol.as_str())
    }

    /// Spends cash on `floor(cash / price)` shares. Returns the share count;
    /// zero shares opens nothing.
    pub fn open(
        &mut self,
        symbol: &str,
        price: f64,
        date: NaiveDate,
    ) -> Result<i64, RotatorError> {
        if self.position.is_some() {
            return Err(RotatorError::integrity(format!(
                "cannot buy {symbol} on {date}: a position is already open"
            )));
        }
        if !price.is_finite() || price <= 0.0 {
            return Err(RotatorError::integrity(format!(
                "cannot buy {symbol} on {date} at price {price}"
            )));
        }
        let shares = (self.cash / price).floor() as i64;
        if shares <= 0 {
            return Ok(0);
        }
        let position = Position {
            symbol: symbol.to_string(),
            shares,
            entry_price: price,
            entry_date: date,
        };
        self.cash -= position.cost();
        self.position = Some(position);
        Ok(shares)
    }

    /// Sells the open position, if any, and books the round trip.
    pub fn liquidate(&mut self, price: f64, date: NaiveDate) -> Option<ClosedTrade> {
        let position = self.position.take()?;
        self.cash += position.market_value(price);
        let trade = position.close(price, date);
        self.closed_trades.push(trade.clone());
        Some(trade)
    }

    pub fn equity(&self, price: Option<f64>) -> f64 {
        let held = match (&self.position, price) {
            (Some(pos), Some(p)) => pos.market_value(p),
            (Some(pos), None) => pos.cost(),
            (None, _) => 0.0,
        };
        self.cash + held
    }

    pub fn record_equity(&mut self, date: NaiveDate, equity: f64) {
        self.equity_curve.push(EquityPoint { date, equity });
    }

    /// Per-trade percentage returns, in settlement order.
    pub fn trade_returns(&self) -> Vec<f64> {
        self.closed_trades.iter().map(|t| t.pnl_pct).collect()
    }

    pub fn total_return(&self) -> f64 {
        if self.initial_capital == 0.0 {
            return 0.0;
        }
        (self.cash - self.initial_capital) / self.initial_capital
    }
}
