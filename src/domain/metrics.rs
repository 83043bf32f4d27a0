//! Performance summary of a simulated account.

use super::analytics::sample_stdev;
use super::portfolio::{Account, EquityPoint};

#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceSummary {
    pub final_cash: f64,
    pub total_return: f64,
    /// Sample stdev of per-trade returns, annualized by rebalance frequency.
    /// `None` below two trades.
    pub volatility: Option<f64>,
    pub max_drawdown: f64,
    pub trades: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub win_rate: f64,
    pub best_trade: Option<f64>,
    pub worst_trade: Option<f64>,
}

impl PerformanceSummary {
    pub fn compute(account: &Account, periods_per_year: f64) -> Self {
        let returns = account.trade_returns();
        let volatility =
            sample_stdev(&returns).map(|sd| sd * periods_per_year.sqrt());

        let trades_won = account.closed_trades.iter().filter(|t| t.is_win()).count();
        let trades_lost = account
            .closed_trades
            .iter()
            .filter(|t| t.pnl < 0.0)
            .count();
        let trades = account.closed_trades.len();
        let win_rate = if trades > 0 {
            trades_won as f64 / trades as f64
        } else {
            0.0
        };

        PerformanceSummary {
            final_cash: account.cash,
            total_return: account.total_return(),
            volatility,
            max_drawdown: compute_drawdown(&account.equity_curve),
            trades,
            trades_won,
            trades_lost,
            win_rate,
            best_trade: returns.iter().copied().reduce(f64::max),
            worst_trade: returns.iter().copied().reduce(f64::min),
        }
    }
}

/// Largest peak-to-trough fall as a fraction of the peak.
fn compute_drawdown(equity_curve: &[EquityPoint]) -> f64 {
    let Some(first) = equity_curve.first() else {
        return 0.0;
    };
    let mut peak = first.equity;
    let mut max_dd = 0.0_f64;
    for point in equity_curve {
        if point.equity > peak {
            peak = point.equity;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - point.equity) / peak);
        }
    }
    max_dd
}
