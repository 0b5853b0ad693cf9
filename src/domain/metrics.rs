//! Performance statistics over closed trades and the equity curve.

use super::position::Trade;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    pub total_profit: f64,
    pub total_profit_pips: Option<f64>,
    pub win_rate: f64,
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
    pub average_profit: f64,
    pub number_of_trades: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub trades_breakeven: usize,
    pub profit_factor: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub final_balance: f64,
}

impl Statistics {
    pub fn compute(trades: &[Trade], equity_curve: &[f64], initial_balance: f64) -> Self {
        let profits: Vec<f64> = trades.iter().map(|t| t.profit_amount).collect();

        let total_profit: f64 = profits.iter().sum();

        let total_profit_pips = if trades.is_empty() {
            None
        } else {
            trades
                .iter()
                .map(|t| t.profit_pips)
                .sum::<Option<f64>>()
        };

        let mut trades_won = 0usize;
        let mut trades_lost = 0usize;
        let mut trades_breakeven = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;

        for &pnl in &profits {
            if pnl > 0.0 {
                trades_won += 1;
                total_wins += pnl;
                if pnl > largest_win {
                    largest_win = pnl;
                }
            } else if pnl < 0.0 {
                trades_lost += 1;
                total_losses += pnl.abs();
                if pnl.abs() > largest_loss {
                    largest_loss = pnl.abs();
                }
            } else {
                trades_breakeven += 1;
            }
        }

        let number_of_trades = trades.len();
        let win_rate = if number_of_trades > 0 {
            trades_won as f64 / number_of_trades as f64
        } else {
            0.0
        };

        let average_profit = if number_of_trades > 0 {
            total_profit / number_of_trades as f64
        } else {
            0.0
        };

        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let final_balance = equity_curve.last().copied().unwrap_or(initial_balance);

        Statistics {
            total_profit,
            total_profit_pips,
            win_rate,
            max_drawdown: compute_drawdown(equity_curve, initial_balance),
            sharpe_ratio: compute_sharpe(&profits),
            average_profit,
            number_of_trades,
            trades_won,
            trades_lost,
            trades_breakeven,
            profit_factor,
            largest_win,
            largest_loss,
            final_balance,
        }
    }
}

/// Worst dip below the initial balance as a fraction of it.
///
/// This is deliberately not a running-peak drawdown: a curve that rises
/// and then falls back to the initial balance reports 0.
fn compute_drawdown(equity_curve: &[f64], initial_balance: f64) -> f64 {
    if initial_balance <= 0.0 {
        return 0.0;
    }
    let min_equity = equity_curve
        .iter()
        .copied()
        .fold(initial_balance, f64::min);
    (initial_balance - min_equity) / initial_balance
}

/// Per-trade Sharpe ratio annualized with sqrt(252); sample stddev.
fn compute_sharpe(profits: &[f64]) -> f64 {
    if profits.len() < 2 {
        return 0.0;
    }

    let n = profits.len() as f64;
    let mean = profits.iter().sum::<f64>() / n;
    let variance = profits.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let stddev = variance.sqrt();

    if stddev > 0.0 && stddev.is_finite() {
        (mean / stddev) * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    }
}
