//! Backtest entry point.
//!
//! `run` validates the configuration and the bar series, folds the bars
//! through a fresh [`PositionStateMachine`] and reduces the outcome into
//! [`Statistics`]. Nothing is shared between runs.

use log::info;

use super::bar::Bar;
use super::engine::{ExitRule, PositionStateMachine};
use super::error::FxlabError;
use super::metrics::Statistics;
use super::position::{Position, Trade};

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_balance: f64,
    pub exit_rule: ExitRule,
    pub force_close_at_end: bool,
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), FxlabError> {
        if !(self.initial_balance.is_finite() && self.initial_balance > 0.0) {
            return Err(FxlabError::invalid(
                "backtest",
                "initial_balance",
                "initial_balance must be positive",
            ));
        }
        self.exit_rule.validate()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub total_profit: f64,
    pub total_profit_pips: Option<f64>,
    pub win_rate: f64,
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
    pub average_profit: f64,
    pub number_of_trades: usize,
    /// Closed trades in entry order.
    pub trade_log: Vec<Trade>,
    /// Trades still open when the bars ran out. Excluded from statistics.
    pub open_positions: Vec<Position>,
    pub equity_curve: Vec<f64>,
    pub statistics: Statistics,
}

/// Checks ordering, prices and that the signals are not null throughout.
///
/// Leading bars with null signals (indicator warm-up) are accepted.
pub fn validate_bars(bars: &[Bar]) -> Result<(), FxlabError> {
    for (index, bar) in bars.iter().enumerate() {
        if !bar.has_valid_prices() {
            return Err(FxlabError::MalformedInput {
                index,
                reason: "prices must be positive and finite".into(),
            });
        }
        if index > 0 && bar.time <= bars[index - 1].time {
            return Err(FxlabError::MalformedInput {
                index,
                reason: format!(
                    "timestamps must strictly increase ({} follows {})",
                    bar.time,
                    bars[index - 1].time
                ),
            });
        }
    }

    if !bars.is_empty() && !bars.iter().any(Bar::has_any_signal) {
        return Err(FxlabError::MalformedInput {
            index: 0,
            reason: "signal columns are missing or null on every bar".into(),
        });
    }

    Ok(())
}

pub fn run(bars: &[Bar], config: &BacktestConfig) -> Result<BacktestResult, FxlabError> {
    config.validate()?;
    validate_bars(bars)?;

    info!(
        "running {} backtest over {} bars (initial balance {:.2})",
        config.exit_rule.name(),
        bars.len(),
        config.initial_balance
    );

    let machine = PositionStateMachine::new(config.exit_rule, config.initial_balance);
    let outcome = bars
        .iter()
        .try_fold(machine, PositionStateMachine::step)?
        .finish(config.force_close_at_end)?;

    let statistics = Statistics::compute(
        &outcome.trades,
        &outcome.equity_curve,
        config.initial_balance,
    );

    info!(
        "backtest finished: {} closed trades, {} still open, profit {:.2}",
        statistics.number_of_trades,
        outcome.open_positions.len(),
        statistics.total_profit
    );

    Ok(BacktestResult {
        total_profit: statistics.total_profit,
        total_profit_pips: statistics.total_profit_pips,
        win_rate: statistics.win_rate,
        max_drawdown: statistics.max_drawdown,
        sharpe_ratio: statistics.sharpe_ratio,
        average_profit: statistics.average_profit,
        number_of_trades: statistics.number_of_trades,
        trade_log: outcome.trades,
        open_positions: outcome.open_positions,
        equity_curve: outcome.equity_curve,
        statistics,
    })
}
