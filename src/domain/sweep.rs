//! Stop-loss / take-profit grid search over bracket backtests.

use log::info;
use rayon::prelude::*;

use super::backtest::{BacktestConfig, BacktestResult, run};
use super::bar::Bar;
use super::engine::ExitRule;
use super::error::FxlabError;

#[derive(Debug, Clone, PartialEq)]
pub struct SweepPoint {
    pub stop_loss_pips: f64,
    pub take_profit_pips: f64,
    pub result: BacktestResult,
}

/// Runs one bracket backtest per (stop loss, take profit) pair.
///
/// Results come back in grid order: stop losses outer, take profits inner.
/// The bars are validated once per run, so a malformed series fails the
/// whole sweep.
pub fn sweep_brackets(
    bars: &[Bar],
    config: &BacktestConfig,
    stop_losses: &[f64],
    take_profits: &[f64],
) -> Result<Vec<SweepPoint>, FxlabError> {
    let ExitRule::Bracket(base) = config.exit_rule else {
        return Err(FxlabError::invalid(
            "backtest",
            "mode",
            "a sweep needs bracket mode",
        ));
    };

    let grid: Vec<(f64, f64)> = stop_losses
        .iter()
        .flat_map(|&sl| take_profits.iter().map(move |&tp| (sl, tp)))
        .collect();

    info!(
        "sweeping {} bracket combinations over {} bars",
        grid.len(),
        bars.len()
    );

    grid.par_iter()
        .map(|&(stop_loss_pips, take_profit_pips)| {
            let mut params = base;
            params.stop_loss_pips = stop_loss_pips;
            params.take_profit_pips = take_profit_pips;
            let run_config = BacktestConfig {
                exit_rule: ExitRule::Bracket(params),
                ..config.clone()
            };
            run(bars, &run_config).map(|result| SweepPoint {
                stop_loss_pips,
                take_profit_pips,
                result,
            })
        })
        .collect()
}

/// The point with the highest total profit. Ties keep the earliest.
pub fn best_by_profit(points: &[SweepPoint]) -> Option<&SweepPoint> {
    points.iter().fold(None, |best, point| match best {
        Some(b) if b.result.total_profit >= point.result.total_profit => Some(b),
        _ => Some(point),
    })
}
