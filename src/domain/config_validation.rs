//! Configuration validation and translation.
//!
//! Validates every config field before data is loaded, then turns the
//! `[backtest]`, `[data]` and `[strategy]` sections into domain values.

use crate::domain::backtest::BacktestConfig;
use crate::domain::engine::{BracketParams, ExitRule};
use crate::domain::error::FxlabError;
use crate::domain::signals::{SignalRule, VolatilitySource};
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const DEFAULT_INITIAL_BALANCE: f64 = 10_000.0;
pub const DEFAULT_RISK_PER_TRADE: f64 = 1.0;
pub const DEFAULT_LOT_SIZE: f64 = 0.1;
pub const DEFAULT_STOP_LOSS_PIPS: f64 = 50.0;
pub const DEFAULT_TAKE_PROFIT_PIPS: f64 = 100.0;
pub const DEFAULT_PIP_SIZE: f64 = 0.0001;
pub const DEFAULT_PIP_VALUE: f64 = 10.0;

/// Which series to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSelection {
    pub symbol: String,
    pub timeframe: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), FxlabError> {
    backtest_config_from(config)?;
    data_selection_from(config)?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), FxlabError> {
    signal_rule_from(config).map(|_| ())
}

/// Builds the run configuration from `[backtest]`.
pub fn backtest_config_from(config: &dyn ConfigPort) -> Result<BacktestConfig, FxlabError> {
    let mode = config
        .get_string("backtest", "mode")
        .unwrap_or_else(|| "reversal".to_string());

    let exit_rule = match mode.trim().to_lowercase().as_str() {
        "reversal" => ExitRule::SignalReversal {
            risk_fraction: config.get_double("backtest", "risk_per_trade", DEFAULT_RISK_PER_TRADE),
        },
        "bracket" => ExitRule::Bracket(BracketParams {
            lot_size: config.get_double("backtest", "lot_size", DEFAULT_LOT_SIZE),
            stop_loss_pips: config.get_double("backtest", "stop_loss_pips", DEFAULT_STOP_LOSS_PIPS),
            take_profit_pips: config.get_double(
                "backtest",
                "take_profit_pips",
                DEFAULT_TAKE_PROFIT_PIPS,
            ),
            pip_size: config.get_double("backtest", "pip_size", DEFAULT_PIP_SIZE),
            pip_value: config.get_double("backtest", "pip_value", DEFAULT_PIP_VALUE),
        }),
        other => {
            return Err(FxlabError::ConfigInvalid {
                section: "backtest".to_string(),
                key: "mode".to_string(),
                reason: format!("unknown mode '{}', expected reversal or bracket", other),
            });
        }
    };

    let backtest = BacktestConfig {
        initial_balance: config.get_double("backtest", "initial_balance", DEFAULT_INITIAL_BALANCE),
        exit_rule,
        force_close_at_end: config.get_bool("backtest", "force_close_at_end", false),
    };
    backtest.validate()?;
    Ok(backtest)
}

/// Builds the data selection from `[data]`. `symbol` and `timeframe` are
/// required; `start` and `end` are optional inclusive dates.
pub fn data_selection_from(config: &dyn ConfigPort) -> Result<DataSelection, FxlabError> {
    let symbol = required(config, "data", "symbol")?;
    let timeframe = required(config, "data", "timeframe")?;
    let start = parse_date(config.get_string("data", "start").as_deref(), "start")?;
    let end = parse_date(config.get_string("data", "end").as_deref(), "end")?;

    if let (Some(s), Some(e)) = (start, end) {
        if s > e {
            return Err(FxlabError::ConfigInvalid {
                section: "data".to_string(),
                key: "start".to_string(),
                reason: "start must not be after end".to_string(),
            });
        }
    }

    Ok(DataSelection {
        symbol: symbol.to_uppercase(),
        timeframe: timeframe.to_uppercase(),
        start,
        end,
    })
}

/// Builds the signal rule from `[strategy]`. Without a `signal` key the
/// bars' own signal columns are used. Only the keys the chosen rule reads
/// are validated.
pub fn signal_rule_from(config: &dyn ConfigPort) -> Result<SignalRule, FxlabError> {
    let name = config
        .get_string("strategy", "signal")
        .unwrap_or_else(|| "precomputed".to_string());

    let rule = match name.trim().to_lowercase().as_str() {
        "ma_crossover" => {
            let (short, long) = averages(config)?;
            SignalRule::MaCrossover { short, long }
        }
        "ma_trend" => {
            let (short, long) = averages(config)?;
            SignalRule::MaTrend { short, long }
        }
        "rsi" => {
            let (period, buy_below, sell_above) = rsi_band(config)?;
            SignalRule::Rsi {
                period,
                buy_below,
                sell_above,
            }
        }
        "rsi_trend" => {
            let (period, buy_below, sell_above) = rsi_band(config)?;
            let (short, long) = averages(config)?;
            SignalRule::RsiTrend {
                period,
                short,
                long,
                buy_below,
                sell_above,
            }
        }
        "fibonacci" => SignalRule::Fibonacci {
            lookback: period(config, "lookback", 100)?,
        },
        "fibonacci_rsi" => {
            let (rsi_period, buy_below, sell_above) = rsi_band(config)?;
            SignalRule::FibonacciRsi {
                lookback: period(config, "lookback", 100)?,
                period: rsi_period,
                buy_below,
                sell_above,
            }
        }
        "low_volatility" => low_volatility(config)?,
        "precomputed" => SignalRule::Precomputed,
        other => {
            return Err(FxlabError::ConfigInvalid {
                section: "strategy".to_string(),
                key: "signal".to_string(),
                reason: format!("unknown signal '{}'", other),
            });
        }
    };

    Ok(rule)
}

/// `short_period` and `long_period`, short strictly below long.
fn averages(config: &dyn ConfigPort) -> Result<(usize, usize), FxlabError> {
    let short = period(config, "short_period", 30)?;
    let long = period(config, "long_period", 90)?;
    if short >= long {
        return Err(FxlabError::invalid(
            "strategy",
            "short_period",
            "short_period must be less than long_period",
        ));
    }
    Ok((short, long))
}

/// `rsi_period`, `rsi_buy` and `rsi_sell`, buy strictly below sell.
fn rsi_band(config: &dyn ConfigPort) -> Result<(usize, f64, f64), FxlabError> {
    let rsi_period = period(config, "rsi_period", 14)?;
    let buy_below = config.get_double("strategy", "rsi_buy", 30.0);
    let sell_above = config.get_double("strategy", "rsi_sell", 70.0);
    if buy_below >= sell_above {
        return Err(FxlabError::invalid(
            "strategy",
            "rsi_buy",
            "rsi_buy must be below rsi_sell",
        ));
    }
    Ok((rsi_period, buy_below, sell_above))
}

fn low_volatility(config: &dyn ConfigPort) -> Result<SignalRule, FxlabError> {
    let source = match config.get_string("strategy", "volatility_source") {
        None => VolatilitySource::Stddev,
        Some(s) => match s.trim().to_lowercase().as_str() {
            "stddev" => VolatilitySource::Stddev,
            "atr" => VolatilitySource::Atr,
            other => {
                return Err(FxlabError::invalid(
                    "strategy",
                    "volatility_source",
                    format!("unknown volatility source '{}', expected stddev or atr", other),
                ));
            }
        },
    };

    let window = period(config, "volatility_window", 20)?;
    if source == VolatilitySource::Stddev && window < 2 {
        return Err(FxlabError::invalid(
            "strategy",
            "volatility_window",
            "volatility_window must be at least 2 for stddev",
        ));
    }
    let threshold = config.get_double("strategy", "volatility_threshold", 0.0005);
    if threshold <= 0.0 {
        return Err(FxlabError::invalid(
            "strategy",
            "volatility_threshold",
            "volatility_threshold must be positive",
        ));
    }
    Ok(SignalRule::LowVolatility {
        source,
        window,
        threshold,
    })
}

fn required(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, FxlabError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(FxlabError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

fn period(config: &dyn ConfigPort, key: &str, default: i64) -> Result<usize, FxlabError> {
    let value = config.get_int("strategy", key, default);
    if value < 1 {
        return Err(FxlabError::invalid(
            "strategy",
            key,
            format!("{} must be at least 1", key),
        ));
    }
    Ok(value as usize)
}

fn parse_date(value: Option<&str>, field: &str) -> Result<Option<NaiveDate>, FxlabError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| FxlabError::ConfigInvalid {
                section: "data".to_string(),
                key: field.to_string(),
                reason: format!("invalid {} format, expected YYYY-MM-DD", field),
            }),
    }
}
