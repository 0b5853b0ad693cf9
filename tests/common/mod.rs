#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use fxlab::domain::backtest::BacktestConfig;
pub use fxlab::domain::bar::{Bar, Signal};
use fxlab::domain::engine::{BracketParams, ExitRule};
use fxlab::domain::error::FxlabError;
use fxlab::ports::data_port::DataPort;
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        _timeframe: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<Bar>, FxlabError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(FxlabError::DataSource {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(symbol)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|b| start.is_none_or(|s| b.time.date() >= s))
            .filter(|b| end.is_none_or(|e| b.time.date() <= e))
            .collect())
    }

    fn list_symbols(&self, _timeframe: &str) -> Result<Vec<String>, FxlabError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

/// Hourly timestamps from 2024-01-01 00:00.
pub fn hour(i: usize) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + chrono::Duration::hours(i as i64)
}

/// Flat bar (open = high = low = close) with the signal in both slots.
pub fn make_bar(i: usize, close: f64, signal: Option<Signal>) -> Bar {
    Bar::new(hour(i), close, close, close, close).with_signal(signal)
}

pub fn make_ohlc_bar(i: usize, open: f64, high: f64, low: f64, close: f64) -> Bar {
    Bar::new(hour(i), open, high, low, close).with_signal(Some(Signal::Hold))
}

/// Deterministic zig-zag series with a buy every `period` bars and a sell
/// half a period later.
pub fn generate_bars(count: usize, period: usize) -> Vec<Bar> {
    (0..count)
        .map(|i| {
            let phase = (i % period) as f64 / period as f64;
            let close = 1.1000 + 0.0100 * (phase * std::f64::consts::TAU).sin();
            let signal = if i % period == 0 {
                Signal::Buy
            } else if i % period == period / 2 {
                Signal::Sell
            } else {
                Signal::Hold
            };
            Bar::new(hour(i), close, close + 0.0020, close - 0.0020, close)
                .with_signal(Some(signal))
        })
        .collect()
}

pub fn reversal_config() -> BacktestConfig {
    BacktestConfig {
        initial_balance: 10_000.0,
        exit_rule: ExitRule::SignalReversal { risk_fraction: 1.0 },
        force_close_at_end: false,
    }
}

pub fn bracket_params() -> BracketParams {
    BracketParams {
        lot_size: 0.1,
        stop_loss_pips: 50.0,
        take_profit_pips: 100.0,
        pip_size: 0.0001,
        pip_value: 10.0,
    }
}

pub fn bracket_config() -> BacktestConfig {
    BacktestConfig {
        initial_balance: 10_000.0,
        exit_rule: ExitRule::Bracket(bracket_params()),
        force_close_at_end: false,
    }
}
