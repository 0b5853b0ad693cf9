//! Technical indicators feeding the signal rules.
//!
//! Every indicator is a pure transform of a bar slice into an
//! [`IndicatorSeries`] with one point per bar. Points inside the warm-up
//! window are marked invalid.

pub mod atr;
pub mod fibonacci;
pub mod rsi;
pub mod sma;
pub mod stddev;

use chrono::NaiveDateTime;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FibonacciLevels {
    pub level_236: f64,
    pub level_382: f64,
    pub level_500: f64,
    pub level_618: f64,
    pub level_764: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndicatorValue {
    Simple(f64),
    Fibonacci(FibonacciLevels),
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub time: NaiveDateTime,
    pub valid: bool,
    pub value: IndicatorValue,
}

impl IndicatorPoint {
    pub fn invalid(time: NaiveDateTime) -> Self {
        IndicatorPoint {
            time,
            valid: false,
            value: IndicatorValue::Simple(0.0),
        }
    }

    pub fn simple(time: NaiveDateTime, value: f64) -> Self {
        IndicatorPoint {
            time,
            valid: true,
            value: IndicatorValue::Simple(value),
        }
    }

    /// The scalar value when valid.
    pub fn as_simple(&self) -> Option<f64> {
        match (self.valid, &self.value) {
            (true, IndicatorValue::Simple(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn as_fibonacci(&self) -> Option<&FibonacciLevels> {
        match (self.valid, &self.value) {
            (true, IndicatorValue::Fibonacci(levels)) => Some(levels),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Rsi(usize),
    Stddev(usize),
    Atr(usize),
    Fibonacci(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    pub fn simple_at(&self, index: usize) -> Option<f64> {
        self.values.get(index).and_then(IndicatorPoint::as_simple)
    }

    pub fn fibonacci_at(&self, index: usize) -> Option<&FibonacciLevels> {
        self.values.get(index).and_then(IndicatorPoint::as_fibonacci)
    }

    pub fn valid_count(&self) -> usize {
        self.values.iter().filter(|p| p.valid).count()
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Stddev(period) => write!(f, "STDDEV({})", period),
            IndicatorType::Atr(period) => write!(f, "ATR({})", period),
            IndicatorType::Fibonacci(lookback) => write!(f, "FIB({})", lookback),
        }
    }
}

/// Computes the series for `indicator` over `bars`.
pub fn compute(bars: &[crate::domain::bar::Bar], indicator: IndicatorType) -> IndicatorSeries {
    match indicator {
        IndicatorType::Sma(period) => sma::calculate_sma(bars, period),
        IndicatorType::Rsi(period) => rsi::calculate_rsi(bars, period),
        IndicatorType::Stddev(period) => stddev::calculate_stddev(bars, period),
        IndicatorType::Atr(period) => atr::calculate_atr(bars, period),
        IndicatorType::Fibonacci(lookback) => fibonacci::calculate_fibonacci(bars, lookback),
    }
}
