//! Price bar with precomputed trading signals.

use chrono::NaiveDateTime;
use std::fmt;
use std::str::FromStr;

/// Categorical signal carried by a bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Hold,
    Buy,
    Sell,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Hold => write!(f, "hold"),
            Signal::Buy => write!(f, "buy"),
            Signal::Sell => write!(f, "sell"),
        }
    }
}

/// Categorical values only: `hold`/`none`/`0`, `buy`/`1`, `sell`/`-1`.
impl FromStr for Signal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hold" | "none" | "0" => Ok(Signal::Hold),
            "buy" | "1" => Ok(Signal::Buy),
            "sell" | "-1" => Ok(Signal::Sell),
            other => Err(format!("unknown signal '{other}'")),
        }
    }
}

/// Column a signal cell was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalColumn {
    /// Entry flags: a set flag is a buy.
    Entry,
    /// Exit (reversal) flags: a set flag is a sell.
    Exit,
    /// Single categorical column feeding both slots.
    Shared,
}

impl Signal {
    /// Parses a cell from `column`. Boolean flags resolve against the column;
    /// a shared column has no side to resolve them to and rejects them.
    pub fn parse_in(value: &str, column: SignalColumn) -> Result<Self, String> {
        let value = value.trim().to_lowercase();
        match (value.as_str(), column) {
            ("true" | "false", SignalColumn::Shared) => Err(format!(
                "boolean signal '{value}' needs separate entry_signal and exit_signal columns"
            )),
            ("false", _) => Ok(Signal::Hold),
            ("true", SignalColumn::Entry) => Ok(Signal::Buy),
            ("true" | "1", SignalColumn::Exit) => Ok(Signal::Sell),
            _ => value.parse(),
        }
    }
}

/// One OHLC sample. `None` signals are undefined values (indicator warm-up)
/// and never trigger an entry or exit.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub time: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub tick_volume: Option<i64>,
    pub entry_signal: Option<Signal>,
    pub exit_signal: Option<Signal>,
}

impl Bar {
    pub fn new(time: NaiveDateTime, open: f64, high: f64, low: f64, close: f64) -> Self {
        Bar {
            time,
            open,
            high,
            low,
            close,
            tick_volume: None,
            entry_signal: None,
            exit_signal: None,
        }
    }

    /// Copy of this bar carrying `signal` as both its entry and exit value.
    pub fn with_signal(&self, signal: Option<Signal>) -> Self {
        Bar {
            entry_signal: signal,
            exit_signal: signal,
            ..self.clone()
        }
    }

    pub fn with_signals(&self, entry: Option<Signal>, exit: Option<Signal>) -> Self {
        Bar {
            entry_signal: entry,
            exit_signal: exit,
            ..self.clone()
        }
    }

    /// high - low
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn has_valid_prices(&self) -> bool {
        [self.open, self.high, self.low, self.close]
            .iter()
            .all(|p| p.is_finite() && *p > 0.0)
    }

    pub fn has_any_signal(&self) -> bool {
        self.entry_signal.is_some() || self.exit_signal.is_some()
    }
}
