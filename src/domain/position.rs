//! Open positions and closed trades.

use chrono::NaiveDateTime;
use std::fmt;

use super::bar::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1 for long, -1 for short.
    pub fn direction(self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => write!(f, "long"),
            Side::Short => write!(f, "short"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    SignalReversal,
    StopLoss,
    TakeProfit,
    EndOfData,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::SignalReversal => write!(f, "signal_reversal"),
            ExitReason::StopLoss => write!(f, "stop_loss"),
            ExitReason::TakeProfit => write!(f, "take_profit"),
            ExitReason::EndOfData => write!(f, "end_of_data"),
        }
    }
}

/// Quote convention for pip-denominated profit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipPricing {
    pub pip_size: f64,
    pub pip_value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub id: usize,
    pub side: Side,
    pub entry_price: f64,
    pub entry_time: NaiveDateTime,
    pub size: f64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub pricing: Option<PipPricing>,
}

impl Position {
    pub fn is_long(&self) -> bool {
        self.side == Side::Long
    }

    /// True when the bar's range reaches the stop level.
    pub fn should_stop_loss(&self, bar: &Bar) -> bool {
        match self.stop_loss {
            None => false,
            Some(sl) if self.is_long() => bar.low <= sl,
            Some(sl) => bar.high >= sl,
        }
    }

    /// True when the bar's range reaches the target level.
    pub fn should_take_profit(&self, bar: &Bar) -> bool {
        match self.take_profit {
            None => false,
            Some(tp) if self.is_long() => bar.high >= tp,
            Some(tp) => bar.low <= tp,
        }
    }

    /// Realized (amount, pips) for an exit at `exit_price`.
    ///
    /// With pip pricing: pips = signed move / pip_size and
    /// amount = pips * pip_value * size. Otherwise amount = signed move * size.
    pub fn realize(&self, exit_price: f64) -> (f64, Option<f64>) {
        let signed_move = (exit_price - self.entry_price) * self.side.direction();
        match self.pricing {
            Some(p) => {
                let pips = signed_move / p.pip_size;
                (pips * p.pip_value * self.size, Some(pips))
            }
            None => (signed_move * self.size, None),
        }
    }

    pub fn close(
        &self,
        exit_price: f64,
        exit_time: NaiveDateTime,
        exit_reason: ExitReason,
    ) -> Trade {
        let (profit_amount, profit_pips) = self.realize(exit_price);
        Trade {
            id: self.id,
            side: self.side,
            entry_price: self.entry_price,
            entry_time: self.entry_time,
            size: self.size,
            stop_loss: self.stop_loss,
            take_profit: self.take_profit,
            exit_price,
            exit_time,
            exit_reason,
            profit_amount,
            profit_pips,
        }
    }
}

/// A closed position.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub id: usize,
    pub side: Side,
    pub entry_price: f64,
    pub entry_time: NaiveDateTime,
    pub size: f64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub exit_price: f64,
    pub exit_time: NaiveDateTime,
    pub exit_reason: ExitReason,
    pub profit_amount: f64,
    pub profit_pips: Option<f64>,
}

impl Trade {
    pub fn is_win(&self) -> bool {
        self.profit_amount > 0.0
    }

    pub fn is_loss(&self) -> bool {
        self.profit_amount < 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn time(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn eurusd() -> PipPricing {
        PipPricing {
            pip_size: 0.0001,
            pip_value: 10.0,
        }
    }

    fn sample_long_bracket() -> Position {
        Position {
            id: 0,
            side: Side::Long,
            entry_price: 1.1000,
            entry_time: time(0),
            size: 0.1,
            stop_loss: Some(1.0950),
            take_profit: Some(1.1100),
            pricing: Some(eurusd()),
        }
    }

    fn sample_short_bracket() -> Position {
        Position {
            id: 1,
            side: Side::Short,
            entry_price: 1.1000,
            entry_time: time(0),
            size: 0.1,
            stop_loss: Some(1.1050),
            take_profit: Some(1.0900),
            pricing: Some(eurusd()),
        }
    }

    fn bar(low: f64, high: f64) -> Bar {
        Bar::new(time(4), (low + high) / 2.0, high, low, (low + high) / 2.0)
    }

    #[test]
    fn side_helpers() {
        assert!(sample_long_bracket().is_long());
        assert!(!sample_short_bracket().is_long());
        assert_eq!(Side::Long.direction(), 1.0);
        assert_eq!(Side::Short.direction(), -1.0);
    }

    #[test]
    fn stop_loss_long_uses_low() {
        let pos = sample_long_bracket();
        assert!(pos.should_stop_loss(&bar(1.0940, 1.1000)));
        assert!(pos.should_stop_loss(&bar(1.0950, 1.1000)));
        assert!(!pos.should_stop_loss(&bar(1.0960, 1.1200)));
    }

    #[test]
    fn stop_loss_short_uses_high() {
        let pos = sample_short_bracket();
        assert!(pos.should_stop_loss(&bar(1.0990, 1.1050)));
        assert!(!pos.should_stop_loss(&bar(1.0800, 1.1040)));
    }

    #[test]
    fn take_profit_long_uses_high() {
        let pos = sample_long_bracket();
        assert!(pos.should_take_profit(&bar(1.1000, 1.1100)));
        assert!(!pos.should_take_profit(&bar(1.1000, 1.1099)));
    }

    #[test]
    fn take_profit_short_uses_low() {
        let pos = sample_short_bracket();
        assert!(pos.should_take_profit(&bar(1.0900, 1.1000)));
        assert!(!pos.should_take_profit(&bar(1.0901, 1.1000)));
    }

    #[test]
    fn no_levels_never_trigger() {
        let mut pos = sample_long_bracket();
        pos.stop_loss = None;
        pos.take_profit = None;
        assert!(!pos.should_stop_loss(&bar(0.0001, 1000.0)));
        assert!(!pos.should_take_profit(&bar(0.0001, 1000.0)));
    }

    #[test]
    fn realize_long_in_pips() {
        let pos = sample_long_bracket();
        let (amount, pips) = pos.realize(1.1100);
        let pips = pips.unwrap();
        assert!((pips - 100.0).abs() < 1e-6);
        // 100 pips * $10 * 0.1 lot
        assert!((amount - 100.0).abs() < 1e-6);
    }

    #[test]
    fn realize_short_in_pips() {
        let pos = sample_short_bracket();
        let (amount, pips) = pos.realize(1.1050);
        assert!((pips.unwrap() - (-50.0)).abs() < 1e-6);
        assert!((amount - (-50.0)).abs() < 1e-6);
    }

    #[test]
    fn realize_notional() {
        let pos = Position {
            id: 2,
            side: Side::Long,
            entry_price: 1.11,
            entry_time: time(0),
            size: 10_000.0 / 1.11,
            stop_loss: None,
            take_profit: None,
            pricing: None,
        };
        let (amount, pips) = pos.realize(1.09);
        assert!(pips.is_none());
        assert!((amount - (-180.18018)).abs() < 1e-4);
    }

    #[test]
    fn close_copies_entry_fields() {
        let pos = sample_long_bracket();
        let trade = pos.close(1.0950, time(8), ExitReason::StopLoss);
        assert_eq!(trade.id, pos.id);
        assert_eq!(trade.side, Side::Long);
        assert_eq!(trade.entry_time, time(0));
        assert_eq!(trade.exit_time, time(8));
        assert_eq!(trade.exit_reason, ExitReason::StopLoss);
        assert!(trade.is_loss());
        assert!(!trade.is_win());
    }
}
