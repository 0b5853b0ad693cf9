//! Running balance and equity curve.

#[derive(Debug, Clone, PartialEq)]
pub struct EquityTracker {
    pub initial_balance: f64,
    pub balance: f64,
    pub curve: Vec<f64>,
}

impl EquityTracker {
    pub fn new(initial_balance: f64) -> Self {
        EquityTracker {
            initial_balance,
            balance: initial_balance,
            curve: vec![initial_balance],
        }
    }

    /// Applies a realized profit and appends the new balance.
    pub fn on_trade_closed(&mut self, profit_amount: f64) {
        self.balance += profit_amount;
        self.curve.push(self.balance);
    }

    pub fn into_curve(self) -> Vec<f64> {
        self.curve
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_tracker_holds_initial_balance() {
        let tracker = EquityTracker::new(10_000.0);
        assert_eq!(tracker.curve, vec![10_000.0]);
        assert!((tracker.balance - 10_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn on_trade_closed_appends_running_balance() {
        let mut tracker = EquityTracker::new(10_000.0);
        tracker.on_trade_closed(500.0);
        tracker.on_trade_closed(-700.0);
        tracker.on_trade_closed(1_200.0);
        assert_eq!(tracker.curve, vec![10_000.0, 10_500.0, 9_800.0, 11_000.0]);
        assert!((tracker.balance - 11_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn initial_balance_is_not_mutated() {
        let mut tracker = EquityTracker::new(10_000.0);
        tracker.on_trade_closed(-2_000.0);
        assert!((tracker.initial_balance - 10_000.0).abs() < f64::EPSILON);
        assert_eq!(tracker.into_curve(), vec![10_000.0, 8_000.0]);
    }
}
