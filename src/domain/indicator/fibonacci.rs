//! Fibonacci retracement levels over a rolling close range.
//!
//! With H = max(C) and L = min(C) over the last `lookback` closes, each level
//! sits at L + (H - L) * ratio for ratios 0.236, 0.382, 0.5, 0.618 and 0.764.
//! Warmup: first (lookback-1) bars are invalid.

use crate::domain::bar::Bar;
use crate::domain::indicator::{
    FibonacciLevels, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue,
};

pub fn calculate_fibonacci(bars: &[Bar], lookback: usize) -> IndicatorSeries {
    let mut values = Vec::with_capacity(bars.len());

    for (i, bar) in bars.iter().enumerate() {
        if lookback == 0 || i + 1 < lookback {
            values.push(IndicatorPoint::invalid(bar.time));
            continue;
        }

        let window = &bars[i + 1 - lookback..=i];
        let (high, low) = window
            .iter()
            .fold((f64::MIN, f64::MAX), |(h, l), b| (h.max(b.close), l.min(b.close)));
        let span = high - low;
        let level = |ratio: f64| low + span * ratio;

        values.push(IndicatorPoint {
            time: bar.time,
            valid: true,
            value: IndicatorValue::Fibonacci(FibonacciLevels {
                level_236: level(0.236),
                level_382: level(0.382),
                level_500: level(0.5),
                level_618: level(0.618),
                level_764: level(0.764),
            }),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Fibonacci(lookback),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn make_bars(prices: &[f64]) -> Vec<Bar> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                let time = NaiveDate::from_ymd_opt(2024, 1, (i + 1) as u32)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap();
                Bar::new(time, close, close, close, close)
            })
            .collect()
    }

    #[test]
    fn fibonacci_levels_span_range() {
        let series = calculate_fibonacci(&make_bars(&[1.0, 2.0, 1.5]), 3);
        let levels = series.fibonacci_at(2).unwrap();
        assert_relative_eq!(levels.level_236, 1.236, epsilon = 1e-12);
        assert_relative_eq!(levels.level_382, 1.382, epsilon = 1e-12);
        assert_relative_eq!(levels.level_500, 1.5, epsilon = 1e-12);
        assert_relative_eq!(levels.level_618, 1.618, epsilon = 1e-12);
        assert_relative_eq!(levels.level_764, 1.764, epsilon = 1e-12);
    }

    #[test]
    fn fibonacci_levels_ascend() {
        let series = calculate_fibonacci(&make_bars(&[1.0, 3.0, 2.0, 4.0]), 3);
        let levels = series.fibonacci_at(3).unwrap();
        assert!(levels.level_236 < levels.level_382);
        assert!(levels.level_382 < levels.level_500);
        assert!(levels.level_500 < levels.level_618);
        assert!(levels.level_618 < levels.level_764);
    }

    #[test]
    fn fibonacci_warmup() {
        let series = calculate_fibonacci(&make_bars(&[1.0, 2.0, 3.0]), 3);
        assert!(series.fibonacci_at(1).is_none());
        assert!(series.fibonacci_at(2).is_some());
        assert_eq!(series.simple_at(2), None);
    }
}
