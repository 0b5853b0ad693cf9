//! Rolling volatility of closing prices.
//!
//! Sample standard deviation (n - 1 denominator) over n closes.
//! STDDEV(n)[i] = sqrt(sum((C[i-j] - SMA(n)[i])^2 for j in 0..n-1) / (n - 1))
//! Warmup: first (n-1) bars are invalid. Periods below 2 are never valid.

use crate::domain::bar::Bar;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};

pub fn calculate_stddev(bars: &[Bar], period: usize) -> IndicatorSeries {
    let mut values = Vec::with_capacity(bars.len());
    let warmup = period.saturating_sub(1);

    for (i, bar) in bars.iter().enumerate() {
        if period < 2 || i < warmup {
            values.push(IndicatorPoint::invalid(bar.time));
            continue;
        }

        let window = &bars[i + 1 - period..=i];
        let mean: f64 = window.iter().map(|b| b.close).sum::<f64>() / period as f64;
        let variance: f64 = window
            .iter()
            .map(|b| {
                let diff = b.close - mean;
                diff * diff
            })
            .sum::<f64>()
            / (period - 1) as f64;

        values.push(IndicatorPoint::simple(bar.time, variance.sqrt()));
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Stddev(period),
        values,
    }
}
