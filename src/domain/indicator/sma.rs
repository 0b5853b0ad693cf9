//! Simple moving average of closing prices.
//!
//! SMA(n)[i] = mean(C[i-n+1..=i]). Warmup: first (n-1) bars are invalid.

use crate::domain::bar::Bar;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};

pub fn calculate_sma(bars: &[Bar], period: usize) -> IndicatorSeries {
    let mut values = Vec::with_capacity(bars.len());
    let mut window_sum = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        window_sum += bar.close;
        if period > 0 && i >= period {
            window_sum -= bars[i - period].close;
        }

        if period == 0 || i + 1 < period {
            values.push(IndicatorPoint::invalid(bar.time));
        } else {
            values.push(IndicatorPoint::simple(bar.time, window_sum / period as f64));
        }
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Sma(period),
        values,
    }
}
