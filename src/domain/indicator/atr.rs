//! Average bar range.
//!
//! ATR(n)[i] = mean(H - L over the last n bars). Close-to-close gaps are not
//! folded in, so this is the plain high-low range average.
//! Warmup: first (n-1) bars are invalid.

use crate::domain::bar::Bar;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};

pub fn calculate_atr(bars: &[Bar], period: usize) -> IndicatorSeries {
    let mut values = Vec::with_capacity(bars.len());
    let mut range_sum = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        range_sum += bar.range();
        if period > 0 && i >= period {
            range_sum -= bars[i - period].range();
        }

        if period == 0 || i + 1 < period {
            values.push(IndicatorPoint::invalid(bar.time));
        } else {
            values.push(IndicatorPoint::simple(bar.time, range_sum / period as f64));
        }
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Atr(period),
        values,
    }
}
