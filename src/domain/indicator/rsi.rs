//! RSI (Relative Strength Index).
//!
//! Average gain and loss are simple rolling means over the last n
//! close-to-close changes (no Wilder smoothing):
//!
//! RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//!
//! avg_loss == 0 with gains gives 100. A window with neither gains nor losses
//! has no defined RSI and is marked invalid.
//!
//! Warmup: first n bars are invalid (need n price changes).

use crate::domain::bar::Bar;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};

pub fn calculate_rsi(bars: &[Bar], period: usize) -> IndicatorSeries {
    let mut values = Vec::with_capacity(bars.len());

    for (i, bar) in bars.iter().enumerate() {
        if period == 0 || i < period {
            values.push(IndicatorPoint::invalid(bar.time));
            continue;
        }

        let (gain_sum, loss_sum) = bars[i - period..=i]
            .windows(2)
            .map(|w| w[1].close - w[0].close)
            .fold((0.0, 0.0), |(g, l), change| {
                if change > 0.0 {
                    (g + change, l)
                } else {
                    (g, l - change)
                }
            });

        let avg_gain = gain_sum / period as f64;
        let avg_loss = loss_sum / period as f64;

        let point = if avg_loss == 0.0 && avg_gain == 0.0 {
            IndicatorPoint::invalid(bar.time)
        } else if avg_loss == 0.0 {
            IndicatorPoint::simple(bar.time, 100.0)
        } else {
            IndicatorPoint::simple(bar.time, 100.0 - (100.0 / (1.0 + avg_gain / avg_loss)))
        };
        values.push(point);
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values,
    }
}
