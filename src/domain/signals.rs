//! Signal generation.
//!
//! A [`SignalRule`] turns indicator values into a categorical signal per bar.
//! [`apply_signals`] writes that signal into both the entry and the exit
//! column of a fresh copy of the bars. Bars where a required indicator is
//! still warming up get a null signal.

use std::fmt;

use super::bar::{Bar, Signal};
use super::indicator::{IndicatorSeries, IndicatorType, compute};

/// Volatility measure behind [`SignalRule::LowVolatility`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolatilitySource {
    /// Sample standard deviation of closes.
    Stddev,
    /// Mean bar range (`high - low`).
    Atr,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SignalRule {
    /// Buy on the bar the short average crosses above the long one, sell on
    /// the mirror cross.
    MaCrossover { short: usize, long: usize },
    /// Buy while short > long, sell while short < long.
    MaTrend { short: usize, long: usize },
    Rsi {
        period: usize,
        buy_below: f64,
        sell_above: f64,
    },
    /// RSI threshold confirmed by the moving-average trend.
    RsiTrend {
        period: usize,
        short: usize,
        long: usize,
        buy_below: f64,
        sell_above: f64,
    },
    /// Buy while the close sits between the 61.8% and 76.4% levels, sell
    /// while it sits between 23.6% and 38.2%.
    Fibonacci { lookback: usize },
    FibonacciRsi {
        lookback: usize,
        period: usize,
        buy_below: f64,
        sell_above: f64,
    },
    /// Buy while rolling volatility is below the threshold, hold otherwise.
    LowVolatility {
        source: VolatilitySource,
        window: usize,
        threshold: f64,
    },
    /// Keep the signals already on the bars.
    Precomputed,
}

impl SignalRule {
    /// Indicators the rule reads, in evaluation order.
    pub fn indicators(&self) -> Vec<IndicatorType> {
        match *self {
            SignalRule::MaCrossover { short, long } | SignalRule::MaTrend { short, long } => {
                vec![IndicatorType::Sma(short), IndicatorType::Sma(long)]
            }
            SignalRule::Rsi { period, .. } => vec![IndicatorType::Rsi(period)],
            SignalRule::RsiTrend {
                period,
                short,
                long,
                ..
            } => vec![
                IndicatorType::Rsi(period),
                IndicatorType::Sma(short),
                IndicatorType::Sma(long),
            ],
            SignalRule::Fibonacci { lookback } => vec![IndicatorType::Fibonacci(lookback)],
            SignalRule::FibonacciRsi {
                lookback, period, ..
            } => vec![IndicatorType::Fibonacci(lookback), IndicatorType::Rsi(period)],
            SignalRule::LowVolatility { source, window, .. } => match source {
                VolatilitySource::Stddev => vec![IndicatorType::Stddev(window)],
                VolatilitySource::Atr => vec![IndicatorType::Atr(window)],
            },
            SignalRule::Precomputed => Vec::new(),
        }
    }
}

impl fmt::Display for SignalRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalRule::MaCrossover { short, long } => write!(f, "ma_crossover({short}/{long})"),
            SignalRule::MaTrend { short, long } => write!(f, "ma_trend({short}/{long})"),
            SignalRule::Rsi {
                period,
                buy_below,
                sell_above,
            } => write!(f, "rsi({period}, <{buy_below}, >{sell_above})"),
            SignalRule::RsiTrend {
                period,
                short,
                long,
                ..
            } => write!(f, "rsi_trend({period}, {short}/{long})"),
            SignalRule::Fibonacci { lookback } => write!(f, "fibonacci({lookback})"),
            SignalRule::FibonacciRsi {
                lookback, period, ..
            } => write!(f, "fibonacci_rsi({lookback}, {period})"),
            SignalRule::LowVolatility {
                source,
                window,
                threshold,
            } => {
                let measure = match source {
                    VolatilitySource::Stddev => "stddev",
                    VolatilitySource::Atr => "atr",
                };
                write!(f, "low_volatility({measure} {window}, <{threshold})")
            }
            SignalRule::Precomputed => write!(f, "precomputed"),
        }
    }
}

fn threshold(value: f64, buy_below: f64, sell_above: f64) -> Signal {
    if value < buy_below {
        Signal::Buy
    } else if value > sell_above {
        Signal::Sell
    } else {
        Signal::Hold
    }
}

fn trend(short: f64, long: f64) -> Signal {
    if short > long {
        Signal::Buy
    } else if short < long {
        Signal::Sell
    } else {
        Signal::Hold
    }
}

fn classify(
    rule: &SignalRule,
    bars: &[Bar],
    series: &[IndicatorSeries],
    i: usize,
) -> Option<Signal> {
    match *rule {
        SignalRule::MaCrossover { .. } => {
            if i == 0 {
                return None;
            }
            let (s, l) = (series[0].simple_at(i)?, series[1].simple_at(i)?);
            let (ps, pl) = (series[0].simple_at(i - 1)?, series[1].simple_at(i - 1)?);
            Some(if s > l && ps <= pl {
                Signal::Buy
            } else if s < l && ps >= pl {
                Signal::Sell
            } else {
                Signal::Hold
            })
        }
        SignalRule::MaTrend { .. } => {
            Some(trend(series[0].simple_at(i)?, series[1].simple_at(i)?))
        }
        SignalRule::Rsi {
            buy_below,
            sell_above,
            ..
        } => Some(threshold(series[0].simple_at(i)?, buy_below, sell_above)),
        SignalRule::RsiTrend {
            buy_below,
            sell_above,
            ..
        } => {
            let rsi = series[0].simple_at(i)?;
            let ma = trend(series[1].simple_at(i)?, series[2].simple_at(i)?);
            Some(match (threshold(rsi, buy_below, sell_above), ma) {
                (Signal::Buy, Signal::Buy) => Signal::Buy,
                (Signal::Sell, Signal::Sell) => Signal::Sell,
                _ => Signal::Hold,
            })
        }
        SignalRule::Fibonacci { .. } => {
            let levels = series[0].fibonacci_at(i)?;
            let close = bars[i].close;
            Some(if close > levels.level_618 && close < levels.level_764 {
                Signal::Buy
            } else if close > levels.level_236 && close < levels.level_382 {
                Signal::Sell
            } else {
                Signal::Hold
            })
        }
        SignalRule::FibonacciRsi {
            buy_below,
            sell_above,
            ..
        } => {
            let levels = series[0].fibonacci_at(i)?;
            let rsi = series[1].simple_at(i)?;
            let close = bars[i].close;
            Some(if rsi < buy_below && close < levels.level_618 {
                Signal::Buy
            } else if rsi > sell_above && close > levels.level_382 {
                Signal::Sell
            } else {
                Signal::Hold
            })
        }
        SignalRule::LowVolatility { threshold, .. } => {
            let volatility = series[0].simple_at(i)?;
            Some(if volatility < threshold {
                Signal::Buy
            } else {
                Signal::Hold
            })
        }
        SignalRule::Precomputed => bars[i].entry_signal,
    }
}

/// Returns a copy of `bars` carrying the signals produced by `rule`.
///
/// `Precomputed` returns the bars unchanged.
pub fn apply_signals(bars: &[Bar], rule: &SignalRule) -> Vec<Bar> {
    if *rule == SignalRule::Precomputed {
        return bars.to_vec();
    }

    let series: Vec<IndicatorSeries> = rule
        .indicators()
        .into_iter()
        .map(|indicator| compute(bars, indicator))
        .collect();

    bars.iter()
        .enumerate()
        .map(|(i, bar)| bar.with_signal(classify(rule, bars, &series, i)))
        .collect()
}
