//! Technical indicator engine
//!
//! Pure functions over aligned price/volume columns. Every function returns
//! a vector of the same length as its input; positions where the rolling
//! window cannot be filled yet are `None` (RSI is the exception and is
//! filled with a neutral 50).
//!
//! Non-finite intermediate values are reported as `None`. Zero volume is
//! a real session state and maps to defined values instead (see
//! `volume_change` and the volume ratio), so it never drops a row.

use crate::domain::market::PriceSeries;
use statrs::statistics::{Data, Distribution};
use ta::Next;
use ta::indicators::{MovingAverageConvergenceDivergence, SimpleMovingAverage};

pub const RSI_PERIOD: usize = 14;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;
pub const BOLLINGER_PERIOD: usize = 20;
pub const BOLLINGER_STD_DEV: f64 = 2.0;
pub const VOLUME_MA_PERIOD: usize = 20;

/// Longest rolling window used by the feature set (MA 50).
pub const LONGEST_WINDOW: usize = 50;

/// Leading rows that cannot carry every indicator.
pub const WARMUP_ROWS: usize = LONGEST_WINDOW - 1;

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// Simple moving average, undefined until `period` observations exist.
pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let Ok(mut indicator) = SimpleMovingAverage::new(period) else {
        return vec![None; values.len()];
    };

    values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let avg = indicator.next(v);
            if i + 1 >= period { finite(avg) } else { None }
        })
        .collect()
}

/// Fractional change over `periods` steps: `x[i] / x[i - periods] - 1`.
pub fn pct_change(values: &[f64], periods: usize) -> Vec<Option<f64>> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            if periods == 0 || i < periods {
                return None;
            }
            finite(v / values[i - periods] - 1.0)
        })
        .collect()
}

/// Day-over-day volume change. A session after a zero-volume bar (halt,
/// missing print) counts as unchanged so the row stays in the table.
pub fn volume_change(volumes: &[f64]) -> Vec<Option<f64>> {
    volumes
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let prev = *volumes.get(i.checked_sub(1)?)?;
            if prev == 0.0 {
                Some(0.0)
            } else {
                finite(v / prev - 1.0)
            }
        })
        .collect()
}

/// Rolling sample standard deviation (n - 1 denominator). A window that
/// contains any undefined value is itself undefined.
pub fn rolling_std(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if window < 2 || i + 1 < window {
                return None;
            }
            let slice: Option<Vec<f64>> = values[i + 1 - window..=i].iter().copied().collect();
            Data::new(slice?).std_dev().and_then(finite)
        })
        .collect()
}

/// Relative Strength Index over rolling-mean gains and losses.
///
/// Means start from a single observation, so the first `period` values are
/// approximations. A window with losses of zero yields 100 when it has
/// gains and the neutral 50 when it has neither.
pub fn rsi(closes: &[f64], period: usize) -> Vec<f64> {
    let period = period.max(1);
    let mut gains = Vec::with_capacity(closes.len());
    let mut losses = Vec::with_capacity(closes.len());

    for i in 0..closes.len() {
        let delta = if i == 0 { 0.0 } else { closes[i] - closes[i - 1] };
        gains.push(if delta > 0.0 { delta } else { 0.0 });
        losses.push(if delta < 0.0 { -delta } else { 0.0 });
    }

    (0..closes.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(period);
            let n = (i + 1 - start) as f64;
            let avg_gain = gains[start..=i].iter().sum::<f64>() / n;
            let avg_loss = losses[start..=i].iter().sum::<f64>() / n;

            if avg_loss == 0.0 {
                if avg_gain == 0.0 { 50.0 } else { 100.0 }
            } else {
                let rs = avg_gain / avg_loss;
                let value = 100.0 - (100.0 / (1.0 + rs));
                if value.is_finite() { value } else { 50.0 }
            }
        })
        .collect()
}

/// MACD line: EMA(12) - EMA(26), both seeded with the first observation.
pub fn macd(closes: &[f64]) -> Vec<f64> {
    let Ok(mut indicator) =
        MovingAverageConvergenceDivergence::new(MACD_FAST, MACD_SLOW, MACD_SIGNAL)
    else {
        return vec![0.0; closes.len()];
    };

    closes.iter().map(|&c| indicator.next(c).macd).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerBands {
    pub upper: Vec<Option<f64>>,
    pub middle: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
}

/// Simple moving average ± `k` sample standard deviations.
pub fn bollinger_bands(closes: &[f64], period: usize, k: f64) -> BollingerBands {
    let middle = sma(closes, period);
    let as_options: Vec<Option<f64>> = closes.iter().copied().map(Some).collect();
    let std = rolling_std(&as_options, period);

    let band = |sign: f64| -> Vec<Option<f64>> {
        middle
            .iter()
            .zip(std.iter())
            .map(|(m, s)| Some(m.as_ref()? + sign * k * s.as_ref()?))
            .collect()
    };

    BollingerBands {
        upper: band(1.0),
        lower: band(-1.0),
        middle,
    }
}

/// Every indicator the feature builder consumes, aligned with the input bars.
#[derive(Debug, Clone)]
pub struct TechnicalIndicators {
    pub ma_5: Vec<Option<f64>>,
    pub ma_10: Vec<Option<f64>>,
    pub ma_20: Vec<Option<f64>>,
    pub ma_50: Vec<Option<f64>>,
    pub daily_return: Vec<Option<f64>>,
    pub weekly_return: Vec<Option<f64>>,
    pub volatility_5: Vec<Option<f64>>,
    pub volatility_20: Vec<Option<f64>>,
    pub rsi: Vec<f64>,
    pub macd: Vec<f64>,
    pub volume_change: Vec<Option<f64>>,
    pub volume_ma: Vec<Option<f64>>,
    pub volume_ratio: Vec<Option<f64>>,
    pub price_vs_ma20: Vec<Option<f64>>,
    pub high_low_range: Vec<Option<f64>>,
}

impl TechnicalIndicators {
    pub fn compute(series: &PriceSeries) -> Self {
        let closes = series.closes();
        let highs = series.highs();
        let lows = series.lows();
        let volumes = series.volumes();

        let ma_20 = sma(&closes, 20);
        let daily_return = pct_change(&closes, 1);
        let volume_ma = sma(&volumes, VOLUME_MA_PERIOD);

        let volume_ratio = volumes
            .iter()
            .zip(volume_ma.iter())
            .map(|(v, ma)| match ma.as_ref()? {
                // A full window of zero volume: today matches its average
                ma if *ma == 0.0 => Some(1.0),
                ma => finite(v / ma),
            })
            .collect();

        let price_vs_ma20 = closes
            .iter()
            .zip(ma_20.iter())
            .map(|(c, ma)| {
                let ma = ma.as_ref()?;
                finite((c - ma) / ma)
            })
            .collect();

        let high_low_range = highs
            .iter()
            .zip(lows.iter())
            .zip(closes.iter())
            .map(|((h, l), c)| finite((h - l) / c))
            .collect();

        Self {
            ma_5: sma(&closes, 5),
            ma_10: sma(&closes, 10),
            ma_50: sma(&closes, LONGEST_WINDOW),
            weekly_return: pct_change(&closes, 5),
            volatility_5: rolling_std(&daily_return, 5),
            volatility_20: rolling_std(&daily_return, 20),
            rsi: rsi(&closes, RSI_PERIOD),
            macd: macd(&closes),
            volume_change: volume_change(&volumes),
            volume_ratio,
            price_vs_ma20,
            high_low_range,
            volume_ma,
            daily_return,
            ma_20,
        }
    }

    pub fn len(&self) -> usize {
        self.rsi.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rsi.is_empty()
    }
}
