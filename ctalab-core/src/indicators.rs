//! Indicator math — pure functions over price slices.
//!
//! ATR uses Wilder smoothing (alpha = 1/period) seeded with the mean of the
//! first `period` true ranges. All functions return `None` until the input
//! is long enough; callers must treat `None` as "no signal", never as zero.

/// Simple moving average of the last `period` values.
pub fn sma(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let tail = &values[values.len() - period..];
    Some(tail.iter().sum::<f64>() / period as f64)
}

/// True range series from high/low/close slices.
/// TR[0] = high[0] - low[0]; TR[t] uses the previous close thereafter.
pub fn true_range(high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
    let n = high.len().min(low.len()).min(close.len());
    let mut tr = Vec::with_capacity(n);
    for i in 0..n {
        if i == 0 {
            tr.push(high[0] - low[0]);
        } else {
            let pc = close[i - 1];
            tr.push((high[i] - low[i]).max((high[i] - pc).abs()).max((low[i] - pc).abs()));
        }
    }
    tr
}

/// Wilder-smoothed ATR over a true-range series. Returns the latest value.
pub fn atr(tr: &[f64], period: usize) -> Option<f64> {
    if period == 0 || tr.len() < period {
        return None;
    }
    let seed: f64 = tr[..period].iter().sum::<f64>() / period as f64;
    let alpha = 1.0 / period as f64;
    let mut value = seed;
    for &t in &tr[period..] {
        value = alpha * t + (1.0 - alpha) * value;
    }
    Some(value)
}

/// Highest value of the last `period` entries.
pub fn highest(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    values[values.len() - period..]
        .iter()
        .copied()
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
}

/// Lowest value of the last `period` entries.
pub fn lowest(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    values[values.len() - period..]
        .iter()
        .copied()
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.min(v))))
}
