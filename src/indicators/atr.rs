//! Average True Range (ATR)
//!
//! True Range is the greatest of high - low, |high - previous close| and
//! |low - previous close|. The average uses Wilder's smoothing.

/// True ranges for bars 1..n (the first bar has no previous close)
pub fn true_ranges(high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
    let n = high.len().min(low.len()).min(close.len());

    (1..n)
        .map(|i| {
            let prev_close = close[i - 1];
            (high[i] - low[i])
                .max((high[i] - prev_close).abs())
                .max((low[i] - prev_close).abs())
        })
        .collect()
}

/// ATR at the last bar, or None with fewer than `period + 1` bars
pub fn calculate_atr(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Option<f64> {
    let ranges = true_ranges(high, low, close);
    if period == 0 || ranges.len() < period {
        return None;
    }

    let seed = ranges[..period].iter().sum::<f64>() / period as f64;
    let atr = ranges[period..]
        .iter()
        .fold(seed, |atr, tr| (atr * (period as f64 - 1.0) + tr) / period as f64);

    Some(atr)
}
