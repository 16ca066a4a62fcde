/// Relative Strength Index with Wilder's smoothing
///
/// Seeds the average gain/loss with a simple mean over the first `period`
/// changes, then smooths every later change. Returns the value at the last bar.
///
/// - RSI > 70: overbought
/// - RSI < 30: oversold
pub fn calculate_rsi(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period + 1 {
        return None;
    }

    let changes: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();

    let (seed, rest) = changes.split_at(period);
    let mut avg_gain = seed.iter().filter(|c| **c > 0.0).sum::<f64>() / period as f64;
    let mut avg_loss = seed.iter().filter(|c| **c < 0.0).map(|c| -c).sum::<f64>() / period as f64;

    let smoothing = (period - 1) as f64;
    for change in rest {
        avg_gain = (avg_gain * smoothing + change.max(0.0)) / period as f64;
        avg_loss = (avg_loss * smoothing + (-change).max(0.0)) / period as f64;
    }

    if avg_loss == 0.0 {
        // Flat series has no direction
        return Some(if avg_gain == 0.0 { 50.0 } else { 100.0 });
    }

    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rsi_in_range() {
        let closes = vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08, 45.89, 46.03,
            45.61, 46.28, 46.28, 46.00, 46.03, 46.41, 46.22, 45.64,
        ];

        let rsi = calculate_rsi(&closes, 14).unwrap();
        assert!(rsi > 50.0 && rsi < 80.0, "rsi = {}", rsi);
    }

    #[test]
    fn test_rsi_insufficient_data() {
        assert!(calculate_rsi(&[100.0, 102.0, 101.0], 14).is_none());
    }

    #[test]
    fn test_rsi_extremes() {
        let rising: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let falling: Vec<f64> = (0..20).map(|i| 100.0 - i as f64).collect();

        assert_eq!(calculate_rsi(&rising, 14), Some(100.0));
        assert_eq!(calculate_rsi(&falling, 14), Some(0.0));
        assert_eq!(calculate_rsi(&[100.0; 20], 14), Some(50.0));
    }
}
