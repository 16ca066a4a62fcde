/// Simple Moving Average over the last `period` values
pub fn calculate_sma(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }

    let window = &values[values.len() - period..];
    Some(window.iter().sum::<f64>() / period as f64)
}

/// Population standard deviation over the last `period` values
pub fn calculate_std_dev(values: &[f64], period: usize) -> Option<f64> {
    let mean = calculate_sma(values, period)?;
    let window = &values[values.len() - period..];

    let variance = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / period as f64;
    Some(variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sma_uses_trailing_window() {
        let values = vec![1.0, 100.0, 102.0, 104.0, 106.0, 108.0];
        assert_eq!(calculate_sma(&values, 5), Some(104.0));
    }

    #[test]
    fn test_sma_insufficient_data() {
        assert!(calculate_sma(&[100.0, 102.0], 5).is_none());
        assert!(calculate_sma(&[100.0], 0).is_none());
    }

    #[test]
    fn test_std_dev() {
        let values = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(calculate_std_dev(&values, 8), Some(2.0));
        assert_eq!(calculate_std_dev(&[5.0; 10], 10), Some(0.0));
    }
}
