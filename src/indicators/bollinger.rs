use crate::indicators::{calculate_sma, calculate_std_dev};

/// Bollinger Bands at the last bar
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Middle band is the SMA; outer bands sit `num_std` standard deviations away
pub fn calculate_bollinger(closes: &[f64], period: usize, num_std: f64) -> Option<BollingerBands> {
    let middle = calculate_sma(closes, period)?;
    let std_dev = calculate_std_dev(closes, period)?;

    Some(BollingerBands {
        upper: middle + num_std * std_dev,
        middle,
        lower: middle - num_std * std_dev,
    })
}
