use crate::error::BotError;
use crate::indicators::{calculate_bollinger, calculate_rsi, BollingerBands};
use crate::models::{Frame, IndicatorSnapshot, TrendSignal};
use crate::strategy::StrategyEngine;
use crate::Result;

/// RSI + Bollinger Bands mean reversion
///
/// Calls the direction of the expected snap back to the middle band.
///
/// Long when the last close is below the lower band and RSI is oversold.
/// Short when the last close is above the upper band and RSI is overbought.
/// Anything else is no call.
#[derive(Debug, Clone)]
pub struct MeanReversionEngine {
    config: MeanReversionConfig,
}

#[derive(Debug, Clone)]
pub struct MeanReversionConfig {
    /// RSI lookback
    pub rsi_period: usize,

    /// RSI level below which price is considered oversold (e.g. 30)
    pub rsi_oversold: f64,

    /// RSI level above which price is considered overbought (e.g. 70)
    pub rsi_overbought: f64,

    /// Bollinger middle band SMA period
    pub bb_period: usize,

    /// Band width in standard deviations
    pub bb_std: f64,
}

impl Default for MeanReversionConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            bb_period: 20,
            bb_std: 2.0,
        }
    }
}

impl MeanReversionEngine {
    pub fn new(config: MeanReversionConfig) -> Self {
        Self { config }
    }

    fn indicators(&self, frame: &Frame) -> Result<(f64, BollingerBands, f64)> {
        if frame.len() < self.min_bars_required() {
            return Err(BotError::Strategy(format!(
                "Need at least {} bars for mean reversion, got {}",
                self.min_bars_required(),
                frame.len()
            )));
        }

        let current_price = frame
            .current_price()
            .ok_or_else(|| BotError::Strategy("frame has no close prices".to_string()))?;
        let rsi = calculate_rsi(&frame.close, self.config.rsi_period)
            .ok_or_else(|| BotError::Strategy("Failed to calculate RSI".to_string()))?;
        let bands = calculate_bollinger(&frame.close, self.config.bb_period, self.config.bb_std)
            .ok_or_else(|| BotError::Strategy("Failed to calculate Bollinger Bands".to_string()))?;

        Ok((rsi, bands, current_price))
    }
}

impl Default for MeanReversionEngine {
    fn default() -> Self {
        Self::new(MeanReversionConfig::default())
    }
}

impl StrategyEngine for MeanReversionEngine {
    fn name(&self) -> &str {
        "Mean Reversion"
    }

    fn min_bars_required(&self) -> usize {
        // RSI needs one extra close for its first change
        self.config.bb_period.max(self.config.rsi_period + 1)
    }

    fn classify(&self, frame: &Frame) -> Result<Option<TrendSignal>> {
        let (rsi, bands, price) = self.indicators(frame)?;

        let below_band = price < bands.lower;
        let above_band = price > bands.upper;
        let oversold = rsi < self.config.rsi_oversold;
        let overbought = rsi > self.config.rsi_overbought;

        tracing::debug!(
            "Mean Reversion Check: price={:.4} bands=[{:.4}, {:.4}] rsi={:.1} | below={} oversold={} above={} overbought={}",
            price,
            bands.lower,
            bands.upper,
            rsi,
            below_band,
            oversold,
            above_band,
            overbought
        );

        if below_band && oversold {
            return Ok(Some(TrendSignal::Long));
        }
        if above_band && overbought {
            return Ok(Some(TrendSignal::Short));
        }

        Ok(None)
    }

    fn snapshot_indicators(&self, frame: &Frame) -> Result<IndicatorSnapshot> {
        let (rsi, bands, current_price) = self.indicators(frame)?;

        Ok(IndicatorSnapshot {
            rsi,
            bollinger_upper: bands.upper,
            bollinger_middle: bands.middle,
            bollinger_lower: bands.lower,
            current_price,
        })
    }
}
