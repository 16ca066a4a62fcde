use crate::error::BotError;
use crate::indicators::calculate_atr;
use crate::models::{Frame, RiskBounds, TrendSignal};
use crate::risk::RiskEngine;
use crate::Result;

/// Volatility-scaled bounds: stop and target sit a multiple of ATR away from the last close
#[derive(Debug, Clone)]
pub struct AtrRiskEngine {
    config: AtrRiskConfig,
}

#[derive(Debug, Clone)]
pub struct AtrRiskConfig {
    pub atr_period: usize,
    /// Stop distance in ATRs
    pub stop_loss_atr: f64,
    /// Target distance in ATRs
    pub take_profit_atr: f64,
}

impl Default for AtrRiskConfig {
    fn default() -> Self {
        Self {
            atr_period: 14,
            stop_loss_atr: 1.5,
            take_profit_atr: 3.0, // 2:1 reward/risk
        }
    }
}

impl AtrRiskEngine {
    pub fn new(config: AtrRiskConfig) -> Self {
        Self { config }
    }
}

impl Default for AtrRiskEngine {
    fn default() -> Self {
        Self::new(AtrRiskConfig::default())
    }
}

impl RiskEngine for AtrRiskEngine {
    fn compute_risk_bounds(&self, frame: &Frame, trend: TrendSignal) -> Result<RiskBounds> {
        let price = frame
            .current_price()
            .ok_or_else(|| BotError::RiskBounds("frame has no close prices".to_string()))?;

        let atr = calculate_atr(&frame.high, &frame.low, &frame.close, self.config.atr_period)
            .ok_or_else(|| {
                BotError::RiskBounds(format!(
                    "Need at least {} bars for ATR, got {}",
                    self.config.atr_period + 1,
                    frame.len()
                ))
            })?;

        let stop = atr * self.config.stop_loss_atr;
        let target = atr * self.config.take_profit_atr;

        let bounds = match trend {
            TrendSignal::Long => RiskBounds {
                stop_loss: price - stop,
                take_profit: price + target,
            },
            TrendSignal::Short => RiskBounds {
                stop_loss: price + stop,
                take_profit: price - target,
            },
            TrendSignal::None => {
                return Err(BotError::RiskBounds("no trend to bound".to_string()));
            }
        };

        tracing::debug!(
            "ATR {:.4} at price {:.4}: SL {:.4}, TP {:.4}",
            atr,
            price,
            bounds.stop_loss,
            bounds.take_profit
        );

        Ok(bounds)
    }
}
