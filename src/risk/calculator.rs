use crate::error::BotError;
use crate::models::{Frame, RiskBounds, TrendSignal};
use crate::risk::RiskEngine;
use crate::Result;
use std::sync::Arc;

/// Delegates to a [`RiskEngine`] and refuses any bounds an order could not safely carry
pub struct RiskCalculator {
    engine: Arc<dyn RiskEngine>,
}

impl RiskCalculator {
    pub fn new(engine: Arc<dyn RiskEngine>) -> Self {
        Self { engine }
    }

    pub fn compute_bounds(&self, frame: &Frame, trend: TrendSignal) -> Result<RiskBounds> {
        if trend == TrendSignal::None {
            return Err(BotError::RiskBounds("no trend to bound".to_string()));
        }

        let price = frame
            .current_price()
            .filter(|p| p.is_finite() && *p > 0.0)
            .ok_or_else(|| BotError::RiskBounds("no valid current price".to_string()))?;

        let bounds = self.engine.compute_risk_bounds(frame, trend)?;
        validate_bounds(&bounds, price, trend)?;

        Ok(bounds)
    }
}

/// Long: stop < price < target. Short: target < price < stop.
pub fn validate_bounds(bounds: &RiskBounds, price: f64, trend: TrendSignal) -> Result<()> {
    let RiskBounds {
        stop_loss,
        take_profit,
    } = *bounds;

    if !stop_loss.is_finite() || !take_profit.is_finite() {
        return Err(BotError::RiskBounds(format!(
            "non-finite bounds SL {} / TP {}",
            stop_loss, take_profit
        )));
    }

    if stop_loss <= 0.0 || take_profit <= 0.0 {
        return Err(BotError::RiskBounds(format!(
            "bounds must be positive prices, got SL {} / TP {}",
            stop_loss, take_profit
        )));
    }

    let correct_side = match trend {
        TrendSignal::Long => stop_loss < price && price < take_profit,
        TrendSignal::Short => take_profit < price && price < stop_loss,
        TrendSignal::None => false,
    };

    if !correct_side {
        return Err(BotError::RiskBounds(format!(
            "{} bounds SL {:.4} / TP {:.4} do not straddle price {:.4}",
            trend, stop_loss, take_profit, price
        )));
    }

    Ok(())
}
