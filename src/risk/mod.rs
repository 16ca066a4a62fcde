// Risk bounds: pluggable engines plus the validating calculator
pub mod atr;
pub mod calculator;

use crate::models::{Frame, RiskBounds, TrendSignal};
use crate::Result;

pub use atr::{AtrRiskConfig, AtrRiskEngine};
pub use calculator::RiskCalculator;

/// Produces stop-loss / take-profit levels for a signalled trade
pub trait RiskEngine: Send + Sync {
    fn compute_risk_bounds(&self, frame: &Frame, trend: TrendSignal) -> Result<RiskBounds>;
}
