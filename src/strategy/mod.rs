// Trend classification: strategy engines and the evaluator that drives them
pub mod evaluator;
pub mod mean_reversion;

use crate::models::{Frame, IndicatorSnapshot, MarketDataWindow, TrendSignal};
use crate::Result;

pub use evaluator::{SignalEvaluation, SignalEvaluator};
pub use mean_reversion::{MeanReversionConfig, MeanReversionEngine};

/// Pluggable trend-classification strategy
pub trait StrategyEngine: Send + Sync {
    /// Strategy name for logs
    fn name(&self) -> &str;

    /// Minimum bars needed before `classify` can produce a call
    fn min_bars_required(&self) -> usize;

    /// Turn a raw window into the frame the strategy and risk engines read
    fn prepare(&self, window: &MarketDataWindow) -> Result<Frame> {
        Ok(Frame::from_candles(window.candles()))
    }

    /// Directional call for the frame. `Ok(None)` means no call.
    fn classify(&self, frame: &Frame) -> Result<Option<TrendSignal>>;

    /// Indicator values at the last bar, for the decision log
    fn snapshot_indicators(&self, frame: &Frame) -> Result<IndicatorSnapshot>;
}
