use crate::error::BotError;
use crate::models::{Frame, MarketDataWindow, TrendSignal};
use crate::strategy::StrategyEngine;
use crate::Result;
use std::sync::Arc;

/// Frame and signal produced for one cycle
#[derive(Debug, Clone)]
pub struct SignalEvaluation {
    pub frame: Frame,
    pub signal: TrendSignal,
}

/// Validates the window and runs the strategy's prepare/classify pipeline
pub struct SignalEvaluator {
    strategy: Arc<dyn StrategyEngine>,
}

impl SignalEvaluator {
    pub fn new(strategy: Arc<dyn StrategyEngine>) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> &dyn StrategyEngine {
        self.strategy.as_ref()
    }

    pub fn evaluate(&self, window: &MarketDataWindow) -> Result<SignalEvaluation> {
        validate_window(window)?;

        let frame = self.strategy.prepare(window)?;
        let signal = self
            .strategy
            .classify(&frame)?
            .unwrap_or(TrendSignal::None);

        tracing::debug!(
            "{} classified {} bars of {} as {}",
            self.strategy.name(),
            frame.len(),
            window.symbol(),
            signal
        );

        Ok(SignalEvaluation { frame, signal })
    }
}

/// Seconds per bar for a Bybit interval code, if it has a fixed length
pub fn interval_secs(interval: &str) -> Option<u64> {
    match interval {
        "D" => Some(86_400),
        "W" => Some(604_800),
        "M" => None,
        minutes => minutes.parse::<u64>().ok().map(|m| m * 60),
    }
}

/// Reject empty or out-of-order windows; gaps are only logged
pub fn validate_window(window: &MarketDataWindow) -> Result<()> {
    if window.is_empty() {
        return Err(BotError::InvalidWindow(format!(
            "no bars for {}",
            window.symbol()
        )));
    }

    let max_gap_secs = interval_secs(window.interval()).map(|secs| secs + secs / 2);

    for pair in window.candles().windows(2) {
        let diff = (pair[1].timestamp - pair[0].timestamp).num_seconds();

        if diff <= 0 {
            return Err(BotError::InvalidWindow(format!(
                "bars are not strictly time-ascending at {}",
                pair[1].timestamp
            )));
        }

        if let Some(max_gap) = max_gap_secs {
            if diff as u64 > max_gap {
                tracing::warn!(
                    "Data gap in {}: {}s between bars {} and {} (interval {})",
                    window.symbol(),
                    diff,
                    pair[0].timestamp.format("%H:%M:%S"),
                    pair[1].timestamp.format("%H:%M:%S"),
                    window.interval()
                );
            }
        }
    }

    Ok(())
}
