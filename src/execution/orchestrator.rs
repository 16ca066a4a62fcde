use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::{ExchangeCommand, ExchangeQuery};
use crate::config::{CycleSettings, GuardThresholds};
use crate::execution::{OrderDispatcher, PositionGuard};
use crate::models::{BlockReason, Frame, OrderSide, TrendSignal};
use crate::risk::{RiskCalculator, RiskEngine};
use crate::strategy::{SignalEvaluator, StrategyEngine};

/// Terminal state of one decision cycle
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Guard refused a new position
    Blocked(Option<BlockReason>),
    /// A guard query failed; nothing was decided
    GuardFailed(String),
    FetchFailed(String),
    EvaluateFailed(String),
    NoSignal,
    RiskFailed(String),
    OrderPlaced {
        side: OrderSide,
        order_id: Option<String>,
    },
    OrderFailed(String),
    /// Another cycle was still running
    Skipped,
}

impl CycleOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            CycleOutcome::Blocked(_) => "blocked",
            CycleOutcome::GuardFailed(_) => "guard_failed",
            CycleOutcome::FetchFailed(_) => "fetch_failed",
            CycleOutcome::EvaluateFailed(_) => "evaluate_failed",
            CycleOutcome::NoSignal => "no_signal",
            CycleOutcome::RiskFailed(_) => "risk_failed",
            CycleOutcome::OrderPlaced { .. } => "order_placed",
            CycleOutcome::OrderFailed(_) => "order_failed",
            CycleOutcome::Skipped => "skipped",
        }
    }

    pub fn order_placed(&self) -> bool {
        matches!(self, CycleOutcome::OrderPlaced { .. })
    }
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleOutcome::Blocked(Some(reason)) => write!(f, "blocked: {}", reason),
            CycleOutcome::Blocked(None) => write!(f, "blocked"),
            CycleOutcome::GuardFailed(e) => write!(f, "guard check failed: {}", e),
            CycleOutcome::FetchFailed(e) => write!(f, "market data unavailable: {}", e),
            CycleOutcome::EvaluateFailed(e) => write!(f, "signal evaluation failed: {}", e),
            CycleOutcome::NoSignal => write!(f, "no signal"),
            CycleOutcome::RiskFailed(e) => write!(f, "risk bounds unavailable: {}", e),
            CycleOutcome::OrderPlaced { side, order_id } => write!(
                f,
                "{} order placed (id {})",
                side,
                order_id.as_deref().unwrap_or("unknown")
            ),
            CycleOutcome::OrderFailed(e) => write!(f, "order failed: {}", e),
            CycleOutcome::Skipped => write!(f, "skipped, previous cycle still running"),
        }
    }
}

/// Decision record emitted once per cycle
#[derive(Debug, Clone)]
pub struct CycleRecord {
    pub cycle_id: Uuid,
    pub symbol: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: CycleOutcome,
}

impl CycleRecord {
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

/// Runs guard -> fetch -> evaluate -> risk -> dispatch for the configured symbol
///
/// Holds no decision state between cycles; the exchange is the only memory.
/// Overlapping triggers are dropped with [`CycleOutcome::Skipped`].
pub struct DecisionOrchestrator {
    guard: PositionGuard,
    exchange: Arc<dyn ExchangeQuery>,
    evaluator: SignalEvaluator,
    risk: RiskCalculator,
    dispatcher: OrderDispatcher,
    settings: CycleSettings,
    in_flight: Mutex<()>,
}

impl DecisionOrchestrator {
    pub fn new(
        query: Arc<dyn ExchangeQuery>,
        command: Arc<dyn ExchangeCommand>,
        strategy: Arc<dyn StrategyEngine>,
        risk_engine: Arc<dyn RiskEngine>,
        settings: CycleSettings,
        thresholds: GuardThresholds,
    ) -> Self {
        Self {
            guard: PositionGuard::new(query.clone(), thresholds),
            exchange: query,
            evaluator: SignalEvaluator::new(strategy),
            risk: RiskCalculator::new(risk_engine),
            dispatcher: OrderDispatcher::new(command),
            settings,
            in_flight: Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &CycleSettings {
        &self.settings
    }

    pub async fn run_cycle(&self) -> CycleRecord {
        self.run_cycle_at(Utc::now()).await
    }

    /// Run one cycle with `now` as the guard's reference instant
    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> CycleRecord {
        let cycle_id = Uuid::new_v4();
        let started_at = Utc::now();

        let outcome = match self.in_flight.try_lock() {
            Ok(_running) => self.decide(now).await,
            Err(_) => CycleOutcome::Skipped,
        };

        let record = CycleRecord {
            cycle_id,
            symbol: self.settings.symbol.clone(),
            started_at,
            finished_at: Utc::now(),
            outcome,
        };
        log_record(&record);
        record
    }

    async fn decide(&self, now: DateTime<Utc>) -> CycleOutcome {
        let settings = &self.settings;
        let symbol = settings.symbol.as_str();

        match self.guard.evaluate_at(symbol, now).await {
            Ok(decision) if !decision.allowed => return CycleOutcome::Blocked(decision.reason),
            Ok(_) => {}
            Err(e) => return CycleOutcome::GuardFailed(e.to_string()),
        }

        let window = match self
            .exchange
            .get_historical_data(symbol, &settings.interval, settings.limit)
            .await
        {
            Ok(Some(window)) if !window.is_empty() => window,
            Ok(_) => return CycleOutcome::FetchFailed("no bars returned".to_string()),
            Err(e) => return CycleOutcome::FetchFailed(e.to_string()),
        };

        let evaluation = match self.evaluator.evaluate(&window) {
            Ok(evaluation) => evaluation,
            Err(e) => return CycleOutcome::EvaluateFailed(e.to_string()),
        };

        let side = match evaluation.signal.order_side() {
            Some(side) => side,
            None => return CycleOutcome::NoSignal,
        };

        self.log_indicators(&evaluation.signal, &evaluation.frame);

        let bounds = match self.risk.compute_bounds(&evaluation.frame, evaluation.signal) {
            Ok(bounds) => bounds,
            Err(e) => return CycleOutcome::RiskFailed(e.to_string()),
        };

        // Same price the bounds were validated against
        let current_price = match evaluation.frame.current_price() {
            Some(price) => price,
            None => return CycleOutcome::RiskFailed("no current price".to_string()),
        };

        let result = self
            .dispatcher
            .submit(
                symbol,
                side,
                settings.quantity,
                current_price,
                settings.leverage,
                bounds.stop_loss,
                bounds.take_profit,
            )
            .await;

        if result.accepted {
            CycleOutcome::OrderPlaced {
                side,
                order_id: result.order_id,
            }
        } else {
            CycleOutcome::OrderFailed(result.details)
        }
    }

    fn log_indicators(&self, signal: &TrendSignal, frame: &Frame) {
        match self.evaluator.strategy().snapshot_indicators(frame) {
            Ok(snapshot) => tracing::info!(
                "📊 {} signal | price {:.4} | RSI {:.1} | BB [{:.4} / {:.4} / {:.4}]",
                signal,
                snapshot.current_price,
                snapshot.rsi,
                snapshot.bollinger_lower,
                snapshot.bollinger_middle,
                snapshot.bollinger_upper
            ),
            Err(e) => tracing::warn!("Could not snapshot indicators: {}", e),
        }
    }
}

fn log_record(record: &CycleRecord) {
    let CycleRecord {
        cycle_id,
        symbol,
        outcome,
        ..
    } = record;
    let elapsed_ms = record.duration_ms();
    let label = outcome.label();

    match outcome {
        CycleOutcome::OrderFailed(_) => {
            tracing::error!(%cycle_id, symbol = %symbol, outcome = label, elapsed_ms, "❌ Cycle ended: {}", outcome)
        }
        CycleOutcome::GuardFailed(_)
        | CycleOutcome::FetchFailed(_)
        | CycleOutcome::EvaluateFailed(_)
        | CycleOutcome::RiskFailed(_) => {
            tracing::warn!(%cycle_id, symbol = %symbol, outcome = label, elapsed_ms, "⚠️  Cycle ended: {}", outcome)
        }
        CycleOutcome::OrderPlaced { .. } => {
            tracing::info!(%cycle_id, symbol = %symbol, outcome = label, elapsed_ms, "✅ Cycle ended: {}", outcome)
        }
        CycleOutcome::Blocked(_) | CycleOutcome::NoSignal | CycleOutcome::Skipped => {
            tracing::info!(%cycle_id, symbol = %symbol, outcome = label, elapsed_ms, "Cycle ended: {}", outcome)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_outcome_display() {
        let blocked = CycleOutcome::Blocked(Some(BlockReason::TooManyPositions { count: 2 }));
        assert_eq!(blocked.to_string(), "blocked: 2 open positions already");
        assert_eq!(blocked.label(), "blocked");

        let placed = CycleOutcome::OrderPlaced {
            side: OrderSide::Buy,
            order_id: Some("42".to_string()),
        };
        assert_eq!(placed.to_string(), "Buy order placed (id 42)");
        assert!(placed.order_placed());
        assert!(!CycleOutcome::NoSignal.order_placed());
    }

    #[test]
    fn test_record_duration() {
        let started_at = Utc::now();
        let record = CycleRecord {
            cycle_id: Uuid::new_v4(),
            symbol: "BTCUSDT".to_string(),
            started_at,
            finished_at: started_at + Duration::milliseconds(250),
            outcome: CycleOutcome::NoSignal,
        };

        assert_eq!(record.duration_ms(), 250);
    }
}
