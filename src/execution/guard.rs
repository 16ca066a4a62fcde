use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::api::ExchangeQuery;
use crate::config::GuardThresholds;
use crate::models::{BlockReason, GuardDecision};
use crate::Result;

/// Pre-trade eligibility checks against live exchange state
///
/// Checks run in a fixed order and stop at the first block, so later
/// exchange queries are never issued for a blocked symbol:
/// 1. open-position cap
/// 2. age of the open position (only when below the cap)
/// 3. time since the last close
/// 4. pending open orders
pub struct PositionGuard {
    exchange: Arc<dyn ExchangeQuery>,
    thresholds: GuardThresholds,
}

impl PositionGuard {
    pub fn new(exchange: Arc<dyn ExchangeQuery>, thresholds: GuardThresholds) -> Self {
        Self {
            exchange,
            thresholds,
        }
    }

    pub fn thresholds(&self) -> &GuardThresholds {
        &self.thresholds
    }

    pub async fn evaluate(&self, symbol: &str) -> Result<GuardDecision> {
        self.evaluate_at(symbol, Utc::now()).await
    }

    /// Evaluate against an explicit reference instant
    pub async fn evaluate_at(&self, symbol: &str, now: DateTime<Utc>) -> Result<GuardDecision> {
        // Check 1 and 2: open positions
        let positions = self.exchange.get_open_positions(symbol).await?;

        if positions.len() >= self.thresholds.max_open_positions {
            return Ok(GuardDecision::block(BlockReason::TooManyPositions {
                count: positions.len(),
            }));
        }

        // Youngest position decides; with the default cap of 2 there is at most one
        if let Some(age) = positions.iter().map(|p| p.age(now)).min() {
            if age < self.thresholds.position_cooldown {
                return Ok(GuardDecision::block(BlockReason::RecentPositionTooYoung {
                    age,
                }));
            }
        }

        // Check 3: recent close
        if let Some(closed) = self.exchange.get_last_closed_position(symbol).await? {
            let age = closed.age(now);
            if age < self.thresholds.close_cooldown {
                return Ok(GuardDecision::block(BlockReason::RecentlyClosed { age }));
            }
        }

        // Check 4: pending orders
        let orders = self.exchange.get_open_orders(symbol).await?;
        if !orders.is_empty() {
            return Ok(GuardDecision::block(BlockReason::PendingOrderExists {
                count: orders.len(),
            }));
        }

        Ok(GuardDecision::allow())
    }
}
