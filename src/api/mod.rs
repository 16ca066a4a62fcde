// Exchange connectivity: capability traits consumed by the decision core
pub mod bybit;
pub mod dry_run;

use crate::models::{ClosedPosition, MarketDataWindow, OpenOrder, OrderRequest, OrderResult, Position};
use crate::Result;
use async_trait::async_trait;

pub use bybit::{BybitClient, BybitConfig};
pub use dry_run::DryRunCommand;

/// Read-only view of exchange state
///
/// Implementations must return `Err` when a query fails, never an empty
/// result. The guard treats "no positions" and "query failed" differently.
#[async_trait]
pub trait ExchangeQuery: Send + Sync {
    async fn get_open_positions(&self, symbol: &str) -> Result<Vec<Position>>;

    async fn get_last_closed_position(&self, symbol: &str) -> Result<Option<ClosedPosition>>;

    async fn get_open_orders(&self, symbol: &str) -> Result<Vec<OpenOrder>>;

    /// Fetch up to `limit` bars, oldest first. `Ok(None)` means the exchange had no data.
    async fn get_historical_data(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> Result<Option<MarketDataWindow>>;
}

/// Order submission
///
/// A call that reaches the exchange is final; callers must not retry on their own.
#[async_trait]
pub trait ExchangeCommand: Send + Sync {
    async fn place_order(&self, request: &OrderRequest) -> Result<OrderResult>;
}
