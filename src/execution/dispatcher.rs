use std::sync::Arc;

use uuid::Uuid;

use crate::api::ExchangeCommand;
use crate::models::{OrderRequest, OrderResult, OrderSide};

/// Sends exactly one order per call, never retried
///
/// Transport errors come back as a rejected result.
pub struct OrderDispatcher {
    exchange: Arc<dyn ExchangeCommand>,
}

impl OrderDispatcher {
    pub fn new(exchange: Arc<dyn ExchangeCommand>) -> Self {
        Self { exchange }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn submit(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: f64,
        current_price: f64,
        leverage: u32,
        stop_loss: f64,
        take_profit: f64,
    ) -> OrderResult {
        let request = OrderRequest {
            client_order_id: Uuid::new_v4(),
            symbol: symbol.to_string(),
            side,
            quantity,
            leverage,
            current_price,
            stop_loss,
            take_profit,
        };

        tracing::info!(
            "📤 Submitting {} {} {} @ {:.4} ({}x, SL {:.4}, TP {:.4}) link={}",
            request.side,
            request.quantity,
            request.symbol,
            request.current_price,
            request.leverage,
            request.stop_loss,
            request.take_profit,
            request.client_order_id
        );

        match self.exchange.place_order(&request).await {
            Ok(result) => result,
            Err(e) => OrderResult::rejected(format!("order submission failed: {}", e)),
        }
    }
}
