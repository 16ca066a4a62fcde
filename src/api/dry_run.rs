use crate::api::ExchangeCommand;
use crate::models::{OrderRequest, OrderResult};
use crate::Result;
use async_trait::async_trait;

/// Command backend that logs orders instead of sending them
#[derive(Debug, Clone, Default)]
pub struct DryRunCommand;

#[async_trait]
impl ExchangeCommand for DryRunCommand {
    async fn place_order(&self, request: &OrderRequest) -> Result<OrderResult> {
        tracing::info!(
            "  → [DRY RUN] Would {} {} {} @ ${:.4} ({}x, SL {:.4}, TP {:.4})",
            request.side,
            request.quantity,
            request.symbol,
            request.current_price,
            request.leverage,
            request.stop_loss,
            request.take_profit
        );

        Ok(OrderResult::accepted(
            Some(format!("dry-run-{}", request.client_order_id)),
            "dry run, not sent to exchange",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrderSide;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_dry_run_accepts_without_sending() {
        let request = OrderRequest {
            client_order_id: Uuid::new_v4(),
            symbol: "BTCUSDT".to_string(),
            side: OrderSide::Sell,
            quantity: 0.03,
            leverage: 10,
            current_price: 100.0,
            stop_loss: 102.0,
            take_profit: 95.0,
        };

        let result = tokio_test::assert_ok!(DryRunCommand.place_order(&request).await);

        assert!(result.accepted);
        assert!(result
            .order_id
            .unwrap()
            .ends_with(&request.client_order_id.to_string()));
    }
}
