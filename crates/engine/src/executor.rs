use std::sync::Arc;

use tracing::{info, warn};

use common::{Confirmation, ExchangeClient, OrderRequest};

/// Result of one order attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderOutcome {
    Confirmed(Confirmation),
    /// Not confirmed for any reason: venue refusal, bad body, transport or
    /// signing failure.
    Rejected { reason: String },
}

impl OrderOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, OrderOutcome::Confirmed(_))
    }
}

/// Submits orders from the decision loop to the venue.
///
/// This is the ONLY component that calls `ExchangeClient::place_limit_order`.
/// There is no retry: a rejected order is logged and the position state is
/// left as it was.
pub struct OrderExecutor {
    client: Arc<dyn ExchangeClient>,
}

impl OrderExecutor {
    pub fn new(client: Arc<dyn ExchangeClient>) -> Self {
        Self { client }
    }

    pub async fn submit(&self, order: &OrderRequest) -> OrderOutcome {
        info!(
            product = %order.product_id,
            side = %order.side,
            limit_price = %order.limit_price_string(),
            quote = %order.quote_amount_string(),
            client_order_id = %order.client_order_id,
            "Placing limit order"
        );

        match self.client.place_limit_order(order).await {
            Ok(confirmation) => {
                info!(
                    side = %order.side,
                    order_id = confirmation.order_id.as_deref().unwrap_or("-"),
                    "Limit order placed"
                );
                OrderOutcome::Confirmed(confirmation)
            }
            Err(e) => {
                warn!(side = %order.side, error = %e, "Order not confirmed");
                OrderOutcome::Rejected {
                    reason: e.to_string(),
                }
            }
        }
    }
}
