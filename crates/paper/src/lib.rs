use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use common::{Candle, Confirmation, ExchangeClient, Granularity, OrderRequest, Result};

/// Orders kept in the simulated log; older entries are dropped first.
pub const DEFAULT_ORDER_LOG_CAPACITY: usize = 1_000;

/// Simulated venue for paper trading.
///
/// Candles come from a real source (normally the live REST client) so the
/// strategy sees real prices; orders are recorded and confirmed locally and
/// never leave the process. A repeated `client_order_id` gets back the order
/// id from its first submission, the way the venue deduplicates.
pub struct PaperClient {
    market: Arc<dyn ExchangeClient>,
    /// Most recent accepted orders, oldest first, at most `log_capacity`.
    orders: Arc<RwLock<Vec<OrderRequest>>>,
    log_capacity: usize,
    /// client_order_id -> simulated venue order id.
    order_ids: RwLock<HashMap<String, String>>,
}

impl PaperClient {
    pub fn new(market: Arc<dyn ExchangeClient>) -> Self {
        Self::with_log_capacity(market, DEFAULT_ORDER_LOG_CAPACITY)
    }

    pub fn with_log_capacity(market: Arc<dyn ExchangeClient>, log_capacity: usize) -> Self {
        info!(log_capacity, "PaperClient initialized, orders will be simulated");
        Self {
            market,
            orders: Arc::new(RwLock::new(Vec::new())),
            log_capacity,
            order_ids: RwLock::new(HashMap::new()),
        }
    }

    /// Expose the simulated order log.
    pub fn orders_handle(&self) -> Arc<RwLock<Vec<OrderRequest>>> {
        self.orders.clone()
    }
}

#[async_trait]
impl ExchangeClient for PaperClient {
    async fn fetch_candles(
        &self,
        product_id: &str,
        granularity: Granularity,
        lookback_secs: i64,
    ) -> Result<Vec<Candle>> {
        self.market
            .fetch_candles(product_id, granularity, lookback_secs)
            .await
    }

    async fn place_limit_order(&self, order: &OrderRequest) -> Result<Confirmation> {
        let order_id = {
            let mut ids = self.order_ids.write().await;
            ids.entry(order.client_order_id.clone())
                .or_insert_with(|| uuid::Uuid::new_v4().to_string())
                .clone()
        };

        debug!(
            product = %order.product_id,
            side = %order.side,
            limit_price = %order.limit_price_string(),
            quote = %order.quote_amount_string(),
            %order_id,
            "Paper order simulated"
        );
        let mut orders = self.orders.write().await;
        orders.push(order.clone());
        if orders.len() > self.log_capacity {
            let excess = orders.len() - self.log_capacity;
            orders.drain(..excess);
        }
        drop(orders);

        Ok(Confirmation {
            client_order_id: order.client_order_id.clone(),
            order_id: Some(order_id),
        })
    }
}
