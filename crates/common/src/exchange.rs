use async_trait::async_trait;

use crate::{Candle, Confirmation, Granularity, OrderRequest, Result};

/// Abstraction over the venue connection.
///
/// `CoinbaseClient` implements this for live trading.
/// `PaperClient` implements this for simulation.
///
/// The engine's candle feed and order executor are the only holders of a
/// `dyn ExchangeClient`.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Fetch candles for `product_id` covering `[now - lookback_secs, now]`,
    /// in the order the venue returns them (most recent first).
    async fn fetch_candles(
        &self,
        product_id: &str,
        granularity: Granularity,
        lookback_secs: i64,
    ) -> Result<Vec<Candle>>;

    /// Submit a limit order. `Ok` only when the venue explicitly confirmed it;
    /// anything else is `Error::OrderRejected` or a transport error.
    async fn place_limit_order(&self, order: &OrderRequest) -> Result<Confirmation>;
}
