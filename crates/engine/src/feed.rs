use std::sync::Arc;

use tracing::warn;

use common::{Candle, ExchangeClient, Granularity, Result};

/// Candle source for the decision loop.
///
/// Fails open: transport and body errors become an empty sequence, which the
/// moving average reports as insufficient data. Signing errors still
/// propagate since they will not heal on the next tick.
pub struct CandleFeed {
    client: Arc<dyn ExchangeClient>,
}

impl CandleFeed {
    pub fn new(client: Arc<dyn ExchangeClient>) -> Self {
        Self { client }
    }

    pub async fn fetch(
        &self,
        product_id: &str,
        granularity: Granularity,
        lookback_secs: i64,
    ) -> Result<Vec<Candle>> {
        match self
            .client
            .fetch_candles(product_id, granularity, lookback_secs)
            .await
        {
            Ok(candles) => Ok(candles),
            Err(e) if e.is_recoverable() => {
                warn!(product = %product_id, %granularity, error = %e, "Candle fetch failed, treating as no data");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }
}
