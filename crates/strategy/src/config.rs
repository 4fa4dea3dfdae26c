use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::info;

use common::{Error, Granularity, Result};

use crate::position::TradeParams;

/// Strategy file (TOML). Every field is optional; omitted fields keep the
/// defaults below.
///
/// Example `config/strategy.toml`:
/// ```toml
/// product_id = "BTC-USD"
/// quote_amount = 5.0
/// fee_buffer_ratio = 0.013
/// poll_interval_secs = 30
///
/// [short]
/// granularity = "ONE_MINUTE"
/// lookback_secs = 600
/// window = 5
///
/// [long]
/// granularity = "FIVE_MINUTE"
/// lookback_secs = 1800
/// window = 5
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StrategyFileConfig {
    /// Venue product, e.g. "BTC-USD".
    pub product_id: String,
    #[serde(deserialize_with = "short_leg")]
    pub short: LegConfig,
    #[serde(deserialize_with = "long_leg")]
    pub long: LegConfig,
    /// Quote-currency notional per order.
    pub quote_amount: Decimal,
    pub fee_buffer_ratio: Decimal,
    pub buy_price_factor: Decimal,
    pub sell_price_factor: Decimal,
    /// Client order ids become `<prefix>-buy-order` / `<prefix>-sell-order`.
    pub client_order_prefix: String,
    pub poll_interval_secs: u64,
}

/// One moving-average input: which candles to fetch and how many to average.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LegConfig {
    pub granularity: Granularity,
    /// How far back to request candles.
    pub lookback_secs: i64,
    /// Number of most recent closes to average.
    pub window: usize,
}

impl LegConfig {
    pub fn short_default() -> Self {
        Self {
            granularity: Granularity::OneMinute,
            lookback_secs: 600,
            window: 5,
        }
    }

    pub fn long_default() -> Self {
        Self {
            granularity: Granularity::FiveMinute,
            lookback_secs: 1_800,
            window: 5,
        }
    }
}

/// A leg table as written in the file; absent keys fall back per leg.
#[derive(Deserialize)]
struct PartialLeg {
    granularity: Option<Granularity>,
    lookback_secs: Option<i64>,
    window: Option<usize>,
}

impl PartialLeg {
    fn or(self, base: LegConfig) -> LegConfig {
        LegConfig {
            granularity: self.granularity.unwrap_or(base.granularity),
            lookback_secs: self.lookback_secs.unwrap_or(base.lookback_secs),
            window: self.window.unwrap_or(base.window),
        }
    }
}

fn short_leg<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<LegConfig, D::Error> {
    PartialLeg::deserialize(d).map(|leg| leg.or(LegConfig::short_default()))
}

fn long_leg<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<LegConfig, D::Error> {
    PartialLeg::deserialize(d).map(|leg| leg.or(LegConfig::long_default()))
}

impl Default for StrategyFileConfig {
    fn default() -> Self {
        Self {
            product_id: "BTC-USD".to_string(),
            short: LegConfig::short_default(),
            long: LegConfig::long_default(),
            quote_amount: Decimal::new(5, 0),
            fee_buffer_ratio: Decimal::new(13, 3),
            buy_price_factor: Decimal::new(999, 3),
            sell_price_factor: Decimal::new(1001, 3),
            client_order_prefix: "bot".to_string(),
            poll_interval_secs: 30,
        }
    }
}

impl StrategyFileConfig {
    /// Load and validate a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read strategy config at '{path}': {e}"))
        })?;
        let cfg = Self::parse(&content)
            .map_err(|e| Error::Config(format!("Invalid strategy config at '{path}': {e}")))?;
        info!(path, product = %cfg.product_id, "Loaded strategy config");
        Ok(cfg)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.product_id.trim().is_empty() {
            return Err(Error::Config("product_id must not be empty".into()));
        }
        for (name, leg) in [("short", &self.short), ("long", &self.long)] {
            if leg.window == 0 {
                return Err(Error::Config(format!("{name}.window must be > 0")));
            }
            // Shorter lookbacks can never return `window` candles.
            let needed = leg.granularity.seconds().saturating_mul(leg.window as i64);
            if leg.lookback_secs < needed {
                return Err(Error::Config(format!(
                    "{name}.lookback_secs must cover {} {} candles ({needed}s)",
                    leg.window, leg.granularity
                )));
            }
        }
        if self.quote_amount <= Decimal::ZERO {
            return Err(Error::Config("quote_amount must be > 0".into()));
        }
        if self.fee_buffer_ratio < Decimal::ZERO {
            return Err(Error::Config("fee_buffer_ratio must be >= 0".into()));
        }
        if self.buy_price_factor <= Decimal::ZERO || self.sell_price_factor <= Decimal::ZERO {
            return Err(Error::Config("price factors must be > 0".into()));
        }
        if self.poll_interval_secs == 0 {
            return Err(Error::Config("poll_interval_secs must be > 0".into()));
        }
        Ok(())
    }

    pub fn trade_params(&self) -> TradeParams {
        TradeParams {
            product_id: self.product_id.clone(),
            quote_amount: self.quote_amount,
            fee_buffer_ratio: self.fee_buffer_ratio,
            buy_price_factor: self.buy_price_factor,
            sell_price_factor: self.sell_price_factor,
            client_order_prefix: self.client_order_prefix.clone(),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}
