use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// One price candle from the venue's candle endpoint.
///
/// Only the close price drives decisions; `open_time` is kept for logging and
/// for ordering checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub close: Decimal,
}

/// Candle bucket size accepted by the venue's `granularity` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Granularity {
    OneMinute,
    FiveMinute,
    FifteenMinute,
    ThirtyMinute,
    OneHour,
    TwoHour,
    SixHour,
    OneDay,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::OneMinute => "ONE_MINUTE",
            Granularity::FiveMinute => "FIVE_MINUTE",
            Granularity::FifteenMinute => "FIFTEEN_MINUTE",
            Granularity::ThirtyMinute => "THIRTY_MINUTE",
            Granularity::OneHour => "ONE_HOUR",
            Granularity::TwoHour => "TWO_HOUR",
            Granularity::SixHour => "SIX_HOUR",
            Granularity::OneDay => "ONE_DAY",
        }
    }

    /// Bucket length in seconds.
    pub fn seconds(&self) -> i64 {
        match self {
            Granularity::OneMinute => 60,
            Granularity::FiveMinute => 300,
            Granularity::FifteenMinute => 900,
            Granularity::ThirtyMinute => 1_800,
            Granularity::OneHour => 3_600,
            Granularity::TwoHour => 7_200,
            Granularity::SixHour => 21_600,
            Granularity::OneDay => 86_400,
        }
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Side of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    fn tag(&self) -> &'static str {
        match self {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        }
    }
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// A post-only limit order to be submitted to the venue.
///
/// `client_order_id` is fixed per side, not per submission: a resubmitted buy
/// carries the same id as the previous buy so the venue can deduplicate it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub client_order_id: String,
    pub product_id: String,
    pub side: OrderSide,
    pub limit_price: Decimal,
    /// Notional in quote currency (e.g. USD).
    pub quote_amount: Decimal,
    pub post_only: bool,
}

impl OrderRequest {
    pub fn limit(
        id_prefix: &str,
        product_id: impl Into<String>,
        side: OrderSide,
        limit_price: Decimal,
        quote_amount: Decimal,
    ) -> Self {
        Self {
            client_order_id: client_order_id(id_prefix, side),
            product_id: product_id.into(),
            side,
            limit_price,
            quote_amount,
            post_only: true,
        }
    }

    /// Limit price rounded half away from zero to cents, always with two
    /// decimal places.
    pub fn limit_price_string(&self) -> String {
        to_cents_string(self.limit_price)
    }

    pub fn quote_amount_string(&self) -> String {
        to_cents_string(self.quote_amount)
    }
}

/// Deterministic client order id for a side, e.g. `bot-buy-order`.
pub fn client_order_id(prefix: &str, side: OrderSide) -> String {
    format!("{prefix}-{}-order", side.tag())
}

fn to_cents_string(value: Decimal) -> String {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded.to_string()
}

/// Venue acknowledgement of an accepted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    pub client_order_id: String,
    /// Venue-assigned id, when the acknowledgement carries one.
    pub order_id: Option<String>,
}

/// Why an order was not confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectionReason {
    /// The venue answered `success: false`.
    Declined(String),
    /// The body parsed but carried no `success` flag.
    MissingSuccessFlag,
    /// The body was not valid JSON.
    MalformedResponse(String),
    HttpStatus { status: u16, body: String },
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectionReason::Declined(reason) => write!(f, "declined by venue: {reason}"),
            RejectionReason::MissingSuccessFlag => write!(f, "response has no success flag"),
            RejectionReason::MalformedResponse(e) => write!(f, "malformed response: {e}"),
            RejectionReason::HttpStatus { status, body } => write!(f, "HTTP {status}: {body}"),
        }
    }
}

/// Short-lived bearer credential for exactly one outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedCredential {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl SignedCredential {
    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// Whether the bot is sending orders to the real venue or simulating them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradingMode {
    Live,
    Paper,
}

impl std::fmt::Display for TradingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradingMode::Live => write!(f, "live"),
            TradingMode::Paper => write!(f, "paper"),
        }
    }
}
