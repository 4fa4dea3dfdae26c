use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use common::{
    Candle, Confirmation, Error, ExchangeClient, Granularity, OrderRequest, RejectionReason,
    Result,
};

use super::auth::RequestSigner;

pub const DEFAULT_BASE_URL: &str = "https://api.coinbase.com";

const ORDERS_PATH: &str = "/api/v3/brokerage/orders";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// REST client for Coinbase Advanced Trade. Every request carries its own
/// freshly signed bearer token.
pub struct CoinbaseClient {
    signer: RequestSigner,
    http: Client,
    base_url: Url,
    host: String,
}

impl CoinbaseClient {
    pub fn new(signer: RequestSigner, base_url: &str) -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Http(format!("failed to build HTTP client: {e}")))?;
        Self::with_client(signer, base_url, http)
    }

    pub fn with_client(signer: RequestSigner, base_url: &str, http: Client) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("invalid API base URL '{base_url}': {e}")))?;
        let host = base_url
            .host_str()
            .ok_or_else(|| Error::Config(format!("API base URL '{base_url}' has no host")))?
            .to_string();

        Ok(Self {
            signer,
            http,
            base_url,
            host,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Config(format!("invalid request path '{path}': {e}")))
    }

    async fn signed_get(&self, path: &str, query: &[(&str, String)]) -> Result<String> {
        let mut url = self.endpoint(path)?;
        url.query_pairs_mut()
            .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        let credential = self.signer.sign("GET", &self.host, path)?;

        let resp = self
            .http
            .get(url)
            .header("Authorization", credential.bearer())
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(Error::Exchange(format!("HTTP {status}: {body}")));
        }
        Ok(body)
    }

    /// Returns the status alongside the body; order responses are interpreted
    /// even on error statuses.
    async fn signed_post(&self, path: &str, payload: &Value) -> Result<(StatusCode, String)> {
        let url = self.endpoint(path)?;
        let credential = self.signer.sign("POST", &self.host, path)?;

        let resp = self
            .http
            .post(url)
            .header("Authorization", credential.bearer())
            .json(payload)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;
        Ok((status, text))
    }
}

#[async_trait]
impl ExchangeClient for CoinbaseClient {
    async fn fetch_candles(
        &self,
        product_id: &str,
        granularity: Granularity,
        lookback_secs: i64,
    ) -> Result<Vec<Candle>> {
        let end = Utc::now().timestamp();
        let start = end - lookback_secs;
        let path = format!("/api/v3/brokerage/products/{product_id}/candles");

        let body = self
            .signed_get(
                &path,
                &[
                    ("start", start.to_string()),
                    ("end", end.to_string()),
                    ("granularity", granularity.as_str().to_string()),
                ],
            )
            .await?;

        let candles = parse_candles(&body)?;
        debug!(product = %product_id, %granularity, count = candles.len(), "Fetched candles");
        Ok(candles)
    }

    async fn place_limit_order(&self, order: &OrderRequest) -> Result<Confirmation> {
        let payload = order_payload(order);
        debug!(product = %order.product_id, side = %order.side, body = %payload, "Submitting order to Coinbase");

        let (status, body) = self.signed_post(ORDERS_PATH, &payload).await?;
        debug!(status = status.as_u16(), body = %body, "Order response");
        interpret_order_response(order, status, &body)
    }
}

/// JSON body for `POST /orders`: a GTC post-only limit order.
pub fn order_payload(order: &OrderRequest) -> Value {
    json!({
        "client_order_id": order.client_order_id,
        "product_id": order.product_id,
        "side": order.side.to_string(),
        "order_configuration": {
            "limit_limit_gtc": {
                "limit_price": order.limit_price_string(),
                "quote_size": order.quote_amount_string(),
                "post_only": order.post_only,
            }
        }
    })
}

fn parse_candles(body: &str) -> Result<Vec<Candle>> {
    let resp: CandlesResponse = serde_json::from_str(body)?;
    resp.candles.into_iter().map(RawCandle::into_candle).collect()
}

fn interpret_order_response(
    order: &OrderRequest,
    status: StatusCode,
    body: &str,
) -> Result<Confirmation> {
    let http_status = || RejectionReason::HttpStatus {
        status: status.as_u16(),
        body: body.to_string(),
    };

    let resp: OrderResponse = match serde_json::from_str(body) {
        Ok(resp) => resp,
        Err(_) if !status.is_success() => {
            return Err(Error::OrderRejected {
                reason: http_status(),
            })
        }
        Err(e) => {
            return Err(Error::OrderRejected {
                reason: RejectionReason::MalformedResponse(e.to_string()),
            })
        }
    };

    match resp.success {
        Some(true) => Ok(Confirmation {
            client_order_id: order.client_order_id.clone(),
            order_id: resp
                .success_response
                .and_then(|s| s.order_id)
                .filter(|id| !id.is_empty()),
        }),
        Some(false) => Err(Error::OrderRejected {
            reason: RejectionReason::Declined(resp.failure_description()),
        }),
        None if !status.is_success() => Err(Error::OrderRejected {
            reason: http_status(),
        }),
        None => Err(Error::OrderRejected {
            reason: RejectionReason::MissingSuccessFlag,
        }),
    }
}

// ─── Response types ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CandlesResponse {
    candles: Vec<RawCandle>,
}

#[derive(Deserialize)]
struct RawCandle {
    start: String,
    close: String,
}

impl RawCandle {
    fn into_candle(self) -> Result<Candle> {
        let secs: i64 = self
            .start
            .parse()
            .map_err(|_| Error::Parse(format!("candle start '{}' is not a unix time", self.start)))?;
        let open_time = Utc
            .timestamp_opt(secs, 0)
            .single()
            .ok_or_else(|| Error::Parse(format!("candle start {secs} out of range")))?;
        let close = Decimal::from_str(&self.close)
            .map_err(|e| Error::Parse(format!("candle close '{}': {e}", self.close)))?;
        Ok(Candle { open_time, close })
    }
}

#[derive(Deserialize)]
struct OrderResponse {
    success: Option<bool>,
    success_response: Option<SuccessResponse>,
    failure_reason: Option<String>,
    error_response: Option<ErrorResponse>,
}

#[derive(Deserialize)]
struct SuccessResponse {
    order_id: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: Option<String>,
    message: Option<String>,
}

impl OrderResponse {
    fn failure_description(&self) -> String {
        let detail = self.error_response.as_ref().and_then(|e| {
            match (e.error.as_deref(), e.message.as_deref()) {
                (Some(code), Some(msg)) => Some(format!("{code}: {msg}")),
                (Some(code), None) => Some(code.to_string()),
                (None, Some(msg)) => Some(msg.to_string()),
                (None, None) => None,
            }
        });
        detail
            .or_else(|| self.failure_reason.clone())
            .unwrap_or_else(|| "no reason given".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::OrderSide;
    use rust_decimal_macros::dec;

    fn order() -> OrderRequest {
        OrderRequest::limit("bot", "BTC-USD", OrderSide::Buy, dec!(50000.005), dec!(5))
    }

    #[test]
    fn payload_has_nested_limit_configuration() {
        let payload = order_payload(&order());
        assert_eq!(payload["client_order_id"], "bot-buy-order");
        assert_eq!(payload["product_id"], "BTC-USD");
        assert_eq!(payload["side"], "BUY");
        let cfg = &payload["order_configuration"]["limit_limit_gtc"];
        assert_eq!(cfg["limit_price"], "50000.01");
        assert_eq!(cfg["quote_size"], "5.00");
        assert_eq!(cfg["post_only"], true);
    }

    #[test]
    fn parses_candles_in_venue_order() {
        let body = r#"{"candles":[
            {"start":"1714564860","low":"1","high":"2","open":"1","close":"64012.5","volume":"3"},
            {"start":"1714564800","low":"1","high":"2","open":"1","close":"64000","volume":"3"}
        ]}"#;
        let candles = parse_candles(body).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].close, dec!(64012.5));
        assert_eq!(candles[0].open_time.timestamp(), 1_714_564_860);
        assert!(candles[0].open_time > candles[1].open_time);
    }

    #[test]
    fn missing_candles_field_is_an_error() {
        assert!(matches!(parse_candles(r#"{"data":[]}"#), Err(Error::Json(_))));
    }

    #[test]
    fn bad_close_is_parse_error() {
        let body = r#"{"candles":[{"start":"1714564860","close":"n/a"}]}"#;
        assert!(matches!(parse_candles(body), Err(Error::Parse(_))));
    }

    #[test]
    fn success_true_confirms_with_order_id() {
        let body = r#"{"success":true,"success_response":{"order_id":"abc-123","client_order_id":"bot-buy-order"}}"#;
        let conf = interpret_order_response(&order(), StatusCode::OK, body).unwrap();
        assert_eq!(conf.client_order_id, "bot-buy-order");
        assert_eq!(conf.order_id.as_deref(), Some("abc-123"));
    }

    #[test]
    fn success_false_is_declined_with_reason() {
        let body = r#"{"success":false,"failure_reason":"UNKNOWN_FAILURE_REASON",
            "error_response":{"error":"INSUFFICIENT_FUND","message":"Insufficient balance"}}"#;
        let err = interpret_order_response(&order(), StatusCode::OK, body).unwrap_err();
        match err {
            Error::OrderRejected {
                reason: RejectionReason::Declined(reason),
            } => assert_eq!(reason, "INSUFFICIENT_FUND: Insufficient balance"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_success_flag_is_rejected() {
        let err = interpret_order_response(&order(), StatusCode::OK, r#"{"order_id":"x"}"#).unwrap_err();
        assert!(matches!(
            err,
            Error::OrderRejected {
                reason: RejectionReason::MissingSuccessFlag
            }
        ));
    }

    #[test]
    fn unparsable_body_is_rejected() {
        let err = interpret_order_response(&order(), StatusCode::OK, "<html>").unwrap_err();
        assert!(matches!(
            err,
            Error::OrderRejected {
                reason: RejectionReason::MalformedResponse(_)
            }
        ));
    }

    #[test]
    fn error_status_without_json_reports_status() {
        let err = interpret_order_response(&order(), StatusCode::UNAUTHORIZED, "Unauthorized").unwrap_err();
        assert!(matches!(
            err,
            Error::OrderRejected {
                reason: RejectionReason::HttpStatus { status: 401, .. }
            }
        ));
    }
}
