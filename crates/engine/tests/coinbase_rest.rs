//! HTTP-level tests for the Coinbase client against a wiremock server.
use std::sync::Arc;

use p256::pkcs8::LineEnding;
use p256::SecretKey;
use rand::rngs::OsRng;
use rust_decimal_macros::dec;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{Error, ExchangeClient, Granularity, OrderRequest, OrderSide, RejectionReason};
use engine::{CandleFeed, CoinbaseClient, OrderExecutor, OrderOutcome, RequestSigner};

const CANDLES_PATH: &str = "/api/v3/brokerage/products/BTC-USD/candles";
const ORDERS_PATH: &str = "/api/v3/brokerage/orders";

fn client_for(server: &MockServer) -> CoinbaseClient {
    let pem = SecretKey::random(&mut OsRng)
        .to_sec1_pem(LineEnding::LF)
        .expect("encode test key")
        .to_string();
    let signer = RequestSigner::new("organizations/o/apiKeys/k", &pem).expect("test signer");
    CoinbaseClient::with_client(signer, &server.uri(), reqwest::Client::new()).expect("client")
}

fn buy_order() -> OrderRequest {
    OrderRequest::limit("bot", "BTC-USD", OrderSide::Buy, dec!(50000.005), dec!(5))
}

#[tokio::test]
async fn fetches_and_parses_candles_with_signed_get() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CANDLES_PATH))
        .and(query_param("granularity", "ONE_MINUTE"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candles": [
                {"start": "1714564860", "low": "1", "high": "2", "open": "1", "close": "64012.5", "volume": "3"},
                {"start": "1714564800", "low": "1", "high": "2", "open": "1", "close": "64000.0", "volume": "3"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let candles = client
        .fetch_candles("BTC-USD", Granularity::OneMinute, 600)
        .await
        .unwrap();

    assert_eq!(candles.len(), 2);
    assert_eq!(candles[0].close, dec!(64012.5));

    let requests = server.received_requests().await.expect("recorded requests");
    let req = &requests[0];
    let auth = req.headers.get("authorization").unwrap().to_str().unwrap();
    assert!(auth.starts_with("Bearer "));
    assert_eq!(auth.trim_start_matches("Bearer ").split('.').count(), 3);

    let query: std::collections::HashMap<_, _> = req.url.query_pairs().into_owned().collect();
    let start: i64 = query["start"].parse().unwrap();
    let end: i64 = query["end"].parse().unwrap();
    assert_eq!(end - start, 600);
}

#[tokio::test]
async fn server_error_is_exchange_error_and_feed_fails_open() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CANDLES_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let client = Arc::new(client_for(&server));
    let err = client
        .fetch_candles("BTC-USD", Granularity::FiveMinute, 1800)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Exchange(_)));

    let feed = CandleFeed::new(client);
    let candles = feed
        .fetch("BTC-USD", Granularity::FiveMinute, 1800)
        .await
        .unwrap();
    assert!(candles.is_empty());
}

#[tokio::test]
async fn body_without_candles_fails_open() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CANDLES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "unexpected"})))
        .mount(&server)
        .await;

    let feed = CandleFeed::new(Arc::new(client_for(&server)));
    let candles = feed
        .fetch("BTC-USD", Granularity::OneMinute, 600)
        .await
        .unwrap();
    assert!(candles.is_empty());
}

#[tokio::test]
async fn unreachable_venue_fails_open() {
    let server = MockServer::start().await;
    let client = Arc::new(client_for(&server));
    drop(server);

    let err = client
        .fetch_candles("BTC-USD", Granularity::OneMinute, 600)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Http(_)));

    let feed = CandleFeed::new(client);
    assert!(feed
        .fetch("BTC-USD", Granularity::OneMinute, 600)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn posts_post_only_limit_order_and_confirms() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ORDERS_PATH))
        .and(header_exists("authorization"))
        .and(body_partial_json(json!({
            "client_order_id": "bot-buy-order",
            "product_id": "BTC-USD",
            "side": "BUY",
            "order_configuration": {
                "limit_limit_gtc": {
                    "limit_price": "50000.01",
                    "quote_size": "5.00",
                    "post_only": true
                }
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "success_response": {"order_id": "11111-000000-000000", "client_order_id": "bot-buy-order"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let confirmation = client.place_limit_order(&buy_order()).await.unwrap();
    assert_eq!(confirmation.client_order_id, "bot-buy-order");
    assert_eq!(confirmation.order_id.as_deref(), Some("11111-000000-000000"));
}

#[tokio::test]
async fn declined_order_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ORDERS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "failure_reason": "UNKNOWN_FAILURE_REASON",
            "error_response": {"error": "INVALID_LIMIT_PRICE_POST_ONLY", "message": "would cross"}
        })))
        .mount(&server)
        .await;

    let client = Arc::new(client_for(&server));
    let err = client.place_limit_order(&buy_order()).await.unwrap_err();
    assert!(matches!(
        err,
        Error::OrderRejected {
            reason: RejectionReason::Declined(ref r)
        } if r.contains("INVALID_LIMIT_PRICE_POST_ONLY")
    ));

    let executor = OrderExecutor::new(client);
    let outcome = executor.submit(&buy_order()).await;
    assert!(!outcome.is_confirmed());
}

#[tokio::test]
async fn unauthorized_order_is_rejected_not_raised() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ORDERS_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&server)
        .await;

    let executor = OrderExecutor::new(Arc::new(client_for(&server)));
    match executor.submit(&buy_order()).await {
        OrderOutcome::Rejected { reason } => assert!(reason.contains("401")),
        other => panic!("expected rejection, got {other:?}"),
    }
}
