//! Integration tests for the Fezz dispatch core.

use bytes::Bytes;
use fezz_dispatch::codec::{Decoded, JsonCodec, PayloadCodec};
use fezz_dispatch::handler::INTERNAL_ERROR_MARKER;
use fezz_dispatch::http::adapter;
use fezz_dispatch::prelude::*;
use fezz_dispatch::registry::{discover, ScanError};
use http_body_util::{BodyExt, Full};
use serde::Deserialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio_test::{assert_err, assert_ok};

static PROCESSED_ORDERS: AtomicUsize = AtomicUsize::new(0);
static STRICT_CALLS: AtomicUsize = AtomicUsize::new(0);
static REJECTED_ORDERS: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderCreated {
    order_id: String,
    #[serde(default)]
    customer_name: Option<String>,
}

// Explicit route: orders/processing.
#[message_function(name = "process-order", destination = "orders", group = "processing")]
async fn process_order(order: OrderCreated, _ctx: &InvocationContext) -> Result<(), FezzError> {
    assert_eq!(order.order_id, "42");
    PROCESSED_ORDERS.fetch_add(1, Ordering::SeqCst);
    Ok(())
}

// Counts every invocation; used to prove bad payloads never reach it.
#[message_function(name = "strict-order", destination = "strict")]
async fn strict_order(_order: OrderCreated, _ctx: &InvocationContext) -> Result<(), FezzError> {
    STRICT_CALLS.fetch_add(1, Ordering::SeqCst);
    Ok(())
}

#[message_function(name = "reject-order")]
async fn reject_order(order: OrderCreated, _ctx: &InvocationContext) -> Result<(), FezzError> {
    REJECTED_ORDERS.fetch_add(1, Ordering::SeqCst);
    Err(FezzError::new(format!(
        "customer {} rejected",
        order.customer_name.unwrap_or_default()
    )))
}

// No explicit route: resolved from configuration.
#[message_function(name = "audit-order")]
async fn audit_order(_order: OrderCreated, _ctx: &InvocationContext) -> Result<(), FezzError> {
    Ok(())
}

#[request_function(name = "ping")]
async fn ping(_req: FezzRequest, _ctx: &InvocationContext) -> Result<ActionResult, FezzError> {
    Ok(ActionResult::OkEmpty)
}

#[request_function(name = "explode")]
async fn explode(_req: FezzRequest, _ctx: &InvocationContext) -> Result<ActionResult, FezzError> {
    Err(FezzError::new("boom"))
}

#[request_function(name = "panicky")]
async fn panicky(_req: FezzRequest, _ctx: &InvocationContext) -> Result<ActionResult, FezzError> {
    let items: Vec<u32> = Vec::new();
    Ok(ActionResult::Ok(serde_json::json!({ "item": items[3] })))
}

#[request_function]
async fn echo_name(req: FezzRequest, _ctx: &InvocationContext) -> Result<ActionResult, FezzError> {
    match req.json::<OrderCreated>() {
        Ok(Decoded::Value(order)) => Ok(ActionResult::Ok(serde_json::json!({
            "orderId": order.order_id,
            "customerName": order.customer_name,
        }))),
        Ok(Decoded::Empty) => Ok(ActionResult::bad_request(&"missing body")?),
        Err(e) => Ok(ActionResult::bad_request(&e.message)?),
    }
}

struct UnloadableModule;

impl TypeSource for UnloadableModule {
    fn name(&self) -> &str {
        "unloadable"
    }

    fn scan(&self) -> Result<Vec<TypeInfo>, ScanError> {
        Err(ScanError::new("missing dependency"))
    }
}

fn module() -> StaticModule {
    StaticModule::new("orders")
        .with(ProcessOrderHandler::type_info())
        .with(StrictOrderHandler::type_info())
        .with(RejectOrderHandler::type_info())
        .with(AuditOrderHandler::type_info())
        .with(PingHandler::type_info())
        .with(ExplodeHandler::type_info())
        .with(PanickyHandler::type_info())
        .with(EchoNameHandler::type_info())
        .plain("orders::OrderCreated")
}

fn dispatcher_with(settings: &Settings) -> Dispatcher {
    let (table, failures) = InvocationTable::from_modules(&[&module()], settings);
    assert!(failures.is_empty());
    Dispatcher::new(table)
}

fn dispatcher() -> Dispatcher {
    dispatcher_with(&Settings::new())
}

#[tokio::test]
async fn test_orders_processing_invokes_once() {
    let dispatcher = dispatcher();
    let envelope = InboundEnvelope::message(r#"{"orderId":"42"}"#);

    let outcome = assert_ok!(
        dispatcher
            .dispatch_subscription("orders", Some("processing"), envelope, CancellationToken::new())
            .await
    );

    assert_eq!(outcome.handler, "process-order");
    assert_eq!(outcome.stage, Stage::Completed);
    assert_eq!(PROCESSED_ORDERS.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_empty_success_answers_200_with_empty_body() {
    let dispatcher = dispatcher();
    let req = hyper::Request::builder()
        .uri("/ping")
        .body(Full::new(Bytes::new()))
        .unwrap();

    let response = adapter::handle(&dispatcher, req, &HostConfig::new(), CancellationToken::new()).await;

    assert_eq!(response.status(), hyper::StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_request_failure_answers_500_with_marker_and_timestamp() {
    let dispatcher = dispatcher();
    let before = OffsetDateTime::now_utc();
    let outcome = dispatcher
        .dispatch_request("explode", FezzRequest::new(Method::Post, "/"), CancellationToken::new())
        .await;
    let after = OffsetDateTime::now_utc();

    assert_eq!(outcome.stage, Stage::ErrorResponded);
    assert!(!outcome.succeeded());

    let response = outcome.into_response();
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.text_body().unwrap().contains("boom"));

    let body: serde_json::Value = response.json_body().unwrap().unwrap();
    assert_eq!(body["error"], INTERNAL_ERROR_MARKER);
    assert_eq!(body["message"], "boom");
    let timestamp = OffsetDateTime::parse(body["timestamp"].as_str().unwrap(), &Rfc3339).unwrap();
    assert!(before <= timestamp && timestamp <= after);
}

#[tokio::test]
async fn test_request_panic_answers_500_with_marker() {
    let dispatcher = dispatcher();
    let outcome = dispatcher
        .dispatch_request("panicky", FezzRequest::new(Method::Get, "/"), CancellationToken::new())
        .await;

    assert_eq!(outcome.stage, Stage::ErrorResponded);
    let response = outcome.into_response();
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json_body().unwrap().unwrap();
    assert_eq!(body["error"], INTERNAL_ERROR_MARKER);
    assert!(body["message"].as_str().unwrap().contains("index out of bounds"));

    // The dispatcher survives and keeps answering over HTTP.
    let req = hyper::Request::builder()
        .uri("/panicky")
        .body(Full::new(Bytes::new()))
        .unwrap();
    let response = adapter::handle(&dispatcher, req, &HostConfig::new(), CancellationToken::new()).await;
    assert_eq!(response.status(), hyper::StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"], INTERNAL_ERROR_MARKER);
}

#[tokio::test]
async fn test_bad_payloads_never_reach_the_handler() {
    let dispatcher = dispatcher();
    let before = STRICT_CALLS.load(Ordering::SeqCst);

    for envelope in [
        InboundEnvelope::empty_message(),
        InboundEnvelope::message("   "),
        InboundEnvelope::message("null"),
        InboundEnvelope::message("{not json"),
        InboundEnvelope::message(r#"{"customerName":"no id"}"#),
    ] {
        let err = assert_err!(
            dispatcher
                .dispatch_message("strict-order", envelope, CancellationToken::new())
                .await
        );
        assert!(
            matches!(err, DispatchError::MessageDeserializationFailed { ref handler, .. } if handler == "strict-order"),
            "unexpected error: {err}"
        );
    }

    let err = assert_err!(
        dispatcher
            .dispatch_message("strict-order", InboundEnvelope::message("{not json"), CancellationToken::new())
            .await
    );
    assert_eq!(err.raw_payload(), Some("{not json"));

    assert_eq!(STRICT_CALLS.load(Ordering::SeqCst), before);
}

#[tokio::test]
async fn test_message_failure_is_resignalled() {
    let dispatcher = dispatcher();
    let envelope = InboundEnvelope::message(r#"{"orderId":"9","customerName":"Bob"}"#);

    let err = assert_err!(
        dispatcher
            .dispatch_message("reject-order", envelope, CancellationToken::new())
            .await
    );

    assert_eq!(REJECTED_ORDERS.load(Ordering::SeqCst), 1);
    assert_eq!(err.handler(), Some("reject-order"));
    match err {
        DispatchError::HandlerExecutionFailed { source, .. } => {
            assert_eq!(source.message, "customer Bob rejected")
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_payload_keys_match_case_insensitively() {
    let dispatcher = dispatcher();
    let request = FezzRequest::new(Method::Post, "/")
        .body(r#"{"ORDERID":"7","CustomerName":"Ada"}"#);

    let response = dispatcher
        .dispatch_request("echo-name", request, CancellationToken::new())
        .await
        .into_response();

    assert_eq!(response.status, StatusCode::OK);
    let body: serde_json::Value = response.json_body().unwrap().unwrap();
    assert_eq!(body["orderId"], "7");
    assert_eq!(body["customerName"], "Ada");
    assert_eq!(response.headers.get("Content-Type").map(String::as_str), Some(JsonCodec::CONTENT_TYPE));
}

#[tokio::test]
async fn test_route_precedence() {
    let settings = Settings::new()
        .with("Handlers:audit-order:Destination", "orders")
        .with("Messaging:Destination", "fallback")
        .with("Messaging:Group", "audit")
        .with("Messaging:Connection", "bus");
    let dispatcher = dispatcher_with(&settings);

    // Explicit metadata beats every configured value.
    let explicit = dispatcher.route("process-order").unwrap();
    assert_eq!(explicit.destination.as_deref(), Some("orders"));
    assert_eq!(explicit.group.as_deref(), Some("processing"));
    assert_eq!(explicit.connection, "bus");

    // Per-handler section, then global fallback.
    let configured = dispatcher.route("audit-order").unwrap();
    assert_eq!(configured.destination.as_deref(), Some("orders"));
    assert_eq!(configured.group.as_deref(), Some("audit"));

    let outcome = assert_ok!(
        dispatcher
            .dispatch_subscription(
                "orders",
                Some("audit"),
                InboundEnvelope::message(r#"{"orderId":"1"}"#),
                CancellationToken::new(),
            )
            .await
    );
    assert_eq!(outcome.handler, "audit-order");
}

#[test]
fn test_discovery_counts_and_isolates_failures() {
    let extra = StaticModule::new("extra")
        .plain("extra::Invoice")
        .abstract_type(StrictOrderHandler::type_info());
    let discovery = discover(&[&module(), &UnloadableModule, &extra], &Settings::new());

    assert_eq!(discovery.len(), 8);
    assert_eq!(discovery.failures.len(), 1);
    assert!(discovery.get("orders::OrderCreated").is_none());

    let again = discover(&[&module(), &UnloadableModule, &extra], &Settings::new());
    let ids = |d: &fezz_dispatch::registry::Discovery| {
        d.descriptors.iter().map(|h| h.type_id.clone()).collect::<Vec<_>>()
    };
    assert_eq!(ids(&discovery), ids(&again));
}

#[test]
fn test_macro_generated_identity() {
    assert_eq!(ProcessOrderHandler::NAME, "process-order");
    assert_eq!(EchoNameHandler::NAME, "echo-name");

    let route = <ProcessOrderHandler as MessageHandler>::route();
    assert_eq!(route.destination.as_deref(), Some("orders"));
    assert_eq!(route.connection, None);

    let info = PingHandler::type_info();
    assert!(info.qualifies());
    assert_eq!(info.type_id, "ping");
}

#[tokio::test]
async fn test_unknown_request_handler_answers_404() {
    let dispatcher = dispatcher();
    let req = hyper::Request::builder()
        .uri("/missing/anything")
        .body(Full::new(Bytes::new()))
        .unwrap();

    let response = adapter::handle(&dispatcher, req, &HostConfig::new(), CancellationToken::new()).await;
    assert_eq!(response.status(), hyper::StatusCode::NOT_FOUND);
}
