//! Publish endpoint tests

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use pretty_assertions::assert_eq;
use relayhub::backend::broker::Broker;
use relayhub::backend::server::create_app_with_broker;
use relayhub::shared::{RelayConfig, RelayEvent};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::common::RecordingBroker;

fn app(broker: &RecordingBroker) -> Router {
    create_app_with_broker(RelayConfig::default(), Arc::new(broker.clone())).unwrap()
}

fn post(uri: &str, identity: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(identity) = identity {
        builder = builder.header("x-user-id", identity);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn order_body(channels: &[&str]) -> String {
    json!({
        "event": "message",
        "channels": channels,
        "payload": "order 42 ready",
        "subject": "order",
        "uuid": "staff-1",
    })
    .to_string()
}

#[tokio::test]
async fn test_order_publish_fans_out() {
    let broker = RecordingBroker::new();
    let mut sub = broker
        .memory()
        .subscribe(&["guest:1".to_string(), "guest:2".to_string()])
        .await
        .unwrap();
    let mut rx = sub.take_messages().unwrap();

    let response = app(&broker)
        .oneshot(post(
            "/api/v1/ui/order/publish/staff-1",
            Some("staff-1"),
            &order_body(&["guest:1", "guest:2"]),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({ "result": "OK" }));
    for channel in ["guest:1", "guest:2"] {
        let event = RelayEvent::decode(&rx.recv().await.unwrap().payload).unwrap();
        assert_eq!(event.channel, channel);
        assert_eq!(event.subject, "order");
    }
}

#[tokio::test]
async fn test_order_publish_requires_identity() {
    let broker = RecordingBroker::new();
    let response = app(&broker)
        .oneshot(post("/api/v1/ui/order/publish/staff-1", None, &order_body(&["a"])))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["status"], 401);
    assert_eq!(broker.publish_calls(), 0);
}

#[tokio::test]
async fn test_order_publish_rejects_other_publisher() {
    let broker = RecordingBroker::new();
    let response = app(&broker)
        .oneshot(post("/api/v1/ui/order/publish/staff-1", Some("staff-2"), &order_body(&["a"])))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(broker.publish_calls(), 0);
}

#[tokio::test]
async fn test_order_publish_rejects_malformed_body() {
    let broker = RecordingBroker::new();
    let response = app(&broker)
        .oneshot(post("/api/v1/ui/order/publish/staff-1", Some("staff-1"), "{\"channels\": 3"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(broker.publish_calls(), 0);
}

#[tokio::test]
async fn test_order_publish_broker_failure_is_bad_gateway() {
    let broker = RecordingBroker::new();
    broker.fail_publish_on("b");
    let response = app(&broker)
        .oneshot(post(
            "/api/v1/ui/order/publish/staff-1",
            Some("staff-1"),
            &order_body(&["a", "b", "c"]),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(broker.attempted_channels(), vec!["a", "b"]);
}

#[tokio::test]
async fn test_channel_publish_unknown_channel_is_not_found() {
    let broker = RecordingBroker::new();
    let body = RelayEvent::new("message", "guest:404", "hi").to_json().unwrap();
    let response = app(&broker)
        .oneshot(post("/api/v1/ui/channel/publish/staff-1", Some("staff-1"), &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(broker.publish_calls(), 0);
}

#[tokio::test]
async fn test_channel_publish_live_channel() {
    let broker = RecordingBroker::new();
    let mut sub = broker.memory().subscribe(&["guest:1".to_string()]).await.unwrap();
    let mut rx = sub.take_messages().unwrap();

    let event = RelayEvent::new("message", "guest:1", "hi").with_subject("order");
    let response = app(&broker)
        .oneshot(post(
            "/api/v1/ui/channel/publish/staff-1",
            Some("staff-1"),
            &event.to_json().unwrap(),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(RelayEvent::decode(&rx.recv().await.unwrap().payload).unwrap(), event);
}

#[tokio::test]
async fn test_channel_publish_requires_channel() {
    let broker = RecordingBroker::new();
    let response = app(&broker)
        .oneshot(post(
            "/api/v1/ui/channel/publish/staff-1",
            Some("staff-1"),
            r#"{"event":"message","payload":"hi"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
