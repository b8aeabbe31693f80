//! Relay router tests

use std::sync::Arc;

use futures_util::stream;
use pretty_assertions::assert_eq;
use relayhub::backend::realtime::{CloseReason, Connection, InboundFrame, RelayError, RelayRouter};
use relayhub::shared::{RelayConfig, RelayEvent};

use crate::common::{frame, RecordingBroker, RecordingSink};

struct Session {
    broker: RecordingBroker,
    sink: RecordingSink,
    router: RelayRouter,
    connection: Connection,
}

async fn session(config: RelayConfig) -> Session {
    let broker = RecordingBroker::new();
    let sink = RecordingSink::new();
    let router = RelayRouter::new(Arc::new(broker.clone()), &config);
    let connection = Connection::connect(&broker, "store-1", Arc::new(sink.clone()))
        .await
        .unwrap();
    Session {
        broker,
        sink,
        router,
        connection,
    }
}

fn frames(raw: Vec<String>) -> impl futures_util::Stream<Item = Result<String, RelayError>> + Unpin + Send {
    stream::iter(raw.into_iter().map(Ok))
}

#[tokio::test]
async fn test_guest_message_published_then_mirrored() {
    let mut s = session(RelayConfig::default()).await;
    for channel in ["location:1", "guest:9", "location:2"] {
        s.connection.subscribe(&s.broker, channel).await.unwrap();
    }

    let raw = frame("message", "guest:9", "table 4 needs water");
    s.router.dispatch(&mut s.connection, &raw).await.unwrap();

    assert_eq!(s.broker.attempted_channels(), vec!["guest:9", "location:1", "location:2"]);
}

#[tokio::test]
async fn test_mirror_uses_configured_prefixes() {
    let config = RelayConfig::builder()
        .guest_prefix("visitor")
        .staff_prefix("desk")
        .build()
        .unwrap();
    let mut s = session(config).await;
    for channel in ["desk:1", "location:1", "visitor:3"] {
        s.connection.subscribe(&s.broker, channel).await.unwrap();
    }

    s.router
        .dispatch(&mut s.connection, &frame("message", "visitor:3", "hi"))
        .await
        .unwrap();
    assert_eq!(s.broker.attempted_channels(), vec!["visitor:3", "desk:1"]);

    s.router
        .dispatch(&mut s.connection, &frame("message", "guest:3", "hi"))
        .await
        .unwrap();
    assert_eq!(s.broker.attempted_channels(), vec!["visitor:3", "desk:1", "guest:3"]);
}

#[tokio::test]
async fn test_publish_failure_skips_mirror_and_ends_session() {
    let s = session(RelayConfig::default()).await;
    s.broker.fail_publish_on("guest:9");

    let reason = s
        .router
        .run(
            s.connection,
            frames(vec![
                frame("subscribe", "location:1", ""),
                frame("message", "guest:9", "lost"),
                frame("subscribe", "location:2", ""),
            ]),
        )
        .await;

    assert!(matches!(reason, CloseReason::Fatal(_)));
    assert_eq!(s.broker.attempted_channels(), vec!["guest:9"]);
    // connect + first subscribe; the frame after the failure is never read
    assert_eq!(s.broker.subscribe_calls(), 2);
    assert_eq!(s.broker.memory().subscription_count(), 0);
}

#[tokio::test]
async fn test_ping_uses_configured_pong_payload() {
    let config = RelayConfig::builder().pong_payload("alive").build().unwrap();
    let mut s = session(config).await;

    let ping = RelayEvent::new("ping", "", "").with_uuid("client-7");
    s.router
        .dispatch(&mut s.connection, &ping.to_json().unwrap())
        .await
        .unwrap();

    let frames = s.sink.wait_for(1).await;
    let pong = RelayEvent::decode(&frames[0]).unwrap();
    assert_eq!(pong, ping.pong("alive"));
    assert_eq!(s.broker.publish_calls(), 0);
}

#[tokio::test]
async fn test_pong_write_failure_is_fatal() {
    let mut s = session(RelayConfig::default()).await;
    s.sink.set_failing(true);
    let result = s.router.dispatch(&mut s.connection, &frame("ping", "", "")).await;
    assert!(matches!(result, Err(RelayError::Socket(_))));
}

#[tokio::test]
async fn test_subscribe_echo_failure_is_not_fatal() {
    let mut s = session(RelayConfig::default()).await;
    s.sink.set_failing(true);
    s.router
        .dispatch(&mut s.connection, &frame("join", "location:1", ""))
        .await
        .unwrap();
    assert_eq!(s.connection.channels(), &["location:1".to_string()]);
}

#[tokio::test]
async fn test_session_delivers_between_sockets() {
    let broker = RecordingBroker::new();
    let router = RelayRouter::new(Arc::new(broker.clone()), &RelayConfig::default());

    let staff_sink = RecordingSink::new();
    let mut staff = Connection::connect(&broker, "staff", Arc::new(staff_sink.clone()))
        .await
        .unwrap();
    router
        .dispatch(&mut staff, &frame("subscribe", "location:1", ""))
        .await
        .unwrap();

    let guest_sink = RecordingSink::new();
    let guest = Connection::connect(&broker, "guest", Arc::new(guest_sink.clone()))
        .await
        .unwrap();
    let raw = frame("message", "location:1", "order up");
    let reason = router.run(guest, frames(vec![raw.clone()])).await;
    assert_eq!(reason, CloseReason::PeerClosed);

    // subscribe echo, then the guest's message
    let received = staff_sink.wait_for(2).await;
    let message = crate::common::delivered(&received[1]);
    assert_eq!(message.channel, "location:1");
    assert_eq!(message.payload, raw);
    assert!(guest_sink.frames().is_empty());

    staff.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_unsubscribe_failure_is_fatal_and_still_closes() {
    let mut s = session(RelayConfig::default()).await;
    s.connection.subscribe(&s.broker, "location:1").await.unwrap();
    s.broker.fail_unsubscribe(true);
    let closes = s.broker.close_calls();

    let reason = s
        .router
        .run(s.connection, frames(vec![frame("subscribe", "location:2", "")]))
        .await;

    assert!(matches!(reason, CloseReason::Fatal(e) if e.contains("unsubscribe failed")));
    assert_eq!(s.broker.close_calls(), closes + 1);
    assert_eq!(s.broker.memory().subscription_count(), 0);
    assert!(s.sink.frames().is_empty());
}

#[tokio::test]
async fn test_close_failure_is_retried_on_disconnect() {
    let mut s = session(RelayConfig::default()).await;
    s.connection.subscribe(&s.broker, "location:1").await.unwrap();
    s.broker.fail_close(true);
    let (unsubscribes, closes) = (s.broker.unsubscribe_calls(), s.broker.close_calls());

    let reason = s
        .router
        .run(s.connection, frames(vec![frame("subscribe", "location:2", "")]))
        .await;

    assert!(matches!(reason, CloseReason::Fatal(_)));
    // the failed handle is torn down again by the session's disconnect
    assert_eq!(s.broker.unsubscribe_calls(), unsubscribes + 2);
    assert_eq!(s.broker.close_calls(), closes + 2);
    assert_eq!(s.broker.memory().subscription_count(), 0);
}

#[tokio::test]
async fn test_binary_subscribe_echoed_as_binary() {
    let s = session(RelayConfig::default()).await;
    let binary = frame("subscribe", "location:1", "");
    let text = frame("subscribe", "location:2", "");

    let reason = s
        .router
        .run(
            s.connection,
            stream::iter(vec![
                Ok(InboundFrame::Binary(binary.clone())),
                Ok(InboundFrame::Text(text.clone())),
            ]),
        )
        .await;

    assert_eq!(reason, CloseReason::PeerClosed);
    assert_eq!(s.sink.frames(), vec![binary, text]);
    assert_eq!(s.sink.binary_positions(), vec![0]);
}
