//! End-to-end relay test
//!
//! Serves the full app on an ephemeral port and talks to it with
//! `tokio-tungstenite` clients.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use pretty_assertions::assert_eq;
use relayhub::backend::broker::MemoryBroker;
use relayhub::backend::server::create_app_with_broker;
use relayhub::shared::{BrokerMessage, RelayConfig, RelayEvent};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::common::{frame, DELIVERY_TIMEOUT};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn serve() -> SocketAddr {
    let app = create_app_with_broker(RelayConfig::default(), Arc::new(MemoryBroker::new())).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn client(addr: SocketAddr, path: &str) -> Client {
    let (socket, _) = connect_async(format!("ws://{}{}", addr, path)).await.unwrap();
    socket
}

async fn send(client: &mut Client, text: String) {
    client.send(Message::Text(text.into())).await.unwrap();
}

async fn recv(client: &mut Client) -> String {
    loop {
        let message = timeout(DELIVERY_TIMEOUT, client.next())
            .await
            .expect("frame within timeout")
            .expect("socket open")
            .unwrap();
        if let Message::Text(text) = message {
            return text.as_str().to_owned();
        }
    }
}

#[tokio::test]
async fn test_guest_message_reaches_staff_socket() {
    let addr = serve().await;

    let mut staff = client(addr, "/chat/business/store-1").await;
    let subscribe = frame("subscribe", "location:1", "");
    send(&mut staff, subscribe.clone()).await;
    assert_eq!(recv(&mut staff).await, subscribe);

    let mut guest = client(addr, "/chat/user/guest-9").await;
    let join = frame("join", "guest:9", "");
    send(&mut guest, join.clone()).await;
    assert_eq!(recv(&mut guest).await, join);
    send(&mut guest, frame("subscribe", "location:1", "")).await;
    let _ = recv(&mut guest).await;

    let message = frame("message", "guest:9", "table 4 needs water");
    send(&mut guest, message.clone()).await;

    let delivered: BrokerMessage = serde_json::from_str(&recv(&mut staff).await).unwrap();
    assert_eq!(delivered, BrokerMessage::new("location:1", message.clone()));

    send(&mut guest, frame("ping", "", "")).await;
    // The guest hears its own message on both channels before the pong.
    let mut pong = None;
    for _ in 0..3 {
        let text = recv(&mut guest).await;
        if let Ok(event) = RelayEvent::decode(&text) {
            if event.event == "ping" {
                pong = Some(event);
                break;
            }
        }
    }
    assert_eq!(pong.map(|e| e.payload).as_deref(), Some("pong"));
}

#[tokio::test]
async fn test_binary_subscribe_echoed_as_binary() {
    let addr = serve().await;
    let mut socket = client(addr, "/chat/user/alice").await;
    let subscribe = frame("subscribe", "location:1", "");
    socket
        .send(Message::Binary(subscribe.clone().into_bytes().into()))
        .await
        .unwrap();

    let echo = timeout(DELIVERY_TIMEOUT, socket.next())
        .await
        .expect("frame within timeout")
        .expect("socket open")
        .unwrap();
    match echo {
        Message::Binary(data) => assert_eq!(data.as_ref(), subscribe.as_bytes()),
        other => panic!("expected binary echo, got {:?}", other),
    }
}

#[tokio::test]
async fn test_stats_track_open_sockets() {
    let addr = serve().await;
    let mut socket = client(addr, "/chat/user/alice").await;
    send(&mut socket, frame("ping", "", "")).await;
    let _ = recv(&mut socket).await;

    let stats = http_get(addr, "/api/v1/ws/stats").await;
    assert!(stats.contains("\"connections\":1"), "{}", stats);
    assert!(stats.contains("alice"), "{}", stats);
}

async fn http_get(addr: SocketAddr, path: &str) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n", path, addr);
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}
