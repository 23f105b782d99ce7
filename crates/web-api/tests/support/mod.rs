#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use application::{
    ConnectionRegistry, MessageRateLimiter, ProfileCache, RoomMembershipTracker, SystemClock,
    UserDirectory,
};
use domain::UserProfile;
use futures_util::{SinkExt, StreamExt};
use infrastructure::{ConnectionRouter, InMemoryChatStore, InMemoryUserDirectory};
use tokio::net::TcpListener;
use tokio_tungstenite::{
    connect_async, tungstenite::Message as TungsteniteMessage, MaybeTlsStream, WebSocketStream,
};
use web_api::{router, AppState};

pub type WsClient = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// 起一个预置了 u1/u2 画像的测试服务，返回 WebSocket 地址。
pub async fn spawn_server() -> String {
    spawn_server_with_limit(5, Duration::from_millis(1000)).await
}

pub async fn spawn_server_with_limit(max_messages: u32, window: Duration) -> String {
    let (url, _state) = spawn_server_with_state(max_messages, window).await;
    url
}

/// 同上，但把共享状态句柄一并返回，供测试检查服务内部的表。
pub async fn spawn_server_with_state(max_messages: u32, window: Duration) -> (String, AppState) {
    let directory: Arc<dyn UserDirectory> = Arc::new(
        InMemoryUserDirectory::with_users([
            UserProfile::new("u1", "Alice", Some("alice@example.com".to_string()), None),
            UserProfile::new("u2", "Bob", None, None),
        ])
        .await
        .expect("seed users"),
    );

    let state = AppState::new(
        Arc::new(ConnectionRegistry::new()),
        Arc::new(RoomMembershipTracker::new()),
        Arc::new(MessageRateLimiter::new(max_messages, window)),
        ProfileCache::new(directory, Duration::from_secs(300)),
        Arc::new(InMemoryChatStore::new()),
        Arc::new(ConnectionRouter::new()),
        Arc::new(SystemClock),
    );

    let app = router(state.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service()).await.ok();
    });

    (format!("ws://{addr}/api/v1/ws"), state)
}

pub async fn connect(url: &str) -> WsClient {
    let (stream, _) = connect_async(url).await.expect("websocket connect");
    stream
}

pub async fn send_event(client: &mut WsClient, event: serde_json::Value) {
    client
        .send(TungsteniteMessage::Text(event.to_string().into()))
        .await
        .expect("send event");
}

/// 读事件直到拿到指定名字的那个，其余事件丢弃。
pub async fn next_event_named(client: &mut WsClient, event_name: &str) -> serde_json::Value {
    tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(Ok(message)) = client.next().await {
            if let TungsteniteMessage::Text(text) = message {
                let value: serde_json::Value = serde_json::from_str(&text).expect("event json");
                if value["event"] == event_name {
                    return value;
                }
            }
        }
        panic!("connection closed before receiving {event_name}");
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {event_name}"))
}

/// 读下一个文本事件，不限名字。
pub async fn next_any_event(client: &mut WsClient) -> serde_json::Value {
    tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(Ok(message)) = client.next().await {
            if let TungsteniteMessage::Text(text) = message {
                return serde_json::from_str(&text).expect("event json");
            }
        }
        panic!("connection closed before receiving an event");
    })
    .await
    .expect("timed out waiting for an event")
}

/// 通过一次 ping 回执确认此前发出的事件都已处理完
/// （同连接事件严格按序处理）。
pub async fn sync_point(client: &mut WsClient, ack_id: u64) {
    send_event(
        client,
        serde_json::json!({ "event": "pingServer", "data": { "ackId": ack_id } }),
    )
    .await;
    let ack = next_event_named(client, "ack").await;
    assert_eq!(ack["data"]["ackId"], ack_id);
}

/// 收集事件直到读到指定 ackId 的回执为止，返回回执之前的事件。
pub async fn events_until_ack(client: &mut WsClient, ack_id: u64) -> Vec<serde_json::Value> {
    let mut seen = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(Ok(message)) = client.next().await {
            if let TungsteniteMessage::Text(text) = message {
                let value: serde_json::Value = serde_json::from_str(&text).expect("event json");
                if value["event"] == "ack" && value["data"]["ackId"] == ack_id {
                    return;
                }
                seen.push(value);
            }
        }
        panic!("connection closed before ack {ack_id}");
    })
    .await
    .expect("timed out waiting for ack");
    seen
}
