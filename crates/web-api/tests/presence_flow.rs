mod support;

use std::time::Duration;

use domain::{Identity, RoomId, UserId};
use serde_json::json;

use support::{
    connect, next_event_named, send_event, spawn_server, spawn_server_with_state, sync_point,
};

#[tokio::test]
async fn connect_and_disconnect_are_announced() {
    let url = spawn_server().await;

    let mut watcher = connect(&url).await;
    sync_point(&mut watcher, 1).await;

    let mut bob = connect(&url).await;
    send_event(&mut bob, json!({ "event": "authenticate", "data": { "userId": "u2" } })).await;
    sync_point(&mut bob, 2).await;

    // 新连接上线时其他连接收到 userOnline（此时还是连接级伪身份）
    let online = next_event_named(&mut watcher, "userOnline").await;
    assert!(online["data"]["userId"].is_string());

    bob.close(None).await.expect("close");

    // 下线通告带的是断开前解析出的身份
    let offline = next_event_named(&mut watcher, "userOffline").await;
    assert_eq!(offline["data"]["userId"], "u2");
}

#[tokio::test]
async fn disconnect_clears_room_membership() {
    let url = spawn_server().await;

    let mut alice = connect(&url).await;
    send_event(&mut alice, json!({ "event": "authenticate", "data": { "userId": "u1" } })).await;
    send_event(&mut alice, json!({ "event": "joinChat", "data": { "chatId": "r1" } })).await;
    sync_point(&mut alice, 1).await;

    let mut bob = connect(&url).await;
    send_event(&mut bob, json!({ "event": "authenticate", "data": { "userId": "u2" } })).await;
    send_event(&mut bob, json!({ "event": "joinChat", "data": { "chatId": "r1" } })).await;
    sync_point(&mut bob, 2).await;

    alice.close(None).await.expect("close");
    let offline = next_event_named(&mut bob, "userOffline").await;
    assert_eq!(offline["data"]["userId"], "u1");

    // 房间继续可用：Bob 发消息只会送达自己
    send_event(
        &mut bob,
        json!({ "event": "sendMessage", "data": { "chatId": "r1", "content": "anyone?", "ackId": 3 } }),
    )
    .await;
    let received = next_event_named(&mut bob, "receiveMessage").await;
    assert_eq!(received["data"]["content"], "anyone?");
    let ack = next_event_named(&mut bob, "ack").await;
    assert_eq!(ack["data"]["success"], true);
}

#[tokio::test]
async fn pre_auth_memberships_do_not_outlive_connection() {
    let (url, state) = spawn_server_with_state(5, Duration::from_millis(1000)).await;
    let room = RoomId::parse("r1").unwrap();
    let authenticated = Identity::Authenticated(UserId::parse("u1").unwrap());

    // 先以伪身份入房，再认证：成员关系必须迁移到新身份
    let mut alice = connect(&url).await;
    send_event(&mut alice, json!({ "event": "joinChat", "data": { "chatId": "r1" } })).await;
    send_event(&mut alice, json!({ "event": "authenticate", "data": { "userId": "u1" } })).await;
    sync_point(&mut alice, 1).await;

    assert!(state.membership.is_member(&authenticated, &room).await);
    assert_eq!(state.membership.members(&room).await.len(), 1);

    alice.close(None).await.expect("close");

    // 断开后两种身份都不留任何房间关联
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !state.membership.members(&room).await.is_empty() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "membership survived its owning connection: {:?}",
            state.membership.members(&room).await
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(state.membership.rooms_of(&authenticated).await.is_empty());
    assert_eq!(state.rate_limiter.current_count(&authenticated), 0);
}

#[tokio::test]
async fn authenticate_migrates_room_delivery_to_new_identity() {
    let url = spawn_server().await;

    // Alice 未认证就入房
    let mut alice = connect(&url).await;
    send_event(&mut alice, json!({ "event": "joinChat", "data": { "chatId": "r1" } })).await;
    send_event(&mut alice, json!({ "event": "authenticate", "data": { "userId": "u1" } })).await;
    sync_point(&mut alice, 1).await;

    let mut bob = connect(&url).await;
    send_event(&mut bob, json!({ "event": "authenticate", "data": { "userId": "u2" } })).await;
    send_event(&mut bob, json!({ "event": "joinChat", "data": { "chatId": "r1" } })).await;
    send_event(
        &mut bob,
        json!({ "event": "sendMessage", "data": { "chatId": "r1", "content": "hi", "ackId": 2 } }),
    )
    .await;

    // 迁移后的身份照常收到房间消息，且只收到一份
    let received = next_event_named(&mut alice, "receiveMessage").await;
    assert_eq!(received["data"]["content"], "hi");

    send_event(&mut alice, json!({ "event": "pingServer", "data": { "ackId": 3 } })).await;
    let before_ack = support::events_until_ack(&mut alice, 3).await;
    assert!(before_ack
        .iter()
        .all(|event| event["event"] != "receiveMessage"));
}

#[tokio::test]
async fn leave_chat_stops_room_delivery() {
    let url = spawn_server().await;

    let mut alice = connect(&url).await;
    send_event(&mut alice, json!({ "event": "authenticate", "data": { "userId": "u1" } })).await;
    send_event(&mut alice, json!({ "event": "joinChat", "data": { "chatId": "r1" } })).await;
    sync_point(&mut alice, 1).await;

    let mut bob = connect(&url).await;
    send_event(&mut bob, json!({ "event": "authenticate", "data": { "userId": "u2" } })).await;
    send_event(&mut bob, json!({ "event": "joinChat", "data": { "chatId": "r1" } })).await;
    send_event(&mut bob, json!({ "event": "leaveChat", "data": { "chatId": "r1" } })).await;
    sync_point(&mut bob, 2).await;

    send_event(
        &mut alice,
        json!({ "event": "sendMessage", "data": { "chatId": "r1", "content": "hi", "ackId": 3 } }),
    )
    .await;
    next_event_named(&mut alice, "ack").await;

    // Bob 已退出房间，ping 回执之前不应看到房间消息
    send_event(&mut bob, json!({ "event": "pingServer", "data": { "ackId": 4 } })).await;
    let before_ack = support::events_until_ack(&mut bob, 4).await;
    assert!(before_ack
        .iter()
        .all(|event| event["event"] != "receiveMessage"));
}
