use application::RateDecision;
use axum::extract::ws::{Message as WsMessage, WebSocket};
use domain::{
    ClientEvent, ConnectionId, ErrorCode, Identity, MessagePayload, RoomId, ServerEvent, UserId,
    UserProfile,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::state::AppState;

/// 单条 WebSocket 连接的处理循环。
///
/// 连接打开时铸造连接 ID 并注册到路由器，之后：
/// - 发送任务把路由器投递的服务端事件写入 socket
/// - 接收循环把客户端事件按到达顺序逐个处理
/// - 连接关闭时解绑身份、清除成员关系并通告下线
pub struct WebSocketConnection {
    state: AppState,
    connection_id: ConnectionId,
}

impl WebSocketConnection {
    pub async fn run(socket: WebSocket, state: AppState) {
        let connection_id = ConnectionId::generate();
        info!(connection_id = %connection_id, "WebSocket 连接已建立");

        let (event_tx, mut event_rx) = mpsc::unbounded_channel::<ServerEvent>();
        state.router.register_sender(connection_id, event_tx).await;

        // 上线通告发给除自己外的所有连接；此时身份还是连接级伪身份
        state
            .router
            .broadcast_except(
                connection_id,
                ServerEvent::UserOnline {
                    user_id: connection_id.to_string(),
                },
            )
            .await;

        let (mut ws_sender, mut ws_receiver) = socket.split();

        // 发送任务：统一处理所有对 socket 写端的访问
        let send_task = tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                let payload = match event.to_json() {
                    Ok(json) => json,
                    Err(err) => {
                        warn!(error = %err, "failed to serialize server event");
                        continue;
                    }
                };
                if ws_sender.send(WsMessage::Text(payload.into())).await.is_err() {
                    break;
                }
            }
            debug!("WebSocket发送任务结束");
        });

        let connection = Self {
            state,
            connection_id,
        };

        // 同一连接的事件严格串行处理：上一个事件（包括其中的存储
        // 与用户库等待点）完成后才取下一个，保证单连接内的因果顺序
        while let Some(Ok(message)) = ws_receiver.next().await {
            match message {
                WsMessage::Text(text) => connection.handle_text(text.as_str()).await,
                WsMessage::Close(_) => break,
                _ => {}
            }
        }

        connection.cleanup().await;
        // 注销后发送端全部释放，发送任务自然退出
        if let Err(err) = send_task.await {
            warn!(connection_id = %connection_id, error = %err, "send task aborted");
        }
        info!(connection_id = %connection_id, "WebSocket 连接已关闭");
    }

    async fn handle_text(&self, text: &str) {
        let event = match ClientEvent::from_json(text) {
            Ok(event) => event,
            Err(err) => {
                warn!(connection_id = %self.connection_id, error = %err, "malformed client event");
                self.reply(ServerEvent::error(
                    ErrorCode::GenericError,
                    "invalid event payload",
                ))
                .await;
                return;
            }
        };

        match event {
            ClientEvent::Authenticate { user_id } => self.handle_authenticate(user_id).await,
            ClientEvent::JoinChat { chat_id } => self.handle_join(chat_id).await,
            ClientEvent::LeaveChat { chat_id } => self.handle_leave(chat_id).await,
            ClientEvent::Typing { chat_id, user_name } => {
                self.handle_typing(chat_id, user_name, true).await
            }
            ClientEvent::StopTyping { chat_id, user_name } => {
                self.handle_typing(chat_id, user_name, false).await
            }
            ClientEvent::SendMessage {
                chat_id,
                content,
                ack_id,
            } => self.handle_send_message(chat_id, content, ack_id).await,
            ClientEvent::MarkMessagesRead { chat_id } => self.handle_mark_read(chat_id).await,
            ClientEvent::PingServer { ack_id } => self.handle_ping(ack_id).await,
        }
    }

    /// 把连接绑定到用户。userId 缺失或为空时静默忽略，只记日志。
    async fn handle_authenticate(&self, user_id: Option<String>) {
        let Some(raw) = user_id else {
            warn!(connection_id = %self.connection_id, "authenticate without userId ignored");
            return;
        };
        let user_id = match UserId::parse(raw) {
            Ok(user_id) => user_id,
            Err(_) => {
                warn!(connection_id = %self.connection_id, "authenticate with blank userId ignored");
                return;
            }
        };

        self.state
            .registry
            .bind(self.connection_id, user_id.clone())
            .await;
        info!(connection_id = %self.connection_id, user_id = %user_id, "connection authenticated");

        // 认证前以连接级伪身份加入的房间迁移到新身份，伪身份的
        // 限流配额一并丢弃，否则这些条目会在断开后残留
        let anonymous = Identity::Anonymous(self.connection_id);
        let rooms = self.state.membership.clear(&anonymous).await;
        if !rooms.is_empty() {
            let identity = Identity::Authenticated(user_id.clone());
            for room_id in rooms {
                self.state
                    .membership
                    .join(identity.clone(), room_id)
                    .await;
            }
        }
        self.state.rate_limiter.reset(&anonymous);

        // 画像预取是独立任务，与本连接后续事件没有顺序保证
        self.state.profile_cache.prefetch(user_id);
    }

    async fn handle_join(&self, chat_id: Option<String>) {
        let Some(room_id) = Self::parse_room(chat_id) else {
            warn!(connection_id = %self.connection_id, "joinChat without chatId ignored");
            return;
        };
        let identity = self.identity().await;
        self.state
            .membership
            .join(identity.clone(), room_id.clone())
            .await;
        debug!(identity = %identity, room_id = %room_id, "joined room");
    }

    async fn handle_leave(&self, chat_id: Option<String>) {
        let Some(room_id) = Self::parse_room(chat_id) else {
            warn!(connection_id = %self.connection_id, "leaveChat without chatId ignored");
            return;
        };
        let identity = self.identity().await;
        self.state.membership.leave(&identity, &room_id).await;
        debug!(identity = %identity, room_id = %room_id, "left room");
    }

    /// 输入提示：转发给房间内除发送者外的成员，不保留任何状态。
    async fn handle_typing(
        &self,
        chat_id: Option<String>,
        user_name: Option<String>,
        started: bool,
    ) {
        let Some(room_id) = Self::parse_room(chat_id) else {
            return;
        };
        let identity = self.identity().await;
        let user_name = user_name.unwrap_or_else(|| identity.to_string());

        let event = if started {
            ServerEvent::Typing {
                chat_id: room_id.as_str().to_string(),
                user_name,
            }
        } else {
            ServerEvent::StopTyping {
                chat_id: room_id.as_str().to_string(),
                user_name,
            }
        };
        self.broadcast_to_room(&room_id, event, Some(&identity))
            .await;
    }

    async fn handle_send_message(
        &self,
        chat_id: Option<String>,
        content: Option<String>,
        ack_id: Option<u64>,
    ) {
        let (Some(room_id), Some(content)) = (
            Self::parse_room(chat_id),
            content.filter(|c| !c.trim().is_empty()),
        ) else {
            self.reply(ServerEvent::error(
                ErrorCode::MissingFields,
                "chatId and content are required",
            ))
            .await;
            return;
        };

        let identity = self.identity().await;
        if self.state.rate_limiter.check_and_record(&identity) == RateDecision::Limited {
            self.reply(ServerEvent::error(
                ErrorCode::RateLimit,
                "message rate limit exceeded",
            ))
            .await;
            return;
        }

        let sender_id = identity.as_user_id();
        let profile = match self.state.profile_cache.get_profile(&sender_id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => UserProfile::unknown(sender_id.as_str()),
            Err(err) => {
                warn!(user_id = %sender_id, error = %err, "profile lookup failed, using fallback");
                UserProfile::unknown(sender_id.as_str())
            }
        };

        // 先持久化，成功后才广播
        let message = match self
            .state
            .store
            .persist_message(&room_id, &sender_id, &content)
            .await
        {
            Ok(message) => message,
            Err(err) => {
                warn!(room_id = %room_id, error = %err, "failed to persist message");
                self.reply(ServerEvent::error(
                    ErrorCode::GenericError,
                    "failed to send message",
                ))
                .await;
                return;
            }
        };

        let payload = MessagePayload {
            chat_id: room_id.as_str().to_string(),
            sender_id: sender_id.as_str().to_string(),
            sender: profile,
            content: message.content.clone(),
            created_at: message.created_at,
            status: message.status,
        };

        // 新消息发给包括发送者在内的全部房间成员
        self.broadcast_to_room(&room_id, ServerEvent::ReceiveMessage(payload.clone()), None)
            .await;

        if let Some(ack_id) = ack_id {
            self.reply(ServerEvent::send_ack(ack_id, payload)).await;
        }
    }

    async fn handle_mark_read(&self, chat_id: Option<String>) {
        let Some(room_id) = Self::parse_room(chat_id) else {
            self.reply(ServerEvent::error(
                ErrorCode::MissingFields,
                "chatId is required",
            ))
            .await;
            return;
        };

        let identity = self.identity().await;
        let user_id = identity.as_user_id();
        match self
            .state
            .store
            .mark_messages_read(&room_id, &user_id)
            .await
        {
            Ok(updated) => {
                debug!(room_id = %room_id, user_id = %user_id, updated, "messages marked read");
                self.broadcast_to_room(
                    &room_id,
                    ServerEvent::MessagesRead {
                        chat_id: room_id.as_str().to_string(),
                        user_id: user_id.as_str().to_string(),
                    },
                    None,
                )
                .await;
            }
            Err(err) => {
                warn!(room_id = %room_id, error = %err, "failed to mark messages read");
                self.reply(ServerEvent::error(
                    ErrorCode::GenericError,
                    "failed to mark messages read",
                ))
                .await;
            }
        }
    }

    /// 活性探测：只回给调用方，带服务器时间。
    async fn handle_ping(&self, ack_id: Option<u64>) {
        let Some(ack_id) = ack_id else {
            debug!(connection_id = %self.connection_id, "pingServer without ackId ignored");
            return;
        };
        self.reply(ServerEvent::pong(ack_id, self.state.clock.now()))
            .await;
    }

    /// 连接关闭时的清理，重复执行是无害的 no-op。
    async fn cleanup(&self) {
        // 下线通告要带解绑前解析出的身份
        let identity = self.identity().await;
        self.state.registry.unbind(self.connection_id).await;
        let mut rooms = self.state.membership.clear(&identity).await;
        self.state.rate_limiter.reset(&identity);

        // 连接级伪身份的条目同样不允许比连接活得久
        let anonymous = Identity::Anonymous(self.connection_id);
        if identity != anonymous {
            rooms.extend(self.state.membership.clear(&anonymous).await);
            self.state.rate_limiter.reset(&anonymous);
        }

        self.state.router.unregister_sender(self.connection_id).await;

        self.state
            .router
            .broadcast_except(
                self.connection_id,
                ServerEvent::UserOffline {
                    user_id: identity.to_string(),
                },
            )
            .await;

        info!(
            connection_id = %self.connection_id,
            identity = %identity,
            rooms_left = rooms.len(),
            "connection cleaned up"
        );
    }

    /// 只回发给本连接（错误与回执的唯一出口）。
    async fn reply(&self, event: ServerEvent) {
        self.state
            .router
            .route_to_connection(self.connection_id, event)
            .await;
    }

    async fn identity(&self) -> Identity {
        self.state.registry.resolve(self.connection_id).await
    }

    /// 按成员关系向房间广播；exclude 用于输入提示这类不回发
    /// 发送者的事件。
    async fn broadcast_to_room(
        &self,
        room_id: &RoomId,
        event: ServerEvent,
        exclude: Option<&Identity>,
    ) {
        let members = self.state.membership.members(room_id).await;
        let mut targets = Vec::with_capacity(members.len());
        for member in &members {
            if Some(member) == exclude {
                continue;
            }
            if let Some(connection_id) = self.state.registry.connection_for(member).await {
                targets.push(connection_id);
            }
        }
        self.state.router.route_to_connections(&targets, event).await;
    }

    fn parse_room(chat_id: Option<String>) -> Option<RoomId> {
        chat_id.and_then(|raw| RoomId::parse(raw).ok())
    }
}
