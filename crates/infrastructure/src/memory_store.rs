//! 内存消息存储
//!
//! ChatStore 的内存实现，按房间保存消息列表。进程内开发与测试
//! 用，消息不跨重启存活。

use std::collections::HashMap;
use std::sync::Arc;

use application::{ChatStore, StoreError};
use async_trait::async_trait;
use domain::{ChatMessage, MessageStatus, RoomId, UserId};
use tokio::sync::RwLock;
use tracing::debug;

pub struct InMemoryChatStore {
    /// 房间到消息列表的映射，列表按写入顺序即创建时间顺序
    messages: Arc<RwLock<HashMap<RoomId, Vec<ChatMessage>>>>,
}

impl Default for InMemoryChatStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryChatStore {
    pub fn new() -> Self {
        Self {
            messages: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl ChatStore for InMemoryChatStore {
    async fn persist_message(
        &self,
        room_id: &RoomId,
        sender_id: &UserId,
        content: &str,
    ) -> Result<ChatMessage, StoreError> {
        let message = ChatMessage::new(
            room_id.clone(),
            sender_id.clone(),
            content,
            chrono::Utc::now(),
        )
        .map_err(|err| StoreError::storage(err.to_string()))?;

        let mut messages = self.messages.write().await;
        messages
            .entry(room_id.clone())
            .or_default()
            .push(message.clone());

        debug!(room_id = %room_id, message_id = %message.id, "message persisted");
        Ok(message)
    }

    async fn mark_messages_read(
        &self,
        room_id: &RoomId,
        excluding_user: &UserId,
    ) -> Result<u64, StoreError> {
        let mut messages = self.messages.write().await;
        let Some(room_messages) = messages.get_mut(room_id) else {
            return Ok(0);
        };

        let mut updated = 0u64;
        for message in room_messages.iter_mut() {
            if message.sender_id != *excluding_user && message.status == MessageStatus::Sent {
                message
                    .mark_read()
                    .map_err(|err| StoreError::storage(err.to_string()))?;
                updated += 1;
            }
        }

        debug!(room_id = %room_id, updated, "messages marked as read");
        Ok(updated)
    }

    async fn messages_in_room(&self, room_id: &RoomId) -> Result<Vec<ChatMessage>, StoreError> {
        let messages = self.messages.read().await;
        Ok(messages.get(room_id).cloned().unwrap_or_default())
    }
}
