//! 消息持久化桥接口
//!
//! 消息与已读状态的持久存储是外部依赖，广播器只通过这个接口
//! 写入和更新，除身份缓存外不做任何缓存。

use async_trait::async_trait;
use domain::{ChatMessage, RoomId, UserId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage error: {message}")]
    Storage { message: String },
}

impl StoreError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// 持久化一条新消息，由存储侧分配 ID、时间戳与 sent 状态。
    async fn persist_message(
        &self,
        room_id: &RoomId,
        sender_id: &UserId,
        content: &str,
    ) -> Result<ChatMessage, StoreError>;

    /// 把房间内非该用户发送、当前为 sent 的消息推进为 read，
    /// 返回受影响的条数。
    async fn mark_messages_read(
        &self,
        room_id: &RoomId,
        excluding_user: &UserId,
    ) -> Result<u64, StoreError>;

    /// 按创建时间顺序返回房间内全部消息。
    async fn messages_in_room(&self, room_id: &RoomId) -> Result<Vec<ChatMessage>, StoreError>;
}
