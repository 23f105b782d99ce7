//! 聊天消息实体
//!
//! 消息本体由外部持久化桥负责存取，这里只定义形状与状态机。

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DomainError;
use crate::identity::{RoomId, UserId};
use crate::Timestamp;

/// 消息唯一标识。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub Uuid);

impl MessageId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 消息投递状态，只允许单向推进。
///
/// delivered 在当前流转里建模但未被使用，状态实际只走 sent → read。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sent,
    Delivered,
    Read,
}

impl MessageStatus {
    fn rank(self) -> u8 {
        match self {
            MessageStatus::Sent => 0,
            MessageStatus::Delivered => 1,
            MessageStatus::Read => 2,
        }
    }
}

/// 一条聊天消息：属于唯一房间，有唯一发送者，内容不可变。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub room_id: RoomId,
    pub sender_id: UserId,
    pub content: String,
    pub status: MessageStatus,
    pub created_at: Timestamp,
}

impl ChatMessage {
    pub fn new(
        room_id: RoomId,
        sender_id: UserId,
        content: impl Into<String>,
        created_at: Timestamp,
    ) -> Result<Self, DomainError> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(DomainError::invalid_argument("content", "cannot be empty"));
        }
        Ok(Self {
            id: MessageId::generate(),
            room_id,
            sender_id,
            content,
            status: MessageStatus::Sent,
            created_at,
        })
    }

    /// 推进投递状态；回退是领域错误。
    pub fn transition_to(&mut self, next: MessageStatus) -> Result<(), DomainError> {
        if next.rank() < self.status.rank() {
            return Err(DomainError::InvalidStatusTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    pub fn mark_read(&mut self) -> Result<(), DomainError> {
        self.transition_to(MessageStatus::Read)
    }
}
