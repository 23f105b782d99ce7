//! 实时聊天/在线状态核心领域模型
//!
//! 包含连接身份、用户画像快照、聊天消息等核心类型，
//! 以及 WebSocket 线上协议的事件定义。

pub mod errors;
pub mod events;
pub mod identity;
pub mod message;
pub mod profile;

// 重新导出常用类型
pub use errors::{DomainError, DomainResult, ErrorCode};
pub use events::{ClientEvent, MessagePayload, ServerEvent};
pub use identity::{ConnectionId, Identity, RoomId, UserId};
pub use message::{ChatMessage, MessageId, MessageStatus};
pub use profile::UserProfile;

/// 统一的时间戳类型。
pub type Timestamp = chrono::DateTime<chrono::Utc>;
