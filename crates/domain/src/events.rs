//! WebSocket 线上协议事件
//!
//! 入站（客户端→服务端）与出站（服务端→客户端）事件的统一定义。
//! 入站事件的载荷字段一律是 Option，必填校验放在广播器的处理函数
//! 里完成，这样缺字段能映射成 MISSING_FIELDS 错误而不是解析失败。

use serde::{Deserialize, Serialize};

use crate::errors::ErrorCode;
use crate::message::MessageStatus;
use crate::profile::UserProfile;
use crate::Timestamp;

/// 客户端发来的事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ClientEvent {
    /// 把连接绑定到持久用户；userId 为空时静默忽略
    Authenticate { user_id: Option<String> },
    /// 加入房间
    JoinChat { chat_id: Option<String> },
    /// 离开房间
    LeaveChat { chat_id: Option<String> },
    /// 正在输入提示，不保留状态
    Typing {
        chat_id: Option<String>,
        user_name: Option<String>,
    },
    /// 停止输入提示
    StopTyping {
        chat_id: Option<String>,
        user_name: Option<String>,
    },
    /// 发送消息；ackId 存在时要求回执
    SendMessage {
        chat_id: Option<String>,
        content: Option<String>,
        ack_id: Option<u64>,
    },
    /// 把房间内他人发的 sent 消息标记为已读
    MarkMessagesRead { chat_id: Option<String> },
    /// 活性探测，回执携带服务器时间
    PingServer { ack_id: Option<u64> },
}

impl ClientEvent {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// receiveMessage 事件及发送回执共用的消息载荷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    pub chat_id: String,
    pub sender_id: String,
    pub sender: UserProfile,
    pub content: String,
    pub created_at: Timestamp,
    pub status: MessageStatus,
}

/// 服务端下发的事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// 新连接上线（广播给其他所有连接）
    UserOnline { user_id: String },
    /// 连接下线（广播给其他所有连接）
    UserOffline { user_id: String },
    /// 房间内有人正在输入（不发给发送者）
    Typing { chat_id: String, user_name: String },
    /// 房间内有人停止输入（不发给发送者）
    StopTyping { chat_id: String, user_name: String },
    /// 新消息（发给包括发送者在内的全部房间成员）
    ReceiveMessage(MessagePayload),
    /// 某用户已读该房间消息（发给全部房间成员）
    MessagesRead { chat_id: String, user_id: String },
    /// 请求回执；sendMessage 带消息体，pingServer 带服务器时间
    Ack {
        ack_id: u64,
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<MessagePayload>,
        #[serde(skip_serializing_if = "Option::is_none")]
        server_time: Option<Timestamp>,
    },
    /// 结构化错误，只回发给出错的连接
    Error { message: String, code: ErrorCode },
}

impl ServerEvent {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            code,
        }
    }

    pub fn send_ack(ack_id: u64, message: MessagePayload) -> Self {
        Self::Ack {
            ack_id,
            success: true,
            message: Some(message),
            server_time: None,
        }
    }

    pub fn pong(ack_id: u64, server_time: Timestamp) -> Self {
        Self::Ack {
            ack_id,
            success: true,
            message: None,
            server_time: Some(server_time),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
