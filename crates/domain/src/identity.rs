//! 连接与用户身份类型
//!
//! 上游用户库签发不透明的字符串 ID，连接 ID 则由服务端在
//! socket 打开时铸造。`Identity` 把"已认证用户"和"未认证连接"
//! 统一成一个带标签的联合类型，作为房间成员关系和限流的键。

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DomainError;

/// 用户唯一标识（外部用户库签发的不透明字符串）。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn parse(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into().trim().to_owned();
        if value.is_empty() {
            return Err(DomainError::invalid_argument("user_id", "cannot be empty"));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 聊天室唯一标识。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomId(String);

impl RoomId {
    pub fn parse(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into().trim().to_owned();
        if value.is_empty() {
            return Err(DomainError::invalid_argument("room_id", "cannot be empty"));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 连接唯一标识，socket 打开时创建，关闭时销毁，不做持久化。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ConnectionId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

/// 连接当前代表的身份。
///
/// 未认证的连接以自身的连接 ID 作为伪身份参与限流和房间成员
/// 关系，认证后被绑定到持久的用户 ID（同一用户以最后一次认证
/// 的连接为准）。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    /// 已通过 authenticate 事件绑定到用户
    Authenticated(UserId),
    /// 未认证，以连接 ID 作为伪身份
    Anonymous(ConnectionId),
}

impl Identity {
    /// 身份是否已绑定到持久用户。
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Identity::Authenticated(_))
    }

    /// 已认证身份对应的用户 ID。
    pub fn user_id(&self) -> Option<&UserId> {
        match self {
            Identity::Authenticated(user_id) => Some(user_id),
            Identity::Anonymous(_) => None,
        }
    }

    /// 以用户 ID 形式呈现该身份；未认证连接得到连接范围的伪用户 ID。
    pub fn as_user_id(&self) -> UserId {
        match self {
            Identity::Authenticated(user_id) => user_id.clone(),
            Identity::Anonymous(connection_id) => UserId(connection_id.to_string()),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Authenticated(user_id) => write!(f, "{user_id}"),
            Identity::Anonymous(connection_id) => write!(f, "{connection_id}"),
        }
    }
}
