//! 领域模型错误定义

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 领域模型错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// 参数验证失败
    #[error("invalid argument: {field}: {reason}")]
    InvalidArgument { field: String, reason: String },

    /// 消息状态只能单向推进（sent → delivered → read）
    #[error("invalid status transition: {from:?} -> {to:?}")]
    InvalidStatusTransition {
        from: crate::message::MessageStatus,
        to: crate::message::MessageStatus,
    },
}

impl DomainError {
    pub fn invalid_argument(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// 领域模型结果类型
pub type DomainResult<T> = Result<T, DomainError>;

/// 下发给客户端的错误码
///
/// 所有错误只回发给出错的连接本身，绝不广播。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// 必填字段缺失
    MissingFields,
    /// 发送方超过消息速率限制
    RateLimit,
    /// 未分类错误
    GenericError,
}
