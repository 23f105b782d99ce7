//! 外部用户库接口
//!
//! 用户账号的权威来源在核心之外，这里只消费"按 ID 取画像"。

use async_trait::async_trait;
use domain::{UserId, UserProfile};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("user directory unavailable: {message}")]
    Unavailable { message: String },
}

impl DirectoryError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

/// 用户库查询接口；查不到用户返回 Ok(None)。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn fetch_user_profile(
        &self,
        user_id: &UserId,
    ) -> Result<Option<UserProfile>, DirectoryError>;
}
