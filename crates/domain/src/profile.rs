//! 用户画像快照
//!
//! 身份缓存保存的短期快照，来源是外部用户库。

use serde::{Deserialize, Serialize};

/// 用户画像快照（id / 姓名 / 邮箱 / 头像）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl UserProfile {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        email: Option<String>,
        avatar: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email,
            avatar,
        }
    }

    /// 用户库查不到时的兜底画像，保证消息广播不因此失败。
    pub fn unknown(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: "Unknown User".to_string(),
            email: None,
            avatar: None,
        }
    }
}
