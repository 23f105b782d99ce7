//! 内存用户库
//!
//! UserDirectory 的内存实现，开发与测试时预置用户画像。生产
//! 部署里这个位置接真实的用户服务。

use std::collections::HashMap;
use std::sync::Arc;

use application::{DirectoryError, UserDirectory};
use async_trait::async_trait;
use domain::{DomainError, UserId, UserProfile};
use tokio::sync::RwLock;

pub struct InMemoryUserDirectory {
    users: Arc<RwLock<HashMap<UserId, UserProfile>>>,
}

impl Default for InMemoryUserDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// 预置一批用户；任何一条画像的 id 非法都是错误。
    pub async fn with_users(
        profiles: impl IntoIterator<Item = UserProfile>,
    ) -> Result<Self, DomainError> {
        let directory = Self::new();
        for profile in profiles {
            directory.insert(profile).await?;
        }
        Ok(directory)
    }

    pub async fn insert(&self, profile: UserProfile) -> Result<(), DomainError> {
        let user_id = UserId::parse(&profile.id)?;
        let mut users = self.users.write().await;
        users.insert(user_id, profile);
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn fetch_user_profile(
        &self,
        user_id: &UserId,
    ) -> Result<Option<UserProfile>, DirectoryError> {
        let users = self.users.read().await;
        Ok(users.get(user_id).cloned())
    }
}
