//! 身份缓存
//!
//! 把持久用户 ID 映射到短期的画像快照，固定 TTL 到期驱逐。
//! 画像更新不做主动失效，新鲜度上界精确等于 TTL。

use std::collections::HashMap;
use std::sync::Arc;

use domain::{UserId, UserProfile};
use tokio::sync::RwLock;
use tokio::time::{Duration, Instant};

use crate::directory::UserDirectory;
use crate::error::ApplicationError;

#[derive(Debug, Clone)]
struct CacheEntry {
    profile: UserProfile,
    expires_at: Instant,
}

#[derive(Clone)]
pub struct ProfileCache {
    directory: Arc<dyn UserDirectory>,
    ttl: Duration,
    entries: Arc<RwLock<HashMap<UserId, CacheEntry>>>,
}

impl ProfileCache {
    /// 默认 TTL 为 5 分钟。
    pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

    pub fn new(directory: Arc<dyn UserDirectory>, ttl: Duration) -> Self {
        Self {
            directory,
            ttl,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// 取画像：命中且未过期直接返回；否则回源用户库并写入缓存。
    ///
    /// 用户库查不到返回 Ok(None)，且不做负缓存——每次未命中都会
    /// 重新回源。TTL 从首次写入起算，读取不会延长。
    pub async fn get_profile(
        &self,
        user_id: &UserId,
    ) -> Result<Option<UserProfile>, ApplicationError> {
        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(user_id) {
                // 读路径也检查过期，保证新鲜度上界精确等于 TTL
                if Instant::now() < entry.expires_at {
                    return Ok(Some(entry.profile.clone()));
                }
            }
        }

        let fetched = self.directory.fetch_user_profile(user_id).await?;
        let Some(profile) = fetched else {
            return Ok(None);
        };

        let expires_at = Instant::now() + self.ttl;
        {
            let mut entries = self.entries.write().await;
            // 并发回源时可能已有别的任务写入了仍然有效的条目，
            // 此时不覆盖，维持"驱逐按首次写入计时"的不变量
            if let Some(existing) = entries.get(user_id) {
                if Instant::now() < existing.expires_at {
                    return Ok(Some(existing.profile.clone()));
                }
            }
            entries.insert(
                user_id.clone(),
                CacheEntry {
                    profile: profile.clone(),
                    expires_at,
                },
            );
        }

        // 每个写入的条目恰好安排一次到期驱逐
        let entries = Arc::clone(&self.entries);
        let key = user_id.clone();
        tokio::spawn(async move {
            tokio::time::sleep_until(expires_at).await;
            let mut entries = entries.write().await;
            if let Some(entry) = entries.get(&key) {
                if entry.expires_at <= Instant::now() {
                    entries.remove(&key);
                    tracing::debug!(user_id = %key, "profile cache entry evicted");
                }
            }
        });

        Ok(Some(profile))
    }

    /// 认证后触发的预取，独立任务执行，不保证与同连接后续事件
    /// 的先后顺序。
    pub fn prefetch(&self, user_id: UserId) {
        let cache = self.clone();
        tokio::spawn(async move {
            if let Err(err) = cache.get_profile(&user_id).await {
                tracing::warn!(user_id = %user_id, error = %err, "profile prefetch failed");
            }
        });
    }

    /// 当前缓存条目数（诊断用）。
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
