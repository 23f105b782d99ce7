//! 连接注册表
//!
//! 维护临时连接 ID 与持久用户 ID 之间的双向映射。一个用户同一
//! 时刻至多有一个"当前"连接，以最后一次 authenticate 为准。

use std::collections::HashMap;
use std::sync::Arc;

use domain::{ConnectionId, Identity, UserId};
use tokio::sync::RwLock;

pub struct ConnectionRegistry {
    /// 连接到用户的映射
    connection_users: Arc<RwLock<HashMap<ConnectionId, UserId>>>,
    /// 用户到当前连接的映射
    user_connections: Arc<RwLock<HashMap<UserId, ConnectionId>>>,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connection_users: Arc::new(RwLock::new(HashMap::new())),
            user_connections: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// 把连接绑定到用户，双向记录。
    ///
    /// 重复绑定同一连接直接覆盖；同一用户在新连接上认证时，
    /// 反向条目指向新连接（旧连接的正向条目保留，直到其断开）。
    pub async fn bind(&self, connection_id: ConnectionId, user_id: UserId) {
        let mut connection_users = self.connection_users.write().await;
        let mut user_connections = self.user_connections.write().await;

        connection_users.insert(connection_id, user_id.clone());
        user_connections.insert(user_id, connection_id);
    }

    /// 解除该连接的绑定，返回之前绑定的用户（若有）。
    ///
    /// 从未绑定过的连接是 no-op。反向条目只有在仍指向该连接时
    /// 才移除，避免误删同一用户更新的绑定。
    pub async fn unbind(&self, connection_id: ConnectionId) -> Option<UserId> {
        let mut connection_users = self.connection_users.write().await;
        let mut user_connections = self.user_connections.write().await;

        let user_id = connection_users.remove(&connection_id)?;
        if user_connections.get(&user_id) == Some(&connection_id) {
            user_connections.remove(&user_id);
        }
        Some(user_id)
    }

    /// 解析连接当前代表的身份；未认证的连接得到连接范围的伪身份。
    pub async fn resolve(&self, connection_id: ConnectionId) -> Identity {
        let connection_users = self.connection_users.read().await;
        match connection_users.get(&connection_id) {
            Some(user_id) => Identity::Authenticated(user_id.clone()),
            None => Identity::Anonymous(connection_id),
        }
    }

    /// 身份当前对应的连接（广播寻址用）。
    pub async fn connection_for(&self, identity: &Identity) -> Option<ConnectionId> {
        match identity {
            Identity::Authenticated(user_id) => {
                let user_connections = self.user_connections.read().await;
                user_connections.get(user_id).copied()
            }
            Identity::Anonymous(connection_id) => Some(*connection_id),
        }
    }

    /// 用户当前是否在线。
    pub async fn is_online(&self, user_id: &UserId) -> bool {
        let user_connections = self.user_connections.read().await;
        user_connections.contains_key(user_id)
    }
}
