//! 连接级事件路由器
//!
//! 每条 WebSocket 连接注册一个无界发送端，路由器按连接 ID 投递
//! 服务端事件。投递失败（连接已进入关闭流程）只记日志，不向
//! 调用方传播。

use std::collections::HashMap;
use std::sync::Arc;

use domain::{ConnectionId, ServerEvent};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};

pub struct ConnectionRouter {
    /// 连接到发送端的映射
    senders: Arc<RwLock<HashMap<ConnectionId, mpsc::UnboundedSender<ServerEvent>>>>,
}

impl Default for ConnectionRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRouter {
    pub fn new() -> Self {
        Self {
            senders: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// 注册连接的发送端，连接建立时调用一次。
    pub async fn register_sender(
        &self,
        connection_id: ConnectionId,
        sender: mpsc::UnboundedSender<ServerEvent>,
    ) {
        let mut senders = self.senders.write().await;
        senders.insert(connection_id, sender);
        debug!(connection_id = %connection_id, "connection sender registered");
    }

    /// 注销连接的发送端，连接关闭时调用。
    pub async fn unregister_sender(&self, connection_id: ConnectionId) {
        let mut senders = self.senders.write().await;
        senders.remove(&connection_id);
        debug!(connection_id = %connection_id, "connection sender unregistered");
    }

    /// 向单个连接投递事件。
    pub async fn route_to_connection(&self, connection_id: ConnectionId, event: ServerEvent) {
        let senders = self.senders.read().await;
        match senders.get(&connection_id) {
            Some(sender) => {
                if sender.send(event).is_err() {
                    warn!(connection_id = %connection_id, "failed to route event: channel closed");
                }
            }
            None => {
                debug!(connection_id = %connection_id, "dropping event for unknown connection");
            }
        }
    }

    /// 向一组连接投递同一事件。
    pub async fn route_to_connections(&self, connection_ids: &[ConnectionId], event: ServerEvent) {
        let senders = self.senders.read().await;
        for connection_id in connection_ids {
            if let Some(sender) = senders.get(connection_id) {
                if sender.send(event.clone()).is_err() {
                    warn!(connection_id = %connection_id, "failed to route event: channel closed");
                }
            }
        }
    }

    /// 向除指定连接外的全部在线连接投递事件（上线/下线通告用）。
    pub async fn broadcast_except(&self, excluded: ConnectionId, event: ServerEvent) {
        let senders = self.senders.read().await;
        for (connection_id, sender) in senders.iter() {
            if *connection_id == excluded {
                continue;
            }
            if sender.send(event.clone()).is_err() {
                warn!(connection_id = %connection_id, "failed to route event: channel closed");
            }
        }
    }

    /// 当前已注册的连接数。
    pub async fn connection_count(&self) -> usize {
        self.senders.read().await.len()
    }
}
