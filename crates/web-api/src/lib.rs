//! Web API 层。
//!
//! 提供 Axum 路由，把 WebSocket 连接委托给应用层的聊天/在线
//! 状态服务。每条连接一个处理循环，事件按到达顺序逐个处理。

mod routes;
mod state;
mod ws_connection;

pub use routes::router;
pub use state::AppState;
