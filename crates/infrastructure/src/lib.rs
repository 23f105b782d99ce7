//! 基础设施层实现。
//!
//! 应用层协作方接口的内存实现：消息存储、用户库，以及把服务端
//! 事件投递到具体连接的路由器。

pub mod directory;
pub mod memory_store;
pub mod router;

pub use directory::InMemoryUserDirectory;
pub use memory_store::InMemoryChatStore;
pub use router::ConnectionRouter;
