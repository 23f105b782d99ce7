//! 应用层实现。
//!
//! 这里提供聊天/在线状态核心的有状态服务（连接注册表、房间成员
//! 关系、限流器、身份缓存），以及对外部协作方（用户库、消息持久
//! 化桥）的抽象。每张共享表都是独立的锁保护服务，显式构造与销毁。

pub mod clock;
pub mod directory;
pub mod error;
pub mod membership;
pub mod profile_cache;
pub mod rate_limiter;
pub mod registry;
pub mod store;

pub use clock::{Clock, SystemClock};
pub use directory::{DirectoryError, UserDirectory};
pub use error::ApplicationError;
pub use membership::RoomMembershipTracker;
pub use profile_cache::ProfileCache;
pub use rate_limiter::{MessageRateLimiter, RateDecision};
pub use registry::ConnectionRegistry;
pub use store::{ChatStore, StoreError};
