use std::sync::Arc;

use application::{
    ChatStore, Clock, ConnectionRegistry, MessageRateLimiter, ProfileCache, RoomMembershipTracker,
};
use infrastructure::ConnectionRouter;

/// 全部共享服务的句柄，按连接处理循环注入。
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ConnectionRegistry>,
    pub membership: Arc<RoomMembershipTracker>,
    pub rate_limiter: Arc<MessageRateLimiter>,
    pub profile_cache: ProfileCache,
    pub store: Arc<dyn ChatStore>,
    pub router: Arc<ConnectionRouter>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        membership: Arc<RoomMembershipTracker>,
        rate_limiter: Arc<MessageRateLimiter>,
        profile_cache: ProfileCache,
        store: Arc<dyn ChatStore>,
        router: Arc<ConnectionRouter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            membership,
            rate_limiter,
            profile_cache,
            store,
            router,
            clock,
        }
    }
}
