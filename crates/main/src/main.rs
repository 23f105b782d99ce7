//! 主应用程序入口
//!
//! 启动实时聊天/在线状态服务。

use std::sync::Arc;
use std::time::Duration;

use application::{
    ConnectionRegistry, MessageRateLimiter, ProfileCache, RoomMembershipTracker, SystemClock,
    UserDirectory,
};
use config::AppConfig;
use infrastructure::{ConnectionRouter, InMemoryChatStore, InMemoryUserDirectory};
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // 读取并校验配置
    let app_config = AppConfig::from_env_with_defaults();
    app_config.validate()?;

    // 外部协作方：内存实现，生产环境在这里接真实的用户服务与消息库
    let directory: Arc<dyn UserDirectory> = Arc::new(InMemoryUserDirectory::new());
    let store = Arc::new(InMemoryChatStore::new());

    // 共享状态服务
    let registry = Arc::new(ConnectionRegistry::new());
    let membership = Arc::new(RoomMembershipTracker::new());
    let rate_limiter = Arc::new(MessageRateLimiter::new(
        app_config.rate_limit.max_messages,
        Duration::from_millis(app_config.rate_limit.window_ms),
    ));
    let profile_cache = ProfileCache::new(
        directory,
        Duration::from_secs(app_config.cache.profile_ttl_secs),
    );
    let connection_router = Arc::new(ConnectionRouter::new());
    let clock = Arc::new(SystemClock);

    // 定期清理早已过期的限流配额
    {
        let rate_limiter = Arc::clone(&rate_limiter);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(60));
            loop {
                ticker.tick().await;
                rate_limiter.cleanup_expired();
            }
        });
    }

    let state = AppState::new(
        registry,
        membership,
        rate_limiter,
        profile_cache,
        store,
        connection_router,
        clock,
    );

    // 启动 Web 服务器
    let app = router(state);
    let bind_addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    tracing::info!("聊天服务器启动在 http://{bind_addr}");
    axum::serve(listener, app).await?;

    Ok(())
}
