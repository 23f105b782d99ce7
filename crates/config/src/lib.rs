//! 统一配置中心
//!
//! 提供应用的全局配置管理，包括：
//! - 服务监听地址
//! - 身份缓存 TTL
//! - 消息限流参数

use serde::{Deserialize, Serialize};
use std::env;

/// 全局应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 服务配置
    pub server: ServerConfig,
    /// 身份缓存配置
    pub cache: CacheConfig,
    /// 限流配置
    pub rate_limit: RateLimitConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// 身份缓存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// 画像快照的存活时间，秒
    pub profile_ttl_secs: u64,
}

/// 限流配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// 每个窗口允许的最大消息数
    pub max_messages: u32,
    /// 窗口长度，毫秒
    pub window_ms: u64,
}

impl AppConfig {
    /// 从环境变量加载配置，缺失的变量取默认值。
    pub fn from_env_with_defaults() -> Self {
        Self {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
                port: env::var("SERVER_PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(8080),
            },
            cache: CacheConfig {
                profile_ttl_secs: env::var("PROFILE_CACHE_TTL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            },
            rate_limit: RateLimitConfig {
                max_messages: env::var("RATE_LIMIT_MAX_MESSAGES")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
                window_ms: env::var("RATE_LIMIT_WINDOW_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1000),
            },
        }
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.is_empty() {
            return Err(ConfigError::InvalidServerConfig(
                "Server host cannot be empty".to_string(),
            ));
        }

        if self.cache.profile_ttl_secs == 0 {
            return Err(ConfigError::InvalidCacheConfig(
                "Profile cache TTL must be greater than 0".to_string(),
            ));
        }

        if self.rate_limit.max_messages == 0 {
            return Err(ConfigError::InvalidRateLimitConfig(
                "Rate limit must allow at least 1 message per window".to_string(),
            ));
        }
        if self.rate_limit.window_ms == 0 {
            return Err(ConfigError::InvalidRateLimitConfig(
                "Rate limit window must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server configuration: {0}")]
    InvalidServerConfig(String),
    #[error("Invalid cache configuration: {0}")]
    InvalidCacheConfig(String),
    #[error("Invalid rate limit configuration: {0}")]
    InvalidRateLimitConfig(String),
    #[error("Environment variable error: {0}")]
    EnvVarError(#[from] std::env::VarError),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_env_with_defaults()
    }
}
