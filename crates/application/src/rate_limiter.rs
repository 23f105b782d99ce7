//! 消息限流器
//!
//! 按身份的固定时间窗口限流：窗口起点取窗口内第一条消息的时刻，
//! 窗口内超过上限即拒绝，窗口过期后重新计数。固定窗口在边界处
//! 的突发最多可放行约 2 倍名义速率，这是有意保留的近似，不要
//! 换成令牌桶或滑动日志。

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use domain::Identity;

/// 单个身份的窗口配额
#[derive(Debug, Clone)]
struct WindowQuota {
    /// 当前窗口内的消息数
    count: u32,
    /// 当前窗口的起点
    window_start: Instant,
}

/// 限流判定结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Limited,
}

pub struct MessageRateLimiter {
    /// 每个窗口允许的最大消息数
    max_messages_per_window: u32,
    /// 窗口长度
    window_duration: Duration,
    /// 身份配额存储
    quotas: Arc<RwLock<HashMap<Identity, WindowQuota>>>,
}

impl Default for MessageRateLimiter {
    fn default() -> Self {
        // 默认每秒 5 条
        Self::new(5, Duration::from_millis(1000))
    }
}

impl MessageRateLimiter {
    pub fn new(max_messages_per_window: u32, window_duration: Duration) -> Self {
        Self {
            max_messages_per_window,
            window_duration,
            quotas: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// 记录一次发送并判定是否放行。
    pub fn check_and_record(&self, identity: &Identity) -> RateDecision {
        let mut quotas = self
            .quotas
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let now = Instant::now();
        let quota = quotas.entry(identity.clone()).or_insert(WindowQuota {
            count: 0,
            window_start: now,
        });

        if now.duration_since(quota.window_start) < self.window_duration {
            quota.count += 1;
            if quota.count > self.max_messages_per_window {
                return RateDecision::Limited;
            }
        } else {
            quota.count = 1;
            quota.window_start = now;
        }

        RateDecision::Allowed
    }

    /// 断开连接时丢弃该身份的配额。
    pub fn reset(&self, identity: &Identity) {
        let mut quotas = self
            .quotas
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        quotas.remove(identity);
    }

    /// 清理早已过期的配额记录，防止表无界增长。
    pub fn cleanup_expired(&self) {
        let mut quotas = self
            .quotas
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let now = Instant::now();
        let window_duration = self.window_duration;
        quotas.retain(|_, quota| now.duration_since(quota.window_start) < window_duration * 2);
    }

    /// 当前窗口内的计数（诊断用）。
    pub fn current_count(&self, identity: &Identity) -> u32 {
        let quotas = self
            .quotas
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        quotas.get(identity).map(|quota| quota.count).unwrap_or(0)
    }
}
