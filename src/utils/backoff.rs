//! 指数退避
//!
//! 提供重连使用的可配置指数退避策略

use rand::Rng;
use std::time::Duration;

/// 退避策略配置
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    pub initial_delay_ms: u64,
    pub multiplier: f64,
    pub max_delay_ms: u64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: 100,
            multiplier: 2.0,
            max_delay_ms: 5_000,
        }
    }
}

impl BackoffPolicy {
    pub fn new(initial_delay_ms: u64, multiplier: f64, max_delay_ms: u64) -> Self {
        Self {
            initial_delay_ms,
            multiplier,
            max_delay_ms,
        }
    }

    /// 第 `attempt` 次（从0开始）重试前的等待时间
    ///
    /// 附加不超过25%的随机抖动，避免多个客户端同时重连
    pub fn delay(&self, attempt: u32) -> Duration {
        let base = self.initial_delay_ms as f64 * self.multiplier.powi(attempt as i32);
        let capped = base.min(self.max_delay_ms as f64);
        let jitter = rand::thread_rng().gen_range(0.0..=0.25);
        Duration::from_millis((capped * (1.0 + jitter)) as u64)
    }
}
