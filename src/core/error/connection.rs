//! 连接错误类型
//!
//! 涵盖传输层建立和维护连接相关的错误

use thiserror::Error;

/// 连接建立错误
///
/// 按重连策略在内部重试后仍无法建立传输时返回
#[derive(Error, Debug, Clone)]
pub enum ConnectError {
    #[error("无法连接到 {endpoint}: {reason}")]
    DialFailed { endpoint: String, reason: String },

    #[error("连接超时: {endpoint}")]
    DialTimeout { endpoint: String },

    #[error("重连次数超过上限 ({attempts} 次): {reason}")]
    RetriesExhausted { attempts: u32, reason: String },
}
