//! 连接状态定义
//!
//! 状态由连接管理器独占持有，遍历客户端从不直接修改

use serde::{Deserialize, Serialize};

/// 连接状态机
///
/// Disconnected -> Connecting -> Ready -> {Closing -> Disconnected | Failed}
/// 传输失败进入 Failed 后，按重连策略可能回到 Connecting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Ready,
    Closing,
    Failed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Ready => "Ready",
            ConnectionState::Closing => "Closing",
            ConnectionState::Failed => "Failed",
        };
        write!(f, "{}", name)
    }
}
