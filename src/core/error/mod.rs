//! 统一错误处理系统 for graphdb-client
//!
//! ## 设计理念
//!
//! 1. **按传播范围分类**：
//!    - 编码/解码错误只影响触发它的那一次请求
//!    - 传输层错误由连接管理器集中处理，扇出到所有在途请求
//!    - 服务端拒绝（ServerError）原样上抛，绝不自动重试——
//!      重试一个变更型遍历可能导致副作用重复
//!
//! 2. **统一接口**：`ClientResult<T>` 提供统一的返回类型，简化错误传播

use thiserror::Error;

// 子模块
pub mod codec;
pub mod connection;

// 重新导出所有错误类型
pub use codec::{CodecError, CodecResult};
pub use connection::ConnectError;

/// 统一的客户端错误类型
#[derive(Error, Debug, Clone)]
pub enum ClientError {
    #[error("编解码错误: {0}")]
    Codec(#[from] CodecError),

    #[error("连接未就绪")]
    NotConnected,

    #[error("连接错误: {0}")]
    Connect(#[from] ConnectError),

    #[error("传输错误: {0}")]
    Transport(String),

    #[error("连接已关闭")]
    ConnectionClosed,

    #[error("请求超时")]
    Timeout,

    #[error("请求已取消")]
    Cancelled,

    #[error("服务端错误 [{code}]: {message}")]
    Server { code: u16, message: String },

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 统一的结果类型
pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    /// 错误是否可以安全重试
    ///
    /// 只有传输层面的失败可以重试；服务端拒绝和编解码错误不可重试
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::NotConnected
                | ClientError::Connect(_)
                | ClientError::Transport(_)
                | ClientError::Timeout
        )
    }
}

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        ClientError::Transport(e.to_string())
    }
}
