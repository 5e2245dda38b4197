//! 编解码错误类型
//!
//! 涵盖线上消息编码和解码相关的错误

use thiserror::Error;

/// 编解码结果类型别名
pub type CodecResult<T> = Result<T, CodecError>;

/// 编解码错误
///
/// 编码错误在任何字节发送之前返回给触发它的调用方；
/// 解码错误意味着收到了畸形或截断的帧
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    #[error("不支持的参数类型: {0}")]
    UnsupportedType(&'static str),

    #[error("数据截断: 需要 {needed} 字节, 仅有 {have} 字节")]
    Truncated { needed: usize, have: usize },

    #[error("畸形数据: {0}")]
    Malformed(String),

    #[error("未知类型标签: {0:#04x}")]
    UnknownTag(u8),

    #[error("帧过大: {size} 字节 (上限 {max} 字节)")]
    FrameTooLarge { size: usize, max: usize },
}

impl From<std::string::FromUtf8Error> for CodecError {
    fn from(e: std::string::FromUtf8Error) -> Self {
        CodecError::Malformed(format!("invalid utf-8: {}", e))
    }
}
