//! 线上消息编解码模块
//!
//! 消息格式是自描述的：每个值前带一个类型标签字节，
//! 解码端无需外部schema。标量采用小端定宽编码，
//! 字符串/字节串/集合采用长度前缀编码。
//!
//! 套接字上的帧格式: `[length:4][payload:N]`，length 仅计 payload。
//!
//! 编码保证：整数与浮点数使用不同标签，往返不改变类型；
//! 字符串与字节串内容逐字节保真

mod decode;
mod encode;

pub use decode::{decode_request, decode_response};
pub use encode::{encode_request, encode_response};

/// 帧长度前缀大小
pub const FRAME_HEADER_SIZE: usize = 4;

/// 单帧payload上限 (1MB)，超过即拒绝，防止内存耗尽
pub const MAX_PAYLOAD_SIZE: usize = 1024 * 1024;

/// 值嵌套深度上限
///
/// 帧长度上限挡不住深度嵌套的小值（每层LIST只占5字节），
/// 不设上限的话畸形帧会把递归解码的栈打爆
pub const MAX_NESTING_DEPTH: usize = 32;

/// 消息种类标签
pub(crate) mod kind {
    pub const REQUEST: u8 = 0x01;
    pub const RESPONSE: u8 = 0x02;
}

/// 值类型标签
pub(crate) mod tag {
    pub const NULL: u8 = 0x00;
    pub const BOOL: u8 = 0x01;
    pub const INT: u8 = 0x02;
    pub const FLOAT: u8 = 0x03;
    pub const STRING: u8 = 0x04;
    pub const BYTES: u8 = 0x05;
    pub const LIST: u8 = 0x06;
    pub const MAP: u8 = 0x07;
    pub const VERTEX: u8 = 0x08;
    pub const EDGE: u8 = 0x09;
}
