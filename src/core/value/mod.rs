//! 动态类型值模块
//!
//! 服务器返回的结果项是异构类型的，统一用带标签的Value枚举表示，
//! 解码处对标签做穷尽匹配

pub mod conversion;
pub mod types;

pub use types::{Value, ValueTypeDef};
