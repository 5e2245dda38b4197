//! 工具模块

pub mod backoff;
pub mod logging;

pub use backoff::BackoffPolicy;
