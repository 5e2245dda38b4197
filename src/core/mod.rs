//! 核心类型模块
//!
//! 包含动态类型值、顶点/边记录以及统一错误处理系统

pub mod error;
pub mod value;
pub mod vertex_edge;

pub use error::{ClientError, ClientResult};
pub use value::{Value, ValueTypeDef};
pub use vertex_edge::{Edge, Vertex};
