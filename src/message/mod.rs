//! 线上消息结构定义
//!
//! 包含遍历请求、响应批次以及关联标识的相关数据结构。
//! 请求一经提交即不可变；响应可能由多个批次组成，
//! 通过 `more` 标志指示后续批次是否存在

use uuid::Uuid;

use crate::core::Value;

/// 响应状态码
pub mod status {
    /// 请求成功，当前批次为最终批次
    pub const SUCCESS: u16 = 200;
    /// 请求成功，后续还有批次
    pub const PARTIAL_CONTENT: u16 = 206;
    /// 服务端拒绝了查询
    pub const SERVER_ERROR: u16 = 500;
}

/// 关联标识
///
/// 每个在途请求唯一。使用随机128位标识生成，
/// 保证不会与任何未完成请求的标识冲突
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// 生成新的关联标识
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// 从原始字节构造，用于解码入站帧
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// 线上编码使用的16字节表示
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 单个遍历步骤：操作名 + 参数列表
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub name: String,
    pub args: Vec<Value>,
}

impl Step {
    pub fn new(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

/// 请求级选项
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOptions {
    /// 服务端单批次返回的最大结果项数
    pub batch_size: u32,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self { batch_size: 64 }
    }
}

/// 遍历请求
///
/// 有序的步骤序列加上关联标识。提交后不可变，
/// 在交换期间归连接管理器所有，结果流耗尽或请求失败后销毁
#[derive(Debug, Clone, PartialEq)]
pub struct TraversalRequest {
    pub id: CorrelationId,
    pub steps: Vec<Step>,
    pub options: RequestOptions,
}

impl TraversalRequest {
    pub fn new(steps: Vec<Step>, options: RequestOptions) -> Self {
        Self {
            id: CorrelationId::new(),
            steps,
            options,
        }
    }
}

/// 响应批次
///
/// 同一请求的批次按服务端发送顺序交付；`more == false` 或
/// 错误状态码表示终态
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseBatch {
    pub id: CorrelationId,
    pub code: u16,
    pub message: String,
    pub items: Vec<Value>,
    pub more: bool,
}

impl ResponseBatch {
    /// 成功的最终批次
    pub fn success(id: CorrelationId, items: Vec<Value>) -> Self {
        Self {
            id,
            code: status::SUCCESS,
            message: String::new(),
            items,
            more: false,
        }
    }

    /// 成功的中间批次，后续还有数据
    pub fn partial(id: CorrelationId, items: Vec<Value>) -> Self {
        Self {
            id,
            code: status::PARTIAL_CONTENT,
            message: String::new(),
            items,
            more: true,
        }
    }

    /// 服务端拒绝
    pub fn server_error(id: CorrelationId, message: String) -> Self {
        Self {
            id,
            code: status::SERVER_ERROR,
            message,
            items: Vec::new(),
            more: false,
        }
    }

    /// 该批次是否为请求的终态
    pub fn is_terminal(&self) -> bool {
        !self.more || self.is_error()
    }

    /// 状态码是否表示服务端错误
    pub fn is_error(&self) -> bool {
        self.code >= 400
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correlation_id_unique() {
        let a = CorrelationId::new();
        let b = CorrelationId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_correlation_id_bytes_round_trip() {
        let id = CorrelationId::new();
        let bytes = *id.as_bytes();
        assert_eq!(CorrelationId::from_bytes(bytes), id);
    }

    #[test]
    fn test_batch_terminal() {
        let id = CorrelationId::new();
        assert!(ResponseBatch::success(id, vec![]).is_terminal());
        assert!(!ResponseBatch::partial(id, vec![]).is_terminal());
        let err = ResponseBatch::server_error(id, "rejected".to_string());
        assert!(err.is_terminal());
        assert!(err.is_error());
    }
}
