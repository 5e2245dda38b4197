//! 遍历客户端
//!
//! 面向调用方的公开接口。客户端是显式构造、显式持有的对象，
//! 由需要它的代码按引用传递——不存在进程级的隐式全局实例。
//!
//! 独立提交的请求之间没有任何隐式顺序：调用方若要求某个操作的
//! 效果对下一个操作可见，必须先等待前者的终态

use std::sync::Arc;

use crate::config::ClientConfig;
use crate::connection::{ConnectionManager, ConnectionState};
use crate::core::error::ClientResult;
use crate::core::Value;
use crate::message::Step;
use crate::traversal::GraphTraversal;

/// 图遍历客户端
///
/// 持有一个连接管理器；同一客户端可安全地被多个逻辑调用方
/// 并发使用，各自的请求在同一传输上多路复用
#[derive(Debug, Clone)]
pub struct GraphClient {
    config: ClientConfig,
    conn: Arc<ConnectionManager>,
}

impl GraphClient {
    pub fn new(config: ClientConfig) -> Self {
        let conn = ConnectionManager::new(config.clone());
        Self { config, conn }
    }

    /// 建立到服务端的连接；已就绪时幂等
    pub async fn connect(&self) -> ClientResult<()> {
        self.conn.connect().await
    }

    /// 关闭连接，在途请求以 `ConnectionClosed` 失败
    pub fn close(&self) {
        self.conn.close();
    }

    /// 当前连接状态
    pub fn state(&self) -> ConnectionState {
        self.conn.state()
    }

    /// 当前在途请求数
    pub fn pending_count(&self) -> usize {
        self.conn.pending_count()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// 底层连接管理器，供需要直接挂载传输或订阅状态的场景使用
    pub fn connection(&self) -> &Arc<ConnectionManager> {
        &self.conn
    }

    fn start(&self, step: Step) -> GraphTraversal {
        GraphTraversal::new(Arc::clone(&self.conn), step, self.config.batch_size)
    }

    /// 从全部顶点开始遍历
    pub fn v(&self) -> GraphTraversal {
        self.start(Step::new("V", vec![]))
    }

    /// 从指定标识的顶点开始遍历
    pub fn v_id(&self, id: impl Into<Value>) -> GraphTraversal {
        self.start(Step::new("V", vec![id.into()]))
    }

    /// 从全部边开始遍历
    pub fn e(&self) -> GraphTraversal {
        self.start(Step::new("E", vec![]))
    }

    /// 以新增顶点开始遍历
    pub fn add_v(&self, label: impl Into<Value>) -> GraphTraversal {
        self.start(Step::new("addV", vec![label.into()]))
    }
}
