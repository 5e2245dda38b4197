//! 遍历构建模块
//!
//! 遍历构建操作只组装步骤序列，不触发执行；
//! 执行只由终结调用（`next`/`to_list`/`iterate`）触发。
//! 所有构建操作都是同步且不阻塞的

use std::sync::Arc;
use std::time::Duration;

use crate::connection::ConnectionManager;
use crate::core::error::ClientResult;
use crate::core::Value;
use crate::message::{RequestOptions, Step, TraversalRequest};
use crate::stream::ResultStream;

/// 一次可组合的图遍历
///
/// 通过 [`GraphClient`](crate::client::GraphClient) 的 `v()`/`e()`/`add_v()`
/// 等入口创建，链式追加步骤，最后用终结调用执行
#[derive(Debug, Clone)]
pub struct GraphTraversal {
    conn: Arc<ConnectionManager>,
    steps: Vec<Step>,
    options: RequestOptions,
    timeout: Option<Duration>,
}

impl GraphTraversal {
    pub(crate) fn new(conn: Arc<ConnectionManager>, start: Step, batch_size: u32) -> Self {
        Self {
            conn,
            steps: vec![start],
            options: RequestOptions { batch_size },
            timeout: None,
        }
    }

    fn step(mut self, name: &str, args: Vec<Value>) -> Self {
        self.steps.push(Step::new(name, args));
        self
    }

    /// 按标签过滤
    pub fn has_label(self, label: impl Into<Value>) -> Self {
        self.step("hasLabel", vec![label.into()])
    }

    /// 按属性等值过滤
    pub fn has(self, key: impl Into<Value>, value: impl Into<Value>) -> Self {
        self.step("has", vec![key.into(), value.into()])
    }

    /// 按标识过滤
    pub fn has_id(self, id: impl Into<Value>) -> Self {
        self.step("hasId", vec![id.into()])
    }

    /// 投影属性值
    pub fn values(self, key: impl Into<Value>) -> Self {
        self.step("values", vec![key.into()])
    }

    /// 新增顶点
    pub fn add_v(self, label: impl Into<Value>) -> Self {
        self.step("addV", vec![label.into()])
    }

    /// 新增边（从当前顶点出发）
    pub fn add_e(self, label: impl Into<Value>) -> Self {
        self.step("addE", vec![label.into()])
    }

    /// 设置边的目标顶点
    pub fn to(self, id: impl Into<Value>) -> Self {
        self.step("to", vec![id.into()])
    }

    /// 设置属性
    pub fn property(self, key: impl Into<Value>, value: impl Into<Value>) -> Self {
        self.step("property", vec![key.into(), value.into()])
    }

    /// 沿出边到相邻顶点
    pub fn out(self, label: impl Into<Value>) -> Self {
        self.step("out", vec![label.into()])
    }

    /// 取出边
    pub fn out_e(self, label: impl Into<Value>) -> Self {
        self.step("outE", vec![label.into()])
    }

    /// 从边到其目标顶点
    pub fn in_v(self) -> Self {
        self.step("inV", vec![])
    }

    /// 删除当前元素
    pub fn drop_elements(self) -> Self {
        self.step("drop", vec![])
    }

    /// 计数
    pub fn count(self) -> Self {
        self.step("count", vec![])
    }

    /// 限制结果数量
    pub fn limit(self, n: i64) -> Self {
        self.step("limit", vec![Value::Int(n)])
    }

    /// 覆盖本次请求的批次大小
    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.options.batch_size = batch_size;
        self
    }

    /// 覆盖本次请求的超时
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// 当前步骤序列（只读）
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// 提交请求并返回底层结果流
    ///
    /// 需要精细控制（逐项消费、显式取消）时使用；
    /// 一般场景用下面的终结调用
    pub async fn submit(self) -> ClientResult<ResultStream> {
        let request = TraversalRequest::new(self.steps, self.options);
        self.conn.submit(request, self.timeout).await
    }

    /// 执行并取第一个结果项
    ///
    /// `Ok(None)` 表示"无结果"，与错误严格区分。
    /// 剩余未消费的结果随流的丢弃被取消
    pub async fn next(self) -> ClientResult<Option<Value>> {
        let mut stream = self.submit().await?;
        stream.next_item().await
    }

    /// 执行并物化全部结果项
    pub async fn to_list(self) -> ClientResult<Vec<Value>> {
        let stream = self.submit().await?;
        stream.to_list().await
    }

    /// 只为副作用执行（新增/删除），返回受影响的结果项数量
    pub async fn iterate(self) -> ClientResult<u64> {
        let stream = self.submit().await?;
        stream.iterate().await
    }
}
