//! 结果流
//!
//! 把可能多批次的响应呈现为惰性的类型化值序列。拉取式驱动：
//! 当前批次耗尽时，下一次取值会挂起等待下一批次或终态。
//! 流是有限的、不可重放的——重新执行同一逻辑遍历需要提交新请求

use log::trace;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OwnedSemaphorePermit;
use tokio::time::{timeout_at, Instant};

use crate::core::error::{ClientError, ClientResult};
use crate::core::Value;
use crate::message::CorrelationId;
use crate::tracker::{BatchEvent, PendingHandle, RequestTracker};

/// 一个请求的惰性结果序列
///
/// 持有在途配额许可，流销毁时释放
#[derive(Debug)]
pub struct ResultStream {
    id: CorrelationId,
    handle: PendingHandle,
    tracker: Arc<RequestTracker>,
    current: VecDeque<Value>,
    finished: bool,
    deadline: Option<Instant>,
    _permit: OwnedSemaphorePermit,
}

impl ResultStream {
    pub(crate) fn new(
        handle: PendingHandle,
        tracker: Arc<RequestTracker>,
        timeout: Option<Duration>,
        permit: OwnedSemaphorePermit,
    ) -> Self {
        Self {
            id: handle.id(),
            handle,
            tracker,
            current: VecDeque::new(),
            finished: false,
            deadline: timeout.map(|t| Instant::now() + t),
            _permit: permit,
        }
    }

    /// 请求的关联标识
    pub fn id(&self) -> CorrelationId {
        self.id
    }

    /// 取下一个结果项
    ///
    /// `Ok(None)` 是明确的"无结果"标记，与错误严格区分。
    /// 超时走与取消相同的路径：先从在途表移除，再向等待方交付超时错误
    pub async fn next_item(&mut self) -> ClientResult<Option<Value>> {
        loop {
            if let Some(value) = self.current.pop_front() {
                return Ok(Some(value));
            }
            if self.finished {
                return Ok(None);
            }

            let event = match self.deadline {
                Some(deadline) => match timeout_at(deadline, self.handle.recv()).await {
                    Ok(event) => event,
                    Err(_) => {
                        self.finished = true;
                        self.tracker.cancel(self.id);
                        return Err(ClientError::Timeout);
                    }
                },
                None => self.handle.recv().await,
            };

            match event {
                Some(BatchEvent::Batch(batch)) => {
                    if batch.is_error() {
                        self.finished = true;
                        return Err(ClientError::Server {
                            code: batch.code,
                            message: batch.message,
                        });
                    }
                    trace!(
                        "Stream {} received {} item(s), more={}",
                        self.id,
                        batch.items.len(),
                        batch.more
                    );
                    if !batch.more {
                        self.finished = true;
                    }
                    self.current.extend(batch.items);
                }
                Some(BatchEvent::Failed(error)) => {
                    self.finished = true;
                    return Err(error);
                }
                Some(BatchEvent::Cancelled) => {
                    self.finished = true;
                    return Err(ClientError::Cancelled);
                }
                None => {
                    self.finished = true;
                    return Err(ClientError::Internal(
                        "completion channel closed without terminal outcome".to_string(),
                    ));
                }
            }
        }
    }

    /// 耗尽整个流，返回有序的结果项序列
    ///
    /// 全有或全无：流中途失败时返回失败，已交付的部分结果被丢弃
    pub async fn to_list(mut self) -> ClientResult<Vec<Value>> {
        let mut items = Vec::new();
        while let Some(value) = self.next_item().await? {
            items.push(value);
        }
        Ok(items)
    }

    /// 只为副作用耗尽流，返回受影响/产生的结果项数量
    ///
    /// 显式返回数量而不是布尔标志，空结果的成功迭代与
    /// "没有可删的东西"不会混淆
    pub async fn iterate(mut self) -> ClientResult<u64> {
        let mut count = 0u64;
        while self.next_item().await?.is_some() {
            count += 1;
        }
        Ok(count)
    }

    /// 转换为 [`futures::Stream`]
    ///
    /// 供需要流组合子的调用方使用；产出错误后流结束
    pub fn into_stream(self) -> impl futures::Stream<Item = ClientResult<Value>> {
        futures::stream::unfold(self, |mut stream| async move {
            match stream.next_item().await {
                Ok(Some(value)) => Some((Ok(value), stream)),
                Ok(None) => None,
                Err(e) => Some((Err(e), stream)),
            }
        })
    }

    /// 取消请求
    ///
    /// 立即从在途表移除；服务端可能仍在处理，
    /// 其后迟到的批次会被丢弃
    pub fn cancel(&mut self) {
        if !self.finished {
            self.finished = true;
            self.current.clear();
            self.tracker.cancel(self.id);
        }
    }
}

impl Drop for ResultStream {
    fn drop(&mut self) {
        // 中途丢弃流等价于取消请求
        if !self.finished {
            self.tracker.cancel(self.id);
        }
    }
}
