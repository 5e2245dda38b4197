//! 请求跟踪器
//!
//! 维护在途请求表：关联标识 -> 完成句柄。条目在提交时创建，
//! 在终态（最终批次、失败或取消）交付时移除。
//!
//! 保证：每个注册的标识恰好交付一次终态；`more == true` 的
//! 中间批次可以在终态之前交付零次或多次。
//! 同一标识的批次按到达顺序交付，不同标识之间无顺序约束

use dashmap::DashMap;
use log::{debug, warn};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::core::error::ClientError;
use crate::message::{CorrelationId, ResponseBatch};

/// 交付给等待方的事件
#[derive(Debug)]
pub enum BatchEvent {
    /// 一个响应批次（可能是中间批次，也可能是终态批次）
    Batch(ResponseBatch),
    /// 终态失败
    Failed(ClientError),
    /// 调用方取消，未等待服务端响应
    Cancelled,
}

/// 请求的完成句柄，结果流从这里拉取批次事件
#[derive(Debug)]
pub struct PendingHandle {
    id: CorrelationId,
    rx: mpsc::UnboundedReceiver<BatchEvent>,
}

impl PendingHandle {
    pub fn id(&self) -> CorrelationId {
        self.id
    }

    /// 等待下一个事件；发送端全部关闭时返回 `None`
    pub async fn recv(&mut self) -> Option<BatchEvent> {
        self.rx.recv().await
    }
}

/// 在途请求表
///
/// 在途请求表是连接管理器持有的共享可变资源，
/// 外部组件只能通过这里的操作访问
#[derive(Debug, Default)]
pub struct RequestTracker {
    pending: DashMap<CorrelationId, mpsc::UnboundedSender<BatchEvent>>,
}

impl RequestTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            pending: DashMap::new(),
        })
    }

    /// 注册一个在途请求，返回完成句柄
    pub fn register(&self, id: CorrelationId) -> PendingHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        self.pending.insert(id, tx);
        debug!("Registered request {}", id);
        PendingHandle { id, rx }
    }

    /// 按关联标识交付一个批次
    ///
    /// 终态批次（`more == false` 或错误状态）交付后移除条目。
    /// 未知标识是异常而非错误：服务端发来了意外的关联标识
    /// （通常是取消后迟到的批次），记录告警后丢弃，绝不让客户端崩溃
    pub fn resolve(&self, batch: ResponseBatch) {
        let id = batch.id;
        let terminal = batch.is_terminal();
        if terminal {
            match self.pending.remove(&id) {
                Some((_, tx)) => {
                    let _ = tx.send(BatchEvent::Batch(batch));
                }
                None => {
                    warn!("Received batch for unknown correlation id {}, discarding", id);
                }
            }
        } else {
            match self.pending.get(&id) {
                Some(tx) => {
                    let _ = tx.send(BatchEvent::Batch(batch));
                }
                None => {
                    warn!("Received batch for unknown correlation id {}, discarding", id);
                }
            }
        }
    }

    /// 交付终态失败并移除条目
    pub fn fail(&self, id: CorrelationId, error: ClientError) {
        if let Some((_, tx)) = self.pending.remove(&id) {
            let _ = tx.send(BatchEvent::Failed(error));
        }
    }

    /// 传输层失败时，把同一个错误扇出给所有在途请求
    pub fn fail_all(&self, error: ClientError) {
        let ids: Vec<CorrelationId> = self.pending.iter().map(|entry| *entry.key()).collect();
        if !ids.is_empty() {
            warn!("Failing {} pending request(s): {}", ids.len(), error);
        }
        for id in ids {
            if let Some((_, tx)) = self.pending.remove(&id) {
                let _ = tx.send(BatchEvent::Failed(error.clone()));
            }
        }
    }

    /// 取消一个在途请求
    ///
    /// 立即移除条目并唤醒等待方；服务端可能仍在处理，
    /// 其后迟到的批次会在 `resolve` 中作为未知标识被丢弃
    pub fn cancel(&self, id: CorrelationId) {
        if let Some((_, tx)) = self.pending.remove(&id) {
            debug!("Cancelled request {}", id);
            let _ = tx.send(BatchEvent::Cancelled);
        }
    }

    /// 当前在途请求数
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// 指定标识是否仍在途
    pub fn contains(&self, id: CorrelationId) -> bool {
        self.pending.contains_key(&id)
    }
}
