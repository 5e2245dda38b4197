//! 连接管理器
//!
//! 独占持有到服务端的一条持久双向传输，负责连接建立、重连
//! 以及并发请求在同一传输上的多路复用。
//!
//! 多路复用约定：
//! - 出站帧由专职写任务串行写入，一帧完整写完才写下一帧，
//!   并发请求的帧不会交错
//! - 入站帧由专职读任务按其内嵌的关联标识分发给请求跟踪器，
//!   与写入流程互不阻塞，某个结果流的慢消费不会阻塞其它请求的帧

pub mod state;
pub(crate) mod transport;

use log::{debug, error, info, trace, warn};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch, Semaphore};
use tokio::time::{sleep, timeout};

use crate::codec;
use crate::config::ClientConfig;
use crate::core::error::{ClientError, ClientResult, ConnectError};
use crate::message::TraversalRequest;
use crate::stream::ResultStream;
use crate::tracker::RequestTracker;
use crate::utils::BackoffPolicy;

pub use state::ConnectionState;

/// 连接管理器
///
/// 在途请求表和连接状态是仅有的两处共享可变资源，
/// 都由这里独占持有，外部组件只能通过公开操作访问
#[derive(Debug)]
pub struct ConnectionManager {
    config: ClientConfig,
    tracker: Arc<RequestTracker>,
    state_tx: watch::Sender<ConnectionState>,
    writer_tx: Mutex<Option<mpsc::Sender<Vec<u8>>>>,
    in_flight: Arc<Semaphore>,
    /// 串行化连接建立，避免并发connect竞争
    connect_lock: tokio::sync::Mutex<()>,
    /// 当前传输的代号；旧传输任务的失败回调据此作废
    generation: AtomicU64,
}

impl ConnectionManager {
    pub fn new(config: ClientConfig) -> Arc<Self> {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let max_in_flight = config.max_in_flight_requests.max(1);
        Arc::new(Self {
            config,
            tracker: RequestTracker::new(),
            state_tx,
            writer_tx: Mutex::new(None),
            in_flight: Arc::new(Semaphore::new(max_in_flight)),
            connect_lock: tokio::sync::Mutex::new(()),
            generation: AtomicU64::new(0),
        })
    }

    /// 当前连接状态
    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// 订阅状态变化
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// 当前在途请求数
    pub fn pending_count(&self) -> usize {
        self.tracker.pending_count()
    }

    pub(crate) fn tracker(&self) -> &Arc<RequestTracker> {
        &self.tracker
    }

    fn set_state(&self, state: ConnectionState) {
        let old = self.state_tx.send_replace(state);
        if old != state {
            debug!("Connection state: {} -> {}", old, state);
        }
    }

    fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            self.config.reconnect_initial_delay_ms,
            self.config.reconnect_backoff_multiplier,
            self.config.reconnect_max_delay_ms,
        )
    }

    /// 建立到服务端的传输；已就绪时幂等返回
    pub async fn connect(self: &Arc<Self>) -> ClientResult<()> {
        let _guard = self.connect_lock.lock().await;
        if self.state() == ConnectionState::Ready {
            return Ok(());
        }
        self.set_state(ConnectionState::Connecting);

        let attempts = self.config.max_reconnect_attempts.saturating_add(1);
        let policy = self.backoff_policy();
        let mut last_reason = String::new();
        for attempt in 0..attempts {
            if attempt > 0 {
                sleep(policy.delay(attempt - 1)).await;
            }
            match self.dial().await {
                Ok(stream) => {
                    info!("Connected to {}", self.config.endpoint);
                    self.attach_transport(stream);
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        "Connect attempt {}/{} to {} failed: {}",
                        attempt + 1,
                        attempts,
                        self.config.endpoint,
                        e
                    );
                    last_reason = e.to_string();
                }
            }
        }
        self.set_state(ConnectionState::Failed);
        Err(ClientError::Connect(ConnectError::RetriesExhausted {
            attempts,
            reason: last_reason,
        }))
    }

    async fn dial(&self) -> ClientResult<TcpStream> {
        let endpoint = self.config.endpoint.clone();
        match timeout(self.config.connect_timeout(), TcpStream::connect(&endpoint)).await {
            Ok(Ok(stream)) => {
                let _ = stream.set_nodelay(true);
                Ok(stream)
            }
            Ok(Err(e)) => Err(ClientError::Connect(ConnectError::DialFailed {
                endpoint,
                reason: e.to_string(),
            })),
            Err(_) => Err(ClientError::Connect(ConnectError::DialTimeout { endpoint })),
        }
    }

    /// 把一个已建立的双向字节流挂载为当前传输
    ///
    /// 启动专职读/写任务并把状态置为Ready。
    /// 生产路径由 `connect()` 调用；测试可以直接挂载内存双工流
    pub fn attach_transport<S>(self: &Arc<Self>, stream: S)
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (read_half, write_half) = tokio::io::split(stream);
        let (tx, rx) = mpsc::channel(self.config.max_in_flight_requests.max(1));
        *self.writer_tx.lock() = Some(tx);
        self.set_state(ConnectionState::Ready);

        let manager = Arc::clone(self);
        tokio::spawn(async move {
            writer_loop(manager, generation, rx, write_half).await;
        });
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            reader_loop(manager, generation, read_half).await;
        });
    }

    /// 把一帧排入发送队列
    ///
    /// 状态不是Ready时返回 `NotConnected`；内部发送缓冲满时挂起
    pub async fn send(&self, payload: Vec<u8>) -> ClientResult<()> {
        if self.state() != ConnectionState::Ready {
            return Err(ClientError::NotConnected);
        }
        let tx = self
            .writer_tx
            .lock()
            .clone()
            .ok_or(ClientError::NotConnected)?;
        tx.send(payload)
            .await
            .map_err(|_| ClientError::NotConnected)
    }

    /// 提交一个遍历请求，返回其结果流
    ///
    /// 编码失败在注册和发送之前返回，不会留下在途表残余。
    /// `timeout_override` 为 `None` 时使用配置的默认请求超时
    pub async fn submit(
        self: &Arc<Self>,
        request: TraversalRequest,
        timeout_override: Option<Duration>,
    ) -> ClientResult<ResultStream> {
        let permit = Arc::clone(&self.in_flight)
            .acquire_owned()
            .await
            .map_err(|_| ClientError::Internal("in-flight semaphore closed".to_string()))?;

        // 先编码：不支持的参数类型在任何字节发送之前失败
        let payload = codec::encode_request(&request)?;

        if self.state() != ConnectionState::Ready {
            return Err(ClientError::NotConnected);
        }

        let id = request.id;
        let handle = self.tracker.register(id);
        if let Err(e) = self.send(payload).await {
            self.tracker.cancel(id);
            return Err(e);
        }
        trace!("Submitted request {} ({} steps)", id, request.steps.len());

        let deadline = timeout_override.or_else(|| self.config.request_timeout());
        Ok(ResultStream::new(
            handle,
            Arc::clone(&self.tracker),
            deadline,
            permit,
        ))
    }

    /// 关闭连接
    ///
    /// 先进入Closing，把在途请求全部以 `ConnectionClosed` 失败掉，
    /// 然后进入Disconnected
    pub fn close(&self) {
        let state = self.state();
        if state == ConnectionState::Disconnected || state == ConnectionState::Closing {
            return;
        }
        info!("Closing connection to {}", self.config.endpoint);
        self.set_state(ConnectionState::Closing);
        // 写任务随发送通道关闭而退出；读任务的后续回调因代号失配而作废
        *self.writer_tx.lock() = None;
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.tracker.fail_all(ClientError::ConnectionClosed);
        self.set_state(ConnectionState::Disconnected);
    }

    /// 传输层读/写失败的集中处理
    ///
    /// 只处理当前代传输在Ready状态下的失败；把所有在途请求
    /// 以 `TransportError` 失败掉，再按配置发起有界重连
    fn on_transport_failure(self: &Arc<Self>, generation: u64, error: ClientError) {
        if self.generation.load(Ordering::SeqCst) != generation {
            return;
        }
        if self.state() != ConnectionState::Ready {
            return;
        }
        error!("Transport failure: {}", error);
        *self.writer_tx.lock() = None;
        self.set_state(ConnectionState::Failed);
        self.tracker
            .fail_all(ClientError::Transport(error.to_string()));

        if self.config.max_reconnect_attempts > 0 {
            let manager = Arc::clone(self);
            tokio::spawn(async move {
                manager.reconnect_loop(generation).await;
            });
        }
    }

    /// 有界重连
    ///
    /// `generation` 是失败传输的代号。显式 `close()` 会推进代号，
    /// 每次拨号前和挂载前都重查代号：一个已关闭的连接
    /// 绝不能被退避中的重连任务复活
    async fn reconnect_loop(self: Arc<Self>, generation: u64) {
        let _guard = self.connect_lock.lock().await;
        if self.state() != ConnectionState::Failed
            || self.generation.load(Ordering::SeqCst) != generation
        {
            return;
        }
        let policy = self.backoff_policy();
        for attempt in 0..self.config.max_reconnect_attempts {
            if self.generation.load(Ordering::SeqCst) != generation {
                debug!("Abandoning reconnect: connection was closed");
                return;
            }
            self.set_state(ConnectionState::Connecting);
            sleep(policy.delay(attempt)).await;
            if self.generation.load(Ordering::SeqCst) != generation {
                debug!("Abandoning reconnect: connection was closed");
                return;
            }
            match self.dial().await {
                Ok(stream) => {
                    if self.generation.load(Ordering::SeqCst) != generation {
                        debug!("Abandoning reconnect: connection was closed");
                        return;
                    }
                    info!(
                        "Reconnected to {} after {} attempt(s)",
                        self.config.endpoint,
                        attempt + 1
                    );
                    self.attach_transport(stream);
                    return;
                }
                Err(e) => {
                    warn!(
                        "Reconnect attempt {}/{} failed: {}",
                        attempt + 1,
                        self.config.max_reconnect_attempts,
                        e
                    );
                }
            }
        }
        if self.generation.load(Ordering::SeqCst) != generation {
            return;
        }
        error!(
            "Giving up reconnecting to {} after {} attempt(s)",
            self.config.endpoint, self.config.max_reconnect_attempts
        );
        self.set_state(ConnectionState::Failed);
    }
}

/// 专职写任务：串行写出帧，保证帧原子性
async fn writer_loop<W>(
    manager: Arc<ConnectionManager>,
    generation: u64,
    mut rx: mpsc::Receiver<Vec<u8>>,
    mut writer: W,
) where
    W: AsyncWrite + Send + Unpin,
{
    while let Some(frame) = rx.recv().await {
        if let Err(e) = transport::write_frame(&mut writer, &frame).await {
            manager.on_transport_failure(generation, e);
            return;
        }
    }
    // 发送通道关闭：主动关闭路径，收尾写半边
    let _ = writer.shutdown().await;
}

/// 专职读任务：解帧、解码、按关联标识分发
async fn reader_loop<R>(manager: Arc<ConnectionManager>, generation: u64, mut reader: R)
where
    R: AsyncRead + Send + Unpin,
{
    loop {
        match transport::read_frame(&mut reader).await {
            Ok(Some(payload)) => match codec::decode_response(&payload) {
                Ok(batch) => {
                    trace!(
                        "Received batch for {} ({} item(s), more={})",
                        batch.id,
                        batch.items.len(),
                        batch.more
                    );
                    manager.tracker.resolve(batch);
                }
                Err(e) => {
                    // 解码失败说明流已经不可信，按传输失败处理
                    manager.on_transport_failure(
                        generation,
                        ClientError::Transport(format!("undecodable inbound frame: {}", e)),
                    );
                    return;
                }
            },
            Ok(None) => {
                manager.on_transport_failure(
                    generation,
                    ClientError::Transport("connection closed by server".to_string()),
                );
                return;
            }
            Err(e) => {
                manager.on_transport_failure(generation, e);
                return;
            }
        }
    }
}
