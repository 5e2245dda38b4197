//! 集成测试公共设施
//!
//! 一个说线上协议的进程内模拟图服务：监听回环地址，
//! 逐帧解码遍历请求，在内存图上解释执行，并按请求的
//! batch_size 分批回发响应。用于驱动公开API的端到端测试

#![allow(dead_code)]

use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use graphdb_client::codec::{decode_request, encode_response};
use graphdb_client::message::{ResponseBatch, Step, TraversalRequest};
use graphdb_client::{Edge, Value, Vertex};

/// 模拟服务行为开关
#[derive(Debug, Clone, Default)]
pub struct ServerOptions {
    /// 每个连接读到第N帧起不再回应、累积到N帧后断开，模拟传输失败
    pub drop_after_frames: Option<usize>,
    /// 回应前的人为延迟，用于超时/取消测试
    pub respond_delay: Option<Duration>,
}

/// 进程内模拟图服务
pub struct MockServer {
    pub addr: SocketAddr,
    store: Arc<Mutex<GraphStore>>,
}

impl MockServer {
    pub async fn spawn(options: ServerOptions) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind should succeed");
        let addr = listener.local_addr().expect("local addr should resolve");
        let store = Arc::new(Mutex::new(GraphStore::default()));

        let conn_store = Arc::clone(&store);
        tokio::spawn(async move {
            loop {
                let (socket, _) = match listener.accept().await {
                    Ok(pair) => pair,
                    Err(_) => return,
                };
                let store = Arc::clone(&conn_store);
                let options = options.clone();
                tokio::spawn(async move {
                    handle_connection(socket, store, options).await;
                });
            }
        });

        Self { addr, store }
    }

    pub fn endpoint(&self) -> String {
        self.addr.to_string()
    }

    pub fn vertex_count(&self) -> usize {
        self.store.lock().vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.store.lock().edges.len()
    }
}

async fn handle_connection(
    mut socket: TcpStream,
    store: Arc<Mutex<GraphStore>>,
    options: ServerOptions,
) {
    let mut frames_read = 0usize;
    loop {
        let payload = match read_frame(&mut socket).await {
            Some(payload) => payload,
            None => return,
        };
        frames_read += 1;
        if let Some(limit) = options.drop_after_frames {
            if frames_read < limit {
                // 吞掉前面的帧，攒够limit帧后一并断开
                continue;
            }
            // 模拟传输失败：不回应，直接断开
            return;
        }

        let request = match decode_request(&payload) {
            Ok(request) => request,
            Err(_) => return,
        };

        if let Some(delay) = options.respond_delay {
            tokio::time::sleep(delay).await;
        }

        for batch in execute(&store, &request) {
            let bytes = encode_response(&batch).expect("response encode should succeed");
            if write_frame(&mut socket, &bytes).await.is_err() {
                return;
            }
        }
    }
}

async fn read_frame(socket: &mut TcpStream) -> Option<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    socket.read_exact(&mut len_buf).await.ok()?;
    let len = u32::from_le_bytes(len_buf) as usize;
    let mut payload = vec![0u8; len];
    socket.read_exact(&mut payload).await.ok()?;
    Some(payload)
}

async fn write_frame(socket: &mut TcpStream, payload: &[u8]) -> std::io::Result<()> {
    socket.write_all(&(payload.len() as u32).to_le_bytes()).await?;
    socket.write_all(payload).await?;
    socket.flush().await
}

/// 内存图存储
#[derive(Debug, Default)]
struct GraphStore {
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    next_id: i64,
}

impl GraphStore {
    fn fresh_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn vertex(&self, id: i64) -> Option<&Vertex> {
        self.vertices.iter().find(|v| v.id == Value::Int(id))
    }

    fn vertex_mut(&mut self, id: i64) -> Option<&mut Vertex> {
        self.vertices.iter_mut().find(|v| v.id == Value::Int(id))
    }

    fn edge(&self, id: i64) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == Value::Int(id))
    }

    fn edge_mut(&mut self, id: i64) -> Option<&mut Edge> {
        self.edges.iter_mut().find(|e| e.id == Value::Int(id))
    }
}

/// 遍历管线中的当前元素
#[derive(Debug, Clone)]
enum Elem {
    V(i64),
    E(i64),
    Val(Value),
}

/// 在内存图上解释执行一个遍历请求，产出响应批次序列
fn execute(store: &Arc<Mutex<GraphStore>>, request: &TraversalRequest) -> Vec<ResponseBatch> {
    // 毒丸参数：先交付一个部分批次，然后以服务端错误终止
    let poisoned = request
        .steps
        .iter()
        .any(|s| s.args.contains(&Value::String("__boom".to_string())));
    if poisoned {
        return vec![
            ResponseBatch::partial(request.id, vec![Value::Int(1)]),
            ResponseBatch::server_error(request.id, "traversal execution failed".to_string()),
        ];
    }

    let mut graph = store.lock();
    let items = match run_steps(&mut graph, &request.steps) {
        Ok(items) => items,
        Err(message) => {
            return vec![ResponseBatch::server_error(request.id, message)];
        }
    };
    drop(graph);

    // 按请求的batch_size分批
    let batch_size = request.options.batch_size.max(1) as usize;
    if items.len() <= batch_size {
        return vec![ResponseBatch::success(request.id, items)];
    }
    let mut batches = Vec::new();
    let chunks: Vec<Vec<Value>> = items
        .chunks(batch_size)
        .map(|chunk| chunk.to_vec())
        .collect();
    let last = chunks.len() - 1;
    for (i, chunk) in chunks.into_iter().enumerate() {
        if i == last {
            batches.push(ResponseBatch::success(request.id, chunk));
        } else {
            batches.push(ResponseBatch::partial(request.id, chunk));
        }
    }
    batches
}

fn run_steps(graph: &mut GraphStore, steps: &[Step]) -> Result<Vec<Value>, String> {
    let mut current: Vec<Elem> = Vec::new();
    // addE需要跨步骤记住标签和源顶点，直到to步骤出现
    let mut pending_edge: Option<(String, i64)> = None;

    for step in steps {
        match step.name.as_str() {
            "V" => {
                if let Some(arg) = step.args.first() {
                    current = graph
                        .vertices
                        .iter()
                        .filter(|v| &v.id == arg)
                        .map(|v| Elem::V(int_id(&v.id)))
                        .collect();
                } else {
                    current = graph
                        .vertices
                        .iter()
                        .map(|v| Elem::V(int_id(&v.id)))
                        .collect();
                }
            }
            "E" => {
                current = graph
                    .edges
                    .iter()
                    .map(|e| Elem::E(int_id(&e.id)))
                    .collect();
            }
            "hasLabel" => {
                let label = str_arg(step, 0)?;
                current.retain(|elem| match elem {
                    Elem::V(id) => graph.vertex(*id).map(|v| v.label == label).unwrap_or(false),
                    Elem::E(id) => graph.edge(*id).map(|e| e.label == label).unwrap_or(false),
                    Elem::Val(_) => false,
                });
            }
            "has" => {
                let key = str_arg(step, 0)?;
                let expected = step.args.get(1).cloned().ok_or("has: missing value")?;
                current.retain(|elem| {
                    let prop = match elem {
                        Elem::V(id) => graph.vertex(*id).and_then(|v| v.property(&key)).cloned(),
                        Elem::E(id) => graph.edge(*id).and_then(|e| e.property(&key)).cloned(),
                        Elem::Val(_) => None,
                    };
                    prop.as_ref() == Some(&expected)
                });
            }
            "hasId" => {
                let expected = step.args.first().cloned().ok_or("hasId: missing id")?;
                current.retain(|elem| match elem {
                    Elem::V(id) | Elem::E(id) => Value::Int(*id) == expected,
                    Elem::Val(_) => false,
                });
            }
            "values" => {
                let key = str_arg(step, 0)?;
                let mut next = Vec::new();
                for elem in &current {
                    let values = match elem {
                        Elem::V(id) => graph
                            .vertex(*id)
                            .and_then(|v| v.property_values(&key))
                            .map(|vs| vs.to_vec()),
                        Elem::E(id) => graph
                            .edge(*id)
                            .and_then(|e| e.properties.get(&key))
                            .cloned(),
                        Elem::Val(_) => None,
                    };
                    if let Some(values) = values {
                        next.extend(values.into_iter().map(Elem::Val));
                    }
                }
                current = next;
            }
            "addV" => {
                let label = str_arg(step, 0)?;
                let id = graph.fresh_id();
                graph.vertices.push(Vertex::new(Value::Int(id), label));
                current = vec![Elem::V(id)];
            }
            "addE" => {
                let label = str_arg(step, 0)?;
                let src = match current.as_slice() {
                    [Elem::V(id)] => *id,
                    _ => return Err("addE: expected a single source vertex".to_string()),
                };
                pending_edge = Some((label, src));
            }
            "to" => {
                let (label, src) = pending_edge
                    .take()
                    .ok_or("to: no pending addE")?;
                let dst_value = step.args.first().cloned().ok_or("to: missing target")?;
                let dst = int_id(&dst_value);
                if graph.vertex(dst).is_none() {
                    return Err(format!("to: unknown target vertex {}", dst_value));
                }
                let id = graph.fresh_id();
                graph.edges.push(Edge::new(
                    Value::Int(id),
                    label,
                    Value::Int(src),
                    Value::Int(dst),
                ));
                current = vec![Elem::E(id)];
            }
            "property" => {
                let key = str_arg(step, 0)?;
                let value = step.args.get(1).cloned().ok_or("property: missing value")?;
                for elem in &current {
                    match elem {
                        Elem::V(id) => {
                            if let Some(v) = graph.vertex_mut(*id) {
                                v.properties.insert(key.clone(), vec![value.clone()]);
                            }
                        }
                        Elem::E(id) => {
                            if let Some(e) = graph.edge_mut(*id) {
                                e.properties.insert(key.clone(), vec![value.clone()]);
                            }
                        }
                        Elem::Val(_) => {}
                    }
                }
            }
            "out" => {
                let label = str_arg(step, 0)?;
                current = neighbors(graph, &current, &label)
                    .into_iter()
                    .map(Elem::V)
                    .collect();
            }
            "outE" => {
                let label = str_arg(step, 0)?;
                let src_ids: Vec<i64> = vertex_ids(&current);
                current = graph
                    .edges
                    .iter()
                    .filter(|e| e.label == label && src_ids.contains(&int_id(&e.src)))
                    .map(|e| Elem::E(int_id(&e.id)))
                    .collect();
            }
            "inV" => {
                let edge_ids: Vec<i64> = current
                    .iter()
                    .filter_map(|elem| match elem {
                        Elem::E(id) => Some(*id),
                        _ => None,
                    })
                    .collect();
                current = edge_ids
                    .iter()
                    .filter_map(|id| graph.edge(*id).map(|e| Elem::V(int_id(&e.dst))))
                    .collect();
            }
            "drop" => {
                // 被删元素的标识作为结果项产出，调用方据此得到受影响数量
                let mut dropped = Vec::new();
                for elem in &current {
                    match elem {
                        Elem::V(id) => {
                            graph.vertices.retain(|v| v.id != Value::Int(*id));
                            graph
                                .edges
                                .retain(|e| e.src != Value::Int(*id) && e.dst != Value::Int(*id));
                            dropped.push(Value::Int(*id));
                        }
                        Elem::E(id) => {
                            graph.edges.retain(|e| e.id != Value::Int(*id));
                            dropped.push(Value::Int(*id));
                        }
                        Elem::Val(_) => {}
                    }
                }
                current = dropped.into_iter().map(Elem::Val).collect();
            }
            "count" => {
                current = vec![Elem::Val(Value::Int(current.len() as i64))];
            }
            "limit" => {
                let n = match step.args.first() {
                    Some(Value::Int(n)) => *n as usize,
                    _ => return Err("limit: missing count".to_string()),
                };
                current.truncate(n);
            }
            other => return Err(format!("unsupported step: {}", other)),
        }
    }

    Ok(current
        .into_iter()
        .map(|elem| materialize(graph, elem))
        .collect())
}

fn materialize(graph: &GraphStore, elem: Elem) -> Value {
    match elem {
        Elem::V(id) => graph
            .vertex(id)
            .map(|v| Value::Vertex(Box::new(v.clone())))
            .unwrap_or(Value::Null),
        Elem::E(id) => graph
            .edge(id)
            .map(|e| Value::Edge(Box::new(e.clone())))
            .unwrap_or(Value::Null),
        Elem::Val(value) => value,
    }
}

fn neighbors(graph: &GraphStore, current: &[Elem], label: &str) -> Vec<i64> {
    let src_ids = vertex_ids(current);
    graph
        .edges
        .iter()
        .filter(|e| e.label == label && src_ids.contains(&int_id(&e.src)))
        .map(|e| int_id(&e.dst))
        .collect()
}

fn vertex_ids(current: &[Elem]) -> Vec<i64> {
    current
        .iter()
        .filter_map(|elem| match elem {
            Elem::V(id) => Some(*id),
            _ => None,
        })
        .collect()
}

fn int_id(value: &Value) -> i64 {
    value.as_int().unwrap_or(-1)
}

fn str_arg(step: &Step, index: usize) -> Result<String, String> {
    match step.args.get(index) {
        Some(Value::String(s)) => Ok(s.clone()),
        other => Err(format!("{}: expected string arg, got {:?}", step.name, other)),
    }
}

/// 预置一个带属性的顶点，返回其标识
pub fn seed_vertex(
    server: &MockServer,
    label: &str,
    props: &[(&str, Value)],
) -> Value {
    let mut graph = server.store.lock();
    let id = graph.fresh_id();
    let mut properties = HashMap::new();
    for (key, value) in props {
        properties.insert(key.to_string(), vec![value.clone()]);
    }
    graph.vertices.push(Vertex::with_properties(
        Value::Int(id),
        label.to_string(),
        properties,
    ));
    Value::Int(id)
}
