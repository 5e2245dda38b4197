//! 消息编码器
//!
//! 将遍历请求/响应批次序列化为自描述的字节序列

use std::collections::HashMap;

use super::{kind, tag, MAX_NESTING_DEPTH, MAX_PAYLOAD_SIZE};
use crate::core::error::{CodecError, CodecResult};
use crate::core::value::Value;
use crate::core::vertex_edge::{Edge, Vertex};
use crate::message::{ResponseBatch, TraversalRequest};

/// 编码遍历请求
///
/// 步骤参数不允许包含顶点/边记录——它们只出现在结果中。
/// 在任何字节写入传输之前返回 `UnsupportedType`
pub fn encode_request(request: &TraversalRequest) -> CodecResult<Vec<u8>> {
    let mut w = Writer::new();
    w.put_u8(kind::REQUEST);
    w.put_slice(request.id.as_bytes());
    w.put_u32(request.options.batch_size);
    w.put_u32(request.steps.len() as u32);
    for step in &request.steps {
        w.put_str(&step.name);
        w.put_u32(step.args.len() as u32);
        for arg in &step.args {
            w.put_value(arg, false, 0)?;
        }
    }
    w.finish()
}

/// 编码响应批次
pub fn encode_response(batch: &ResponseBatch) -> CodecResult<Vec<u8>> {
    let mut w = Writer::new();
    w.put_u8(kind::RESPONSE);
    w.put_slice(batch.id.as_bytes());
    w.put_u16(batch.code);
    w.put_str(&batch.message);
    w.put_u8(batch.more as u8);
    w.put_u32(batch.items.len() as u32);
    for item in &batch.items {
        w.put_value(item, true, 0)?;
    }
    w.finish()
}

/// 增量写入缓冲区，标量统一小端编码
struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    fn new() -> Self {
        Self { buf: Vec::new() }
    }

    fn finish(self) -> CodecResult<Vec<u8>> {
        if self.buf.len() > MAX_PAYLOAD_SIZE {
            return Err(CodecError::FrameTooLarge {
                size: self.buf.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }
        Ok(self.buf)
    }

    fn put_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn put_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn put_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn put_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn put_f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn put_slice(&mut self, v: &[u8]) {
        self.buf.extend_from_slice(v);
    }

    fn put_str(&mut self, v: &str) {
        self.put_u32(v.len() as u32);
        self.buf.extend_from_slice(v.as_bytes());
    }

    fn put_bytes(&mut self, v: &[u8]) {
        self.put_u32(v.len() as u32);
        self.buf.extend_from_slice(v);
    }

    /// 写入一个带类型标签的值
    ///
    /// `allow_records` 为 false 时拒绝顶点/边（请求参数路径）。
    /// 嵌套深度与解码端共用同一上限，超过即拒绝
    fn put_value(&mut self, value: &Value, allow_records: bool, depth: usize) -> CodecResult<()> {
        if depth > MAX_NESTING_DEPTH {
            return Err(CodecError::Malformed(format!(
                "value nesting exceeds {} levels",
                MAX_NESTING_DEPTH
            )));
        }
        match value {
            Value::Null => self.put_u8(tag::NULL),
            Value::Bool(b) => {
                self.put_u8(tag::BOOL);
                self.put_u8(*b as u8);
            }
            Value::Int(i) => {
                self.put_u8(tag::INT);
                self.put_i64(*i);
            }
            Value::Float(f) => {
                self.put_u8(tag::FLOAT);
                self.put_f64(*f);
            }
            Value::String(s) => {
                self.put_u8(tag::STRING);
                self.put_str(s);
            }
            Value::Bytes(b) => {
                self.put_u8(tag::BYTES);
                self.put_bytes(b);
            }
            Value::List(items) => {
                self.put_u8(tag::LIST);
                self.put_u32(items.len() as u32);
                for item in items {
                    self.put_value(item, allow_records, depth + 1)?;
                }
            }
            Value::Map(map) => {
                self.put_u8(tag::MAP);
                self.put_u32(map.len() as u32);
                // 按键排序，保证编码结果确定
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                for key in keys {
                    self.put_str(key);
                    self.put_value(&map[key], allow_records, depth + 1)?;
                }
            }
            Value::Vertex(v) => {
                if !allow_records {
                    return Err(CodecError::UnsupportedType(value.get_type().name()));
                }
                self.put_u8(tag::VERTEX);
                self.put_vertex(v, depth + 1)?;
            }
            Value::Edge(e) => {
                if !allow_records {
                    return Err(CodecError::UnsupportedType(value.get_type().name()));
                }
                self.put_u8(tag::EDGE);
                self.put_edge(e, depth + 1)?;
            }
        }
        Ok(())
    }

    fn put_properties(
        &mut self,
        properties: &HashMap<String, Vec<Value>>,
        depth: usize,
    ) -> CodecResult<()> {
        self.put_u32(properties.len() as u32);
        let mut keys: Vec<&String> = properties.keys().collect();
        keys.sort();
        for key in keys {
            self.put_str(key);
            let values = &properties[key];
            self.put_u32(values.len() as u32);
            for value in values {
                self.put_value(value, true, depth)?;
            }
        }
        Ok(())
    }

    fn put_vertex(&mut self, vertex: &Vertex, depth: usize) -> CodecResult<()> {
        self.put_value(&vertex.id, true, depth)?;
        self.put_str(&vertex.label);
        self.put_properties(&vertex.properties, depth)
    }

    fn put_edge(&mut self, edge: &Edge, depth: usize) -> CodecResult<()> {
        self.put_value(&edge.id, true, depth)?;
        self.put_str(&edge.label);
        self.put_value(&edge.src, true, depth)?;
        self.put_value(&edge.dst, true, depth)?;
        self.put_properties(&edge.properties, depth)
    }
}
