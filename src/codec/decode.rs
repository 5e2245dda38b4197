//! 消息解码器
//!
//! 从字节序列重建遍历请求/响应批次，对类型标签做穷尽匹配。
//! 任何越界读取返回 `Truncated`，未知标签返回 `UnknownTag`，
//! 嵌套超过 `MAX_NESTING_DEPTH` 返回 `Malformed`

use std::collections::HashMap;

use super::{kind, tag, MAX_NESTING_DEPTH};
use crate::core::error::{CodecError, CodecResult};
use crate::core::value::Value;
use crate::core::vertex_edge::{Edge, Vertex};
use crate::message::{CorrelationId, RequestOptions, ResponseBatch, Step, TraversalRequest};

/// 解码遍历请求
pub fn decode_request(buf: &[u8]) -> CodecResult<TraversalRequest> {
    let mut c = Cursor::new(buf);
    let k = c.take_u8()?;
    if k != kind::REQUEST {
        return Err(CodecError::Malformed(format!(
            "expected request kind, got {:#04x}",
            k
        )));
    }
    let id = c.take_correlation_id()?;
    let batch_size = c.take_u32()?;
    let step_count = c.take_u32()?;
    let mut steps = Vec::with_capacity(step_count as usize);
    for _ in 0..step_count {
        let name = c.take_str()?;
        let arg_count = c.take_u32()?;
        let mut args = Vec::with_capacity(arg_count as usize);
        for _ in 0..arg_count {
            args.push(c.take_value(0)?);
        }
        steps.push(Step { name, args });
    }
    c.expect_end()?;
    Ok(TraversalRequest {
        id,
        steps,
        options: RequestOptions { batch_size },
    })
}

/// 解码响应批次
pub fn decode_response(buf: &[u8]) -> CodecResult<ResponseBatch> {
    let mut c = Cursor::new(buf);
    let k = c.take_u8()?;
    if k != kind::RESPONSE {
        return Err(CodecError::Malformed(format!(
            "expected response kind, got {:#04x}",
            k
        )));
    }
    let id = c.take_correlation_id()?;
    let code = c.take_u16()?;
    let message = c.take_str()?;
    let more = c.take_u8()? != 0;
    let item_count = c.take_u32()?;
    let mut items = Vec::with_capacity(item_count as usize);
    for _ in 0..item_count {
        items.push(c.take_value(0)?);
    }
    c.expect_end()?;
    Ok(ResponseBatch {
        id,
        code,
        message,
        items,
        more,
    })
}

/// 只进游标读取器
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> CodecResult<&'a [u8]> {
        if self.pos + n > self.buf.len() {
            return Err(CodecError::Truncated {
                needed: n,
                have: self.buf.len() - self.pos,
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn expect_end(&self) -> CodecResult<()> {
        if self.pos != self.buf.len() {
            return Err(CodecError::Malformed(format!(
                "{} trailing bytes after message",
                self.buf.len() - self.pos
            )));
        }
        Ok(())
    }

    fn take_u8(&mut self) -> CodecResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn take_u16(&mut self) -> CodecResult<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn take_u32(&mut self) -> CodecResult<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn take_i64(&mut self) -> CodecResult<i64> {
        let b = self.take(8)?;
        Ok(i64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    fn take_f64(&mut self) -> CodecResult<f64> {
        let b = self.take(8)?;
        Ok(f64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    fn take_correlation_id(&mut self) -> CodecResult<CorrelationId> {
        let b = self.take(16)?;
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(b);
        Ok(CorrelationId::from_bytes(bytes))
    }

    fn take_str(&mut self) -> CodecResult<String> {
        let len = self.take_u32()? as usize;
        let bytes = self.take(len)?;
        Ok(String::from_utf8(bytes.to_vec())?)
    }

    /// `depth` 是当前值的嵌套层数，超过上限视为畸形帧——
    /// 递归深度必须有界，解码绝不能被入站数据打爆栈
    fn take_value(&mut self, depth: usize) -> CodecResult<Value> {
        if depth > MAX_NESTING_DEPTH {
            return Err(CodecError::Malformed(format!(
                "value nesting exceeds {} levels",
                MAX_NESTING_DEPTH
            )));
        }
        let t = self.take_u8()?;
        match t {
            tag::NULL => Ok(Value::Null),
            tag::BOOL => Ok(Value::Bool(self.take_u8()? != 0)),
            tag::INT => Ok(Value::Int(self.take_i64()?)),
            tag::FLOAT => Ok(Value::Float(self.take_f64()?)),
            tag::STRING => Ok(Value::String(self.take_str()?)),
            tag::BYTES => {
                let len = self.take_u32()? as usize;
                Ok(Value::Bytes(self.take(len)?.to_vec()))
            }
            tag::LIST => {
                let count = self.take_u32()?;
                let mut items = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    items.push(self.take_value(depth + 1)?);
                }
                Ok(Value::List(items))
            }
            tag::MAP => {
                let count = self.take_u32()?;
                let mut map = HashMap::with_capacity(count as usize);
                for _ in 0..count {
                    let key = self.take_str()?;
                    map.insert(key, self.take_value(depth + 1)?);
                }
                Ok(Value::Map(map))
            }
            tag::VERTEX => Ok(Value::Vertex(Box::new(self.take_vertex(depth + 1)?))),
            tag::EDGE => Ok(Value::Edge(Box::new(self.take_edge(depth + 1)?))),
            other => Err(CodecError::UnknownTag(other)),
        }
    }

    fn take_properties(&mut self, depth: usize) -> CodecResult<HashMap<String, Vec<Value>>> {
        let count = self.take_u32()?;
        let mut properties = HashMap::with_capacity(count as usize);
        for _ in 0..count {
            let key = self.take_str()?;
            let value_count = self.take_u32()?;
            let mut values = Vec::with_capacity(value_count as usize);
            for _ in 0..value_count {
                values.push(self.take_value(depth)?);
            }
            properties.insert(key, values);
        }
        Ok(properties)
    }

    fn take_vertex(&mut self, depth: usize) -> CodecResult<Vertex> {
        let id = self.take_value(depth)?;
        let label = self.take_str()?;
        let properties = self.take_properties(depth)?;
        Ok(Vertex {
            id,
            label,
            properties,
        })
    }

    fn take_edge(&mut self, depth: usize) -> CodecResult<Edge> {
        let id = self.take_value(depth)?;
        let label = self.take_str()?;
        let src = self.take_value(depth)?;
        let dst = self.take_value(depth)?;
        let properties = self.take_properties(depth)?;
        Ok(Edge {
            id,
            label,
            src,
            dst,
            properties,
        })
    }
}
