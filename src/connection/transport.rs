//! 帧传输层
//!
//! 核心只把传输当作 send(bytes)/receive()->bytes 的双向字节流，
//! 具体协议在帧层之下被抽象掉。帧格式: `[length:4][payload:N]`

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::codec::MAX_PAYLOAD_SIZE;
use crate::core::error::{ClientError, ClientResult};

/// 读取一个完整的帧
///
/// 在帧边界处遇到干净的EOF返回 `Ok(None)`；
/// 帧中途EOF或长度超限按传输错误处理
pub(crate) async fn read_frame<R>(reader: &mut R) -> ClientResult<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(ClientError::Transport(e.to_string())),
    }
    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_PAYLOAD_SIZE {
        return Err(ClientError::Transport(format!(
            "inbound frame too large: {} bytes",
            len
        )));
    }
    let mut payload = vec![0u8; len];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(|e| ClientError::Transport(e.to_string()))?;
    Ok(Some(payload))
}

/// 写入一个完整的帧并flush
///
/// 调用方保证同一时刻只有一个写入者（专职写任务），
/// 因此帧不会交错
pub(crate) async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> ClientResult<()>
where
    W: AsyncWrite + Unpin,
{
    let len = payload.len() as u32;
    writer
        .write_all(&len.to_le_bytes())
        .await
        .map_err(|e| ClientError::Transport(e.to_string()))?;
    writer
        .write_all(payload)
        .await
        .map_err(|e| ClientError::Transport(e.to_string()))?;
    writer
        .flush()
        .await
        .map_err(|e| ClientError::Transport(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_frame_round_trip() {
        let (mut a, mut b) = tokio::io::duplex(1024);
        write_frame(&mut a, b"hello").await.expect("write should succeed");
        let frame = read_frame(&mut b).await.expect("read should succeed");
        assert_eq!(frame.as_deref(), Some(b"hello".as_slice()));
    }

    #[tokio::test]
    async fn test_clean_eof_returns_none() {
        let (a, mut b) = tokio::io::duplex(1024);
        drop(a);
        let frame = read_frame(&mut b).await.expect("read should succeed");
        assert!(frame.is_none());
    }

    #[tokio::test]
    async fn test_eof_mid_frame_is_transport_error() {
        let (mut a, mut b) = tokio::io::duplex(1024);
        // 只写长度前缀的一半payload就断开
        a.write_all(&8u32.to_le_bytes()).await.expect("write should succeed");
        a.write_all(&[1, 2, 3]).await.expect("write should succeed");
        drop(a);
        let err = read_frame(&mut b).await.expect_err("read should fail");
        assert!(matches!(err, ClientError::Transport(_)));
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected() {
        let (mut a, mut b) = tokio::io::duplex(1024);
        let bogus = (MAX_PAYLOAD_SIZE as u32) + 1;
        a.write_all(&bogus.to_le_bytes()).await.expect("write should succeed");
        let err = read_frame(&mut b).await.expect_err("read should fail");
        assert!(matches!(err, ClientError::Transport(_)));
    }
}
