//! 消息传输
//!
//! 会话循环只依赖 [`MessageTransport`]：收一条完整消息、发一条完整消息。
//! 读操作带超时，超时返回 [`Inbound::Idle`]，让会话有机会检查关闭信号。

use crate::error::TransportError;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

/// 一次读取的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// 一条完整消息（不含结尾换行）
    Message(Vec<u8>),
    /// 读超时，没有完整消息
    Idle,
    /// 对端已关闭
    Closed,
}

/// 消息分帧的双向传输
pub trait MessageTransport: Send {
    /// 读取下一条消息
    fn recv(&mut self) -> Result<Inbound, TransportError>;

    /// 发送一条消息
    fn send(&mut self, message: &[u8]) -> Result<(), TransportError>;
}

/// 基于 TCP 的行分隔传输
///
/// 超时打断的半行数据保留在缓冲区里，下一次 `recv` 继续拼接。
pub struct TcpLineTransport {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
    pending: Vec<u8>,
    max_message_len: usize,
    peer: Option<SocketAddr>,
}

impl TcpLineTransport {
    /// # 参数
    /// - `stream`: 已连接的阻塞 socket
    /// - `read_timeout`: 单次读的超时（`None` 表示一直阻塞）
    /// - `max_message_len`: 单条消息上限（不含换行）
    pub fn new(
        stream: TcpStream,
        read_timeout: Option<Duration>,
        max_message_len: usize,
    ) -> io::Result<Self> {
        stream.set_read_timeout(read_timeout)?;
        stream.set_nodelay(true)?;
        let peer = stream.peer_addr().ok();
        let writer = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(stream),
            writer,
            pending: Vec::new(),
            max_message_len,
            peer,
        })
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// 关闭两个方向（对端的阻塞读会立即返回 EOF）
    pub fn shutdown(&self) {
        let _ = self.writer.shutdown(Shutdown::Both);
    }
}

impl MessageTransport for TcpLineTransport {
    fn recv(&mut self) -> Result<Inbound, TransportError> {
        loop {
            // 多读一个字节给换行符
            let remaining = (self.max_message_len + 1).saturating_sub(self.pending.len());
            if remaining == 0 {
                return Err(TransportError::MessageTooLarge {
                    limit: self.max_message_len,
                });
            }

            let mut limited = (&mut self.reader).take(remaining as u64);
            match limited.read_until(b'\n', &mut self.pending) {
                Ok(0) => {
                    // EOF，半行数据直接丢弃
                    self.pending.clear();
                    return Ok(Inbound::Closed);
                },
                Ok(_) => {
                    if self.pending.last() == Some(&b'\n') {
                        let mut message = std::mem::take(&mut self.pending);
                        message.pop();
                        if message.last() == Some(&b'\r') {
                            message.pop();
                        }
                        return Ok(Inbound::Message(message));
                    }
                    // 没有换行：到达长度上限或 EOF，下一轮处理
                },
                Err(e)
                    if e.kind() == io::ErrorKind::WouldBlock
                        || e.kind() == io::ErrorKind::TimedOut =>
                {
                    return Ok(Inbound::Idle);
                },
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn send(&mut self, message: &[u8]) -> Result<(), TransportError> {
        self.writer.write_all(message)?;
        if message.last() != Some(&b'\n') {
            self.writer.write_all(b"\n")?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
