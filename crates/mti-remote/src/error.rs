//! 远程访问错误类型定义

use mti_protocol::ProtocolError;
use std::io;
use thiserror::Error;

/// 传输层错误（对当前连接是致命的）
#[derive(Error, Debug)]
pub enum TransportError {
    /// 底层 IO 错误
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// 单条消息超过长度上限
    #[error("message exceeds {limit} bytes")]
    MessageTooLarge { limit: usize },

    /// 消息编码失败
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// 服务端错误
#[derive(Error, Debug)]
pub enum ServerError {
    /// 绑定监听地址失败
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// 线程创建失败或 panic
    #[error("server thread error: {0}")]
    Thread(String),
}

/// 客户端错误
#[derive(Error, Debug)]
pub enum RemoteError {
    /// 服务端返回的错误信封
    #[error("remote error: {0}")]
    Remote(String),

    /// 连接已关闭（对端关闭或本地 close）
    #[error("connection closed")]
    ConnectionClosed,

    /// 等待响应超时
    #[error("request timed out")]
    Timeout,

    /// 连接失败
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl RemoteError {
    /// 连接是否已不可用
    ///
    /// 只有服务端返回的错误信封不影响连接；其余错误之后请求/响应可能已经错位。
    pub fn is_fatal(&self) -> bool {
        !matches!(self, RemoteError::Remote(_))
    }

    /// 是否表示对端已断开（EOF、连接被重置或中止、管道断开）
    ///
    /// 服务端关闭时客户端可能看到其中任意一种。
    pub fn is_disconnect(&self) -> bool {
        match self {
            RemoteError::ConnectionClosed => true,
            RemoteError::Transport(TransportError::Io(e)) => matches!(
                e.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }
}
