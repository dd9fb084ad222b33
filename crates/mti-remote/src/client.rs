//! 远程航向客户端
//!
//! 通过一条持久连接向服务端发送 `heading` 命令。请求串行化：同一时刻只有一个
//! 请求在途，响应按顺序对应。超时、对端关闭等致命错误之后连接被丢弃，
//! 后续请求返回 [`RemoteError::ConnectionClosed`]。

use crate::error::RemoteError;
use crate::transport::{Inbound, MessageTransport, TcpLineTransport};
use mti_driver::{HeadingSensor, SensorProperties};
use mti_protocol::{Command, DEFAULT_MAX_MESSAGE_LEN, Response, decode_response, encode_line};
use parking_lot::Mutex;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::{debug, trace};

/// 客户端配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// 服务端地址
    pub addr: String,
    /// 连接、读、写超时
    pub timeout: Duration,
    /// 单条响应上限（字节）
    pub max_message_len: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            addr: "localhost:4444".to_string(),
            timeout: Duration::from_secs(5),
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
        }
    }
}

impl ClientConfig {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            ..Default::default()
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// 远程航向传感器
pub struct RemoteCompass {
    transport: Mutex<Option<TcpLineTransport>>,
    peer: SocketAddr,
}

impl RemoteCompass {
    /// 连接服务端（依次尝试解析出的每个地址）
    pub fn connect(config: &ClientConfig) -> Result<Self, RemoteError> {
        let connect_error = |source| RemoteError::Connect {
            addr: config.addr.clone(),
            source,
        };

        let mut last_error = None;
        let mut connected = None;
        for addr in config.addr.to_socket_addrs().map_err(connect_error)? {
            match TcpStream::connect_timeout(&addr, config.timeout) {
                Ok(stream) => {
                    connected = Some((stream, addr));
                    break;
                },
                Err(e) => last_error = Some(e),
            }
        }
        let (stream, peer) = connected.ok_or_else(|| {
            connect_error(last_error.unwrap_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, "address resolved to nothing")
            }))
        })?;

        stream.set_write_timeout(Some(config.timeout)).map_err(connect_error)?;
        let transport = TcpLineTransport::new(stream, Some(config.timeout), config.max_message_len)
            .map_err(connect_error)?;
        debug!(%peer, "connected to heading server");

        Ok(Self {
            transport: Mutex::new(Some(transport)),
            peer,
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn is_closed(&self) -> bool {
        self.transport.lock().is_none()
    }

    /// 发送一条命令并等待响应
    ///
    /// 错误信封作为 `Ok(Response::Error(..))` 返回。
    pub fn call(&self, command: &Command) -> Result<Response, RemoteError> {
        let mut guard = self.transport.lock();
        let transport = guard.as_mut().ok_or(RemoteError::ConnectionClosed)?;

        let result = Self::round_trip(transport, command);
        if let Err(e) = &result
            && e.is_fatal()
        {
            trace!("dropping connection after error: {}", e);
            if let Some(transport) = guard.take() {
                transport.shutdown();
            }
        }
        result
    }

    fn round_trip(
        transport: &mut TcpLineTransport,
        command: &Command,
    ) -> Result<Response, RemoteError> {
        transport.send(&encode_line(command)?)?;
        match transport.recv()? {
            Inbound::Message(line) => Ok(decode_response(&line)?),
            Inbound::Idle => Err(RemoteError::Timeout),
            Inbound::Closed => Err(RemoteError::ConnectionClosed),
        }
    }

    /// 最新航向角，服务端未知时为 NaN
    pub fn heading(&self) -> Result<f64, RemoteError> {
        self.call(&Command::heading())?
            .into_heading()?
            .map_err(RemoteError::Remote)
    }

    /// 关闭连接（幂等）
    pub fn close(&self) -> Result<(), RemoteError> {
        if let Some(transport) = self.transport.lock().take() {
            transport.shutdown();
            debug!(peer = %self.peer, "disconnected from heading server");
        }
        Ok(())
    }
}

impl HeadingSensor for RemoteCompass {
    type Error = RemoteError;

    fn heading(&self) -> Result<f64, RemoteError> {
        RemoteCompass::heading(self)
    }

    fn properties(&self) -> SensorProperties {
        SensorProperties {
            compass_heading_supported: true,
        }
    }

    fn close(&self) -> Result<(), RemoteError> {
        RemoteCompass::close(self)
    }
}

impl std::fmt::Debug for RemoteCompass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteCompass")
            .field("peer", &self.peer)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Drop for RemoteCompass {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
