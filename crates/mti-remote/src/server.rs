//! 航向服务端
//!
//! 一个接受线程 + 每连接一个会话线程。关闭标志由 [`ServerHandle`] 设置：
//! 接受线程在下一次轮询时退出，关闭所有会话 socket 的两个方向，
//! 阻塞在读或写上的会话线程随即返回，接受线程最后 join 所有会话线程。

use crate::error::ServerError;
use crate::registry::CommandRegistry;
use crate::session::{ConnectionSession, SessionEnd};
use crate::stats::{ServerStats, ServerStatsSnapshot};
use crate::transport::TcpLineTransport;
use mti_protocol::DEFAULT_MAX_MESSAGE_LEN;
use std::io;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{Span, debug, error, info, info_span, warn};

/// 服务端配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// 监听地址
    pub bind_addr: String,
    /// 会话读超时（决定会话观察到关闭信号的最长延迟）
    pub read_poll_interval: Duration,
    /// 会话写超时（对端不读取响应时，发送最多阻塞这么久）
    pub write_timeout: Duration,
    /// 接受循环轮询间隔
    pub accept_poll_interval: Duration,
    /// 单条消息上限（字节）
    pub max_message_len: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "localhost:4444".to_string(),
            read_poll_interval: Duration::from_millis(100),
            write_timeout: Duration::from_secs(5),
            accept_poll_interval: Duration::from_millis(10),
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
        }
    }
}

impl ServerConfig {
    /// 在本机回环地址上监听指定端口
    pub fn with_port(port: u16) -> Self {
        Self::with_host_port("localhost", port)
    }

    /// 在指定主机地址上监听指定端口
    ///
    /// 协议没有鉴权，`0.0.0.0` 会把航向暴露给所有网络接口。
    pub fn with_host_port(host: &str, port: u16) -> Self {
        Self {
            bind_addr: format!("{}:{}", host, port),
            ..Default::default()
        }
    }
}

/// 运行中的会话线程
struct SessionThread {
    handle: JoinHandle<()>,
    /// 与会话共享同一个 socket，关闭时用来打断阻塞的读写
    stream: TcpStream,
}

/// 已绑定、尚未启动的服务端
pub struct HeadingServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    registry: Arc<CommandRegistry>,
    config: ServerConfig,
    span: Span,
}

impl HeadingServer {
    /// 绑定监听地址
    pub fn bind(config: ServerConfig, registry: CommandRegistry) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(&config.bind_addr).map_err(|source| ServerError::Bind {
            addr: config.bind_addr.clone(),
            source,
        })?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;
        let span = info_span!("heading_server", addr = %local_addr);

        Ok(Self {
            listener,
            local_addr,
            registry: Arc::new(registry),
            config,
            span,
        })
    }

    /// 设置日志 span（默认 `heading_server{addr=...}`）
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// 启动接受线程
    pub fn spawn(self) -> Result<ServerHandle, ServerError> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let stats = Arc::new(ServerStats::new());
        let local_addr = self.local_addr;

        let shutdown_clone = shutdown.clone();
        let stats_clone = stats.clone();
        let accept_thread = thread::Builder::new()
            .name("mti-accept".into())
            .spawn(move || self.accept_loop(shutdown_clone, stats_clone))
            .map_err(|e| ServerError::Thread(format!("Failed to spawn accept thread: {}", e)))?;

        Ok(ServerHandle {
            shutdown,
            stats,
            local_addr,
            accept_thread: Some(accept_thread),
        })
    }

    fn accept_loop(self, shutdown: Arc<AtomicBool>, stats: Arc<ServerStats>) {
        let _enter = self.span.enter();
        info!("listening");

        let mut sessions: Vec<SessionThread> = Vec::new();
        while !shutdown.load(Ordering::Acquire) {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    stats.connections_accepted.fetch_add(1, Ordering::Relaxed);
                    match self.spawn_session(stream, peer, &shutdown, &stats) {
                        Ok(session) => sessions.push(session),
                        Err(e) => warn!(%peer, "Failed to start session: {}", e),
                    }
                },
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(self.config.accept_poll_interval);
                },
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!("Accept failed: {}", e);
                    thread::sleep(self.config.accept_poll_interval);
                },
            }

            // 已结束的会话线程直接回收
            sessions.retain(|session| !session.handle.is_finished());
        }

        info!(sessions = sessions.len(), "shutting down");
        for session in &sessions {
            let _ = session.stream.shutdown(Shutdown::Both);
        }
        for session in sessions {
            if session.handle.join().is_err() {
                error!("Session thread panicked");
            }
        }
        info!("stopped");
    }

    fn spawn_session(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
        shutdown: &Arc<AtomicBool>,
        stats: &Arc<ServerStats>,
    ) -> Result<SessionThread, ServerError> {
        // 非阻塞 listener 接受的 socket 在部分平台上会继承非阻塞标志
        stream.set_nonblocking(false)?;
        stream.set_write_timeout(Some(self.config.write_timeout))?;
        let control = stream.try_clone()?;
        let transport = TcpLineTransport::new(
            stream,
            Some(self.config.read_poll_interval),
            self.config.max_message_len,
        )?;

        let registry = self.registry.clone();
        let shutdown = shutdown.clone();
        let stats = stats.clone();
        let span = info_span!(parent: &self.span, "session", %peer);

        let handle = thread::Builder::new()
            .name(format!("mti-session-{}", peer))
            .spawn(move || {
                let _enter = span.enter();
                stats.session_opened();
                debug!("connection opened");

                let mut session =
                    ConnectionSession::new(transport, registry, shutdown, stats.clone());
                match session.run() {
                    SessionEnd::PeerClosed => debug!("connection closed by peer"),
                    SessionEnd::Shutdown => debug!("connection closed by server shutdown"),
                    SessionEnd::Failed(e) => warn!("connection failed: {}", e),
                }
                stats.session_closed();
            })
            .map_err(|e| ServerError::Thread(format!("Failed to spawn session thread: {}", e)))?;

        Ok(SessionThread {
            handle,
            stream: control,
        })
    }
}

/// 运行中的服务端
///
/// Drop 时自动关闭并等待所有线程退出。
pub struct ServerHandle {
    shutdown: Arc<AtomicBool>,
    stats: Arc<ServerStats>,
    local_addr: SocketAddr,
    accept_thread: Option<JoinHandle<()>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn stats(&self) -> ServerStatsSnapshot {
        self.stats.snapshot()
    }

    /// 发出关闭信号（不等待）
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// 关闭并等待接受线程和所有会话线程退出
    pub fn join(mut self) -> Result<(), ServerError> {
        self.shutdown();
        self.join_inner()
    }

    fn join_inner(&mut self) -> Result<(), ServerError> {
        match self.accept_thread.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| ServerError::Thread("accept thread panicked".to_string())),
            None => Ok(()),
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.shutdown();
        if let Err(e) = self.join_inner() {
            error!("Failed to stop heading server: {}", e);
        }
    }
}
