//! 连接会话
//!
//! 每个连接一个顺序循环：`AwaitingCommand ⇄ Dispatching → Closed`。
//! 一次只处理一条请求，响应发出之后才读下一条。
//!
//! - 未知命令、格式错误的请求：返回错误信封，会话继续
//! - 读写失败、对端关闭、服务端关闭：会话结束，只影响这一个连接

use crate::error::TransportError;
use crate::registry::CommandRegistry;
use crate::stats::ServerStats;
use crate::transport::{Inbound, MessageTransport};
use mti_protocol::{Response, decode_command, encode_line};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::trace;

/// 会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// 等待下一条请求
    AwaitingCommand,
    /// 正在处理请求并发送响应
    Dispatching,
    /// 已结束（终态）
    Closed,
}

/// 会话结束原因
#[derive(Debug)]
pub enum SessionEnd {
    /// 对端关闭连接
    PeerClosed,
    /// 服务端关闭
    Shutdown,
    /// 传输失败
    Failed(TransportError),
}

/// 单个连接的会话
pub struct ConnectionSession<T: MessageTransport> {
    transport: T,
    registry: Arc<CommandRegistry>,
    shutdown: Arc<AtomicBool>,
    stats: Arc<ServerStats>,
    state: SessionState,
}

impl<T: MessageTransport> ConnectionSession<T> {
    pub fn new(
        transport: T,
        registry: Arc<CommandRegistry>,
        shutdown: Arc<AtomicBool>,
        stats: Arc<ServerStats>,
    ) -> Self {
        Self {
            transport,
            registry,
            shutdown,
            stats,
            state: SessionState::AwaitingCommand,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// 运行到连接结束
    ///
    /// 关闭信号在每次读超时（[`Inbound::Idle`]）和每条响应之后检查。
    pub fn run(&mut self) -> SessionEnd {
        let end = self.serve();
        self.state = SessionState::Closed;
        end
    }

    fn serve(&mut self) -> SessionEnd {
        loop {
            if self.shutdown.load(Ordering::Acquire) {
                return SessionEnd::Shutdown;
            }

            self.state = SessionState::AwaitingCommand;
            let message = match self.transport.recv() {
                Ok(Inbound::Message(message)) => message,
                Ok(Inbound::Idle) => continue,
                Ok(Inbound::Closed) => return self.end_with(SessionEnd::PeerClosed),
                Err(e) => return self.end_with(SessionEnd::Failed(e)),
            };

            self.state = SessionState::Dispatching;
            let response = self.handle_message(&message);
            let line = match encode_line(&response) {
                Ok(line) => line,
                Err(e) => return SessionEnd::Failed(e.into()),
            };
            if let Err(e) = self.transport.send(&line) {
                return self.end_with(SessionEnd::Failed(e));
            }
        }
    }

    /// 服务端关闭时 socket 被强制关闭，由此产生的 EOF 或读写错误归为 `Shutdown`
    fn end_with(&self, end: SessionEnd) -> SessionEnd {
        if self.shutdown.load(Ordering::Acquire) {
            SessionEnd::Shutdown
        } else {
            end
        }
    }

    /// 处理一条原始请求
    pub fn handle_message(&self, message: &[u8]) -> Response {
        self.stats.commands_handled.fetch_add(1, Ordering::Relaxed);
        match decode_command(message) {
            Ok(command) => {
                trace!(command = %command.name, "dispatching command");
                self.registry.dispatch(&command)
            },
            Err(e) => {
                trace!("malformed request: {}", e);
                Response::error(e.to_string())
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mti_driver::HeadingCache;
    use mti_protocol::decode_response;
    use std::collections::VecDeque;
    use std::io;

    /// 内存传输：按顺序吐出预置的读取结果，记录发出的消息
    struct ScriptedTransport {
        inbound: VecDeque<Result<Inbound, TransportError>>,
        sent: Vec<Vec<u8>>,
        shutdown_after: Option<(usize, Arc<AtomicBool>)>,
        fail_send: bool,
    }

    impl ScriptedTransport {
        fn new(inbound: Vec<Result<Inbound, TransportError>>) -> Self {
            Self {
                inbound: inbound.into(),
                sent: Vec::new(),
                shutdown_after: None,
                fail_send: false,
            }
        }

        fn message(line: &str) -> Result<Inbound, TransportError> {
            Ok(Inbound::Message(line.as_bytes().to_vec()))
        }

        fn responses(&self) -> Vec<Response> {
            self.sent.iter().map(|l| decode_response(l).unwrap()).collect()
        }
    }

    impl MessageTransport for ScriptedTransport {
        fn recv(&mut self) -> Result<Inbound, TransportError> {
            if let Some((count, flag)) = &self.shutdown_after
                && self.sent.len() >= *count
            {
                flag.store(true, Ordering::Release);
                return Ok(Inbound::Idle);
            }
            self.inbound.pop_front().unwrap_or(Ok(Inbound::Closed))
        }

        fn send(&mut self, message: &[u8]) -> Result<(), TransportError> {
            if self.fail_send {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe").into());
            }
            self.sent.push(message.to_vec());
            Ok(())
        }
    }

    fn session(
        transport: ScriptedTransport,
    ) -> (ConnectionSession<ScriptedTransport>, Arc<HeadingCache>) {
        let cache = Arc::new(HeadingCache::new());
        cache.publish(42.5);
        let registry = Arc::new(CommandRegistry::with_heading(cache.clone()));
        (
            ConnectionSession::new(
                transport,
                registry,
                Arc::new(AtomicBool::new(false)),
                Arc::new(ServerStats::new()),
            ),
            cache,
        )
    }

    #[test]
    fn test_unknown_command_keeps_session_alive() {
        let transport = ScriptedTransport::new(vec![
            ScriptedTransport::message(r#"{"name":"bogus"}"#),
            Ok(Inbound::Idle),
            ScriptedTransport::message(r#"{"name":"heading"}"#),
        ]);
        let (mut session, _cache) = session(transport);

        assert!(matches!(session.run(), SessionEnd::PeerClosed));
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(
            session.transport.responses(),
            vec![
                Response::error("unknown command bogus"),
                Response::heading(42.5),
            ]
        );
        assert_eq!(session.stats.snapshot().commands_handled, 2);
    }

    #[test]
    fn test_malformed_request_returns_error_envelope() {
        let transport = ScriptedTransport::new(vec![
            ScriptedTransport::message("not json"),
            ScriptedTransport::message(r#"{"name":"heading"}"#),
        ]);
        let (mut session, _cache) = session(transport);
        session.run();

        let responses = session.transport.responses();
        assert_eq!(responses.len(), 2);
        match &responses[0] {
            Response::Error(message) => assert!(message.starts_with("invalid command: ")),
            other => panic!("unexpected response: {:?}", other),
        }
        assert_eq!(responses[1], Response::heading(42.5));
    }

    #[test]
    fn test_transport_failure_ends_session() {
        let transport = ScriptedTransport::new(vec![
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset").into()),
            ScriptedTransport::message(r#"{"name":"heading"}"#),
        ]);
        let (mut session, _cache) = session(transport);
        assert!(matches!(session.run(), SessionEnd::Failed(TransportError::Io(_))));
        assert!(session.transport.sent.is_empty());
    }

    #[test]
    fn test_send_failure_ends_session() {
        let mut transport =
            ScriptedTransport::new(vec![ScriptedTransport::message(r#"{"name":"heading"}"#)]);
        transport.fail_send = true;
        let (mut session, _cache) = session(transport);
        assert!(matches!(session.run(), SessionEnd::Failed(_)));
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn test_shutdown_observed_while_idle() {
        let transport = ScriptedTransport::new(vec![
            ScriptedTransport::message(r#"{"name":"heading"}"#),
            ScriptedTransport::message(r#"{"name":"heading"}"#),
        ]);
        let (mut session, _cache) = session(transport);
        session.transport.shutdown_after = Some((1, session.shutdown.clone()));

        assert!(matches!(session.run(), SessionEnd::Shutdown));
        assert_eq!(session.transport.sent.len(), 1);
    }

    #[test]
    fn test_send_failure_during_shutdown_is_shutdown() {
        let mut transport =
            ScriptedTransport::new(vec![ScriptedTransport::message(r#"{"name":"heading"}"#)]);
        transport.fail_send = true;
        let (mut session, _cache) = session(transport);
        // 服务端关闭时强制关闭 socket，此后的 EOF 和读写错误都归为 Shutdown
        session.shutdown.store(true, Ordering::Release);
        assert!(matches!(session.end_with(SessionEnd::PeerClosed), SessionEnd::Shutdown));
        assert!(matches!(session.run(), SessionEnd::Shutdown));
    }
}
