//! 服务端统计

use std::sync::atomic::{AtomicU64, Ordering};

/// 服务端实时统计
#[derive(Debug, Default)]
pub struct ServerStats {
    /// 已接受的连接总数
    pub connections_accepted: AtomicU64,
    /// 当前活跃会话数
    pub active_sessions: AtomicU64,
    /// 已处理的命令总数（含未知命令和格式错误的请求）
    pub commands_handled: AtomicU64,
}

impl ServerStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> ServerStatsSnapshot {
        ServerStatsSnapshot {
            connections_accepted: self.connections_accepted.load(Ordering::Relaxed),
            active_sessions: self.active_sessions.load(Ordering::Relaxed),
            commands_handled: self.commands_handled.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn session_opened(&self) {
        self.active_sessions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn session_closed(&self) {
        self.active_sessions.fetch_sub(1, Ordering::Relaxed);
    }
}

/// 统计快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ServerStatsSnapshot {
    pub connections_accepted: u64,
    pub active_sessions: u64,
    pub commands_handled: u64,
}
