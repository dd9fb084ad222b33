//! 驱动生命周期状态
//!
//! `Created → Running → Closed`，只前进不后退。

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// 驱动生命周期
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum LifecycleState {
    /// 设备已绑定，采样线程尚未启动
    #[default]
    Created = 0,

    /// 采样线程运行中
    Running = 1,

    /// 已关闭（终态）
    Closed = 2,
}

impl LifecycleState {
    /// 从 u8 转换
    ///
    /// 无效值视为 Closed，避免把损坏的状态当作可用。
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Created,
            1 => Self::Running,
            _ => Self::Closed,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn is_running(self) -> bool {
        self == Self::Running
    }

    pub fn is_closed(self) -> bool {
        self == Self::Closed
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Closed => "closed",
        }
    }

    /// 是否允许从当前状态迁移到 `next`
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Created, Self::Running)
                | (Self::Created, Self::Closed)
                | (Self::Running, Self::Closed)
        )
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 生命周期状态（原子版本）
///
/// 状态查询不需要拿生命周期锁；迁移只在持有锁的 `close` / 启动路径里发生。
#[derive(Debug)]
pub struct AtomicLifecycleState {
    inner: AtomicU8,
}

impl AtomicLifecycleState {
    pub fn new(state: LifecycleState) -> Self {
        Self {
            inner: AtomicU8::new(state.as_u8()),
        }
    }

    pub fn get(&self) -> LifecycleState {
        LifecycleState::from_u8(self.inner.load(Ordering::Acquire))
    }

    /// 迁移到 `next`，非法迁移返回 false 且不修改状态
    pub fn advance(&self, next: LifecycleState) -> bool {
        self.inner
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                LifecycleState::from_u8(current)
                    .can_transition_to(next)
                    .then_some(next.as_u8())
            })
            .is_ok()
    }
}

impl Default for AtomicLifecycleState {
    fn default() -> Self {
        Self::new(LifecycleState::Created)
    }
}
