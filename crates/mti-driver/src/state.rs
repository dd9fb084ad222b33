//! 航向状态缓存
//!
//! 单写多读：IO 线程是唯一写者，任意线程随时读取最新航向角。
//! 使用 `ArcSwap` 存储整份快照，读者永远拿到完整的一份状态（航向角和更新时间
//! 来自同一次写入），读路径无锁。

use arc_swap::ArcSwap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 航向角未知时的哨兵值
pub const HEADING_UNKNOWN: f64 = f64::NAN;

/// 航向状态快照
#[derive(Debug, Clone, Copy)]
pub struct HeadingState {
    /// 最近一次有效航向角（度），未知时为 NaN
    pub yaw: f64,
    /// 最近一次写入的时间
    pub updated_at: Option<Instant>,
}

impl Default for HeadingState {
    fn default() -> Self {
        Self {
            yaw: HEADING_UNKNOWN,
            updated_at: None,
        }
    }
}

impl HeadingState {
    /// 是否已经收到过有效航向角
    pub fn is_known(&self) -> bool {
        !self.yaw.is_nan()
    }

    /// 距离最近一次写入的时长
    pub fn age(&self) -> Option<Duration> {
        self.updated_at.map(|at| at.elapsed())
    }
}

/// 航向状态缓存
#[derive(Debug)]
pub struct HeadingCache {
    state: ArcSwap<HeadingState>,
}

impl HeadingCache {
    /// 新建缓存，初始为未知
    pub fn new() -> Self {
        Self {
            state: ArcSwap::from_pointee(HeadingState::default()),
        }
    }

    /// 最新航向角（未知时为 NaN）
    pub fn load(&self) -> f64 {
        self.state.load().yaw
    }

    /// 最新完整快照
    pub fn snapshot(&self) -> HeadingState {
        **self.state.load()
    }

    /// 写入新的航向角
    ///
    /// NaN 和 ±Inf 被拒绝并返回 `false`，缓存保持上一次的有效值。
    /// 只应由采样线程调用。
    pub fn publish(&self, yaw: f64) -> bool {
        if !yaw.is_finite() {
            return false;
        }
        self.state.store(Arc::new(HeadingState {
            yaw,
            updated_at: Some(Instant::now()),
        }));
        true
    }
}

impl Default for HeadingCache {
    fn default() -> Self {
        Self::new()
    }
}

/// 航向角数据源
///
/// 远程服务只依赖这个接口，不关心航向角来自本地驱动还是别的地方。
pub trait HeadingSource: Send + Sync {
    /// 最新航向角（度），未知时为 NaN
    fn latest_heading(&self) -> f64;
}

impl HeadingSource for HeadingCache {
    fn latest_heading(&self) -> f64 {
        self.load()
    }
}

impl<T: HeadingSource + ?Sized> HeadingSource for Arc<T> {
    fn latest_heading(&self) -> f64 {
        (**self).latest_heading()
    }
}
