//! 采样指标
//!
//! 原子计数器，IO 线程写、任意线程读，读写都不加锁。

use std::sync::atomic::{AtomicU64, Ordering};

/// 采样循环实时指标
#[derive(Debug, Default)]
pub struct DriverMetrics {
    /// 轮询节拍数
    pub ticks: AtomicU64,

    /// 取出的数据包总数（含失败以外的所有数据包）
    pub packets_total: AtomicU64,

    /// 不含姿态的数据包数
    pub packets_without_orientation: AtomicU64,

    /// 航向角为 NaN 或 ±Inf 被丢弃的次数
    pub invalid_yaw_discarded: AtomicU64,

    /// 取包失败次数
    pub packet_errors: AtomicU64,
}

impl DriverMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 读取快照（`Relaxed`，各计数器之间可能有微小的时间差）
    pub fn snapshot(&self) -> DriverMetricsSnapshot {
        DriverMetricsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            packets_total: self.packets_total.load(Ordering::Relaxed),
            packets_without_orientation: self.packets_without_orientation.load(Ordering::Relaxed),
            invalid_yaw_discarded: self.invalid_yaw_discarded.load(Ordering::Relaxed),
            packet_errors: self.packet_errors.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// 指标快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DriverMetricsSnapshot {
    pub ticks: u64,
    pub packets_total: u64,
    pub packets_without_orientation: u64,
    pub invalid_yaw_discarded: u64,
    pub packet_errors: u64,
}

impl DriverMetricsSnapshot {
    /// 写入缓存的有效航向角数量
    pub fn headings_published(&self) -> u64 {
        self.packets_total
            .saturating_sub(self.packets_without_orientation)
            .saturating_sub(self.invalid_yaw_discarded)
    }

    /// 有效航向角占比（百分比），没有数据包时返回 0.0
    pub fn valid_heading_rate(&self) -> f64 {
        if self.packets_total == 0 {
            return 0.0;
        }
        (self.headings_published() as f64 / self.packets_total as f64) * 100.0
    }
}
