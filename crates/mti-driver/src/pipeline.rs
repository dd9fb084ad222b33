//! 采样循环模块
//!
//! 后台 IO 线程按固定节拍轮询控制器：每个节拍最多取出一个数据包，
//! 有姿态且航向角是有限值时写入 [`HeadingCache`]。
//!
//! 停止信号是一个 `Receiver<()>`：发送端被 drop 后通道断开，循环在下一个
//! 节拍之前退出。退出后不会再调用控制器的任何轮询能力。

use crate::metrics::DriverMetrics;
use crate::state::HeadingCache;
use crossbeam_channel::{Receiver, TryRecvError, select, tick};
use mti_device::DeviceController;
use std::time::Duration;
use tracing::{trace, warn};

/// 采样循环配置
///
/// # Example
///
/// ```
/// use mti_driver::IngestionConfig;
/// use std::time::Duration;
///
/// let config = IngestionConfig::default();
/// assert_eq!(config.poll_interval, Duration::from_millis(1));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionConfig {
    /// 轮询周期
    pub poll_interval: Duration,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1),
        }
    }
}

/// 单个节拍的处理结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PollOutcome {
    /// 没有待取的数据包
    Idle,
    /// 新航向角已写入缓存
    Published(f64),
    /// 数据包不含姿态，缓存不变
    NoOrientation,
    /// 航向角为 NaN 或 ±Inf，缓存不变
    InvalidYaw,
    /// 取包失败，缓存不变
    PacketError,
}

/// 处理一个节拍
///
/// 数据包按到达顺序处理，每个节拍只取一个。
pub fn poll_once<C: DeviceController + ?Sized>(
    controller: &mut C,
    cache: &HeadingCache,
    metrics: &DriverMetrics,
) -> PollOutcome {
    if !controller.packet_available() {
        return PollOutcome::Idle;
    }

    let packet = match controller.next_packet() {
        Ok(packet) => packet,
        Err(e) => {
            DriverMetrics::incr(&metrics.packet_errors);
            if e.is_fatal() {
                warn!("Fatal device error while fetching packet: {}", e);
            } else {
                trace!("Failed to fetch packet: {}", e);
            }
            return PollOutcome::PacketError;
        },
    };
    DriverMetrics::incr(&metrics.packets_total);

    let Some(yaw) = packet.yaw() else {
        DriverMetrics::incr(&metrics.packets_without_orientation);
        return PollOutcome::NoOrientation;
    };

    if cache.publish(yaw) {
        PollOutcome::Published(yaw)
    } else {
        DriverMetrics::incr(&metrics.invalid_yaw_discarded);
        PollOutcome::InvalidYaw
    }
}

/// 停止信号是否已到达（显式发送或发送端已 drop）
fn stop_requested(stop_rx: &Receiver<()>) -> bool {
    match stop_rx.try_recv() {
        Ok(()) | Err(TryRecvError::Disconnected) => true,
        Err(TryRecvError::Empty) => false,
    }
}

/// 采样主循环
///
/// 只借用控制器：循环结束（包括 panic 展开）后由调用方负责注销回调和销毁。
///
/// # 参数
/// - `controller`: 已进入测量模式的控制器
/// - `stop_rx`: 停止信号
/// - `cache`: 航向缓存（唯一写者）
/// - `metrics`: 采样指标
/// - `config`: 循环配置
pub fn ingestion_loop<C: DeviceController + ?Sized>(
    controller: &mut C,
    stop_rx: Receiver<()>,
    cache: &HeadingCache,
    metrics: &DriverMetrics,
    config: &IngestionConfig,
) {
    let ticker = tick(config.poll_interval);

    loop {
        select! {
            recv(stop_rx) -> _ => break,
            recv(ticker) -> _ => {},
        }

        // 两个通道同时就绪时 select 随机选择，这里再确认一次，
        // 保证停止信号之后不会再开始新的取包。
        if stop_requested(&stop_rx) {
            break;
        }

        DriverMetrics::incr(&metrics.ticks);
        poll_once(controller, cache, metrics);
    }

    trace!("Ingestion loop exited");
}
