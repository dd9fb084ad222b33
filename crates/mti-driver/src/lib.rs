//! 驱动层模块
//!
//! 本模块提供 Xsens MTi 航向传感器的驱动功能，包括：
//! - 设备绑定（发现、路径/波特率校验、进入测量模式）
//! - 后台采样线程（固定节拍轮询，每拍最多一个数据包）
//! - 航向缓存（ArcSwap 无锁读取，NaN 表示未知）
//! - 幂等、可并发调用的关闭流程
//!
//! # 使用场景
//!
//! 本地进程直接持有设备时使用 [`Compass`]；需要跨进程访问时，
//! 把 [`Compass::heading_cache`] 交给 `mti-remote` 的服务端。

mod builder;
mod compass;
pub mod config;
mod error;
pub mod lifecycle;
pub mod metrics;
pub mod pipeline;
pub mod sensor;
pub mod state;

pub use builder::CompassBuilder;
pub use compass::{Compass, DEFAULT_JOIN_TIMEOUT};
pub use config::{CompassConfig, DEFAULT_BAUD_RATE, PathPolicy};
pub use error::DriverError;
pub use lifecycle::{AtomicLifecycleState, LifecycleState};
pub use metrics::{DriverMetrics, DriverMetricsSnapshot};
pub use pipeline::{IngestionConfig, PollOutcome, ingestion_loop, poll_once};
pub use sensor::{HeadingSensor, SensorProperties};
pub use state::{HEADING_UNKNOWN, HeadingCache, HeadingSource, HeadingState};
