//! 驱动配置
//!
//! 可以从配置文件反序列化（`serde` feature），也可以直接构造。

use crate::error::DriverError;
use mti_device::BaudRate;
use std::time::Duration;

/// 默认波特率
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// 路径校验策略
///
/// - `Strict`: 发现的设备必须在请求的路径上，否则构造失败
/// - `Lenient`: 打开实际发现的路径，路径不一致时只记录警告
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum PathPolicy {
    #[default]
    Strict,
    Lenient,
}

/// 航向传感器配置
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CompassConfig {
    /// 串口路径（必填）
    pub serial_path: String,
    /// 串口波特率
    pub serial_baud_rate: u32,
    /// 设备 ID
    pub device_id: String,
    /// 路径校验策略
    pub path_policy: PathPolicy,
    /// 是否启用连续零速更新
    pub continuous_zru: bool,
    /// 采样轮询周期（毫秒）
    pub poll_interval_ms: u64,
}

impl Default for CompassConfig {
    fn default() -> Self {
        Self {
            serial_path: String::new(),
            serial_baud_rate: DEFAULT_BAUD_RATE,
            device_id: String::new(),
            path_policy: PathPolicy::default(),
            continuous_zru: true,
            poll_interval_ms: 1,
        }
    }
}

impl CompassConfig {
    pub fn new(serial_path: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self {
            serial_path: serial_path.into(),
            device_id: device_id.into(),
            ..Default::default()
        }
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), DriverError> {
        if self.serial_path.is_empty() {
            return Err(DriverError::InvalidConfig("serial_path is required".into()));
        }
        if BaudRate::from_bps(self.serial_baud_rate).is_none() {
            return Err(DriverError::UnsupportedBaudRate(self.serial_baud_rate));
        }
        if self.poll_interval_ms == 0 {
            return Err(DriverError::InvalidConfig(
                "poll_interval_ms must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
