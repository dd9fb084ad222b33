//! 驱动层错误类型定义

use mti_device::{BaudRate, DeviceError, DeviceId};
use thiserror::Error;

/// 驱动层错误类型
///
/// 构造失败的各个变体与构造步骤一一对应，调用方可以据此判断失败发生在哪一步。
#[derive(Error, Debug)]
pub enum DriverError {
    /// 端口扫描没有发现任何设备
    #[error("no MTi device found")]
    DiscoveryFailed,

    /// 发现的设备不在请求的路径上
    #[error("found device at {found:?} but not {requested:?}")]
    PathMismatch { found: String, requested: String },

    /// 波特率不在支持列表中
    #[error(
        "unsupported baud rate {0} (supported: {supported:?})",
        supported = BaudRate::supported_bps()
    )]
    UnsupportedBaudRate(u32),

    /// 打开端口失败
    #[error("failed to open port {path}: {source}")]
    PortOpenFailed {
        path: String,
        #[source]
        source: DeviceError,
    },

    /// 已打开的端口上找不到指定设备
    #[error("device {0} not found on opened port")]
    DeviceHandleNotFound(DeviceId),

    /// 进入测量模式失败
    #[error("failed to enter measurement mode: {0}")]
    ModeTransitionFailed(#[source] DeviceError),

    /// 设备/后端错误
    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    /// IO 线程错误
    #[error("IO thread error: {0}")]
    IoThread(String),

    /// 配置无效
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}
