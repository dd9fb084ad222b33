//! # MTi Device Layer
//!
//! 厂商控制器（Xsens SDK）的能力抽象层。
//!
//! 驱动层只通过 [`DeviceController`] trait 访问硬件：端口扫描、打开端口、
//! 解析设备句柄、切换测量模式、轮询数据包。具体实现（厂商 SDK 绑定、
//! 仿真设备、测试用 Mock）都在驱动核心之外。
//!
//! ```text
//! Driver Layer (mti-driver)
//!     ↓ DeviceController trait
//! Device Layer (此 crate)
//!     ↓ 厂商 SDK / 仿真 / Mock
//! Hardware
//! ```

use thiserror::Error;

mod packet;
mod types;

#[cfg(feature = "mock")]
pub mod mock;

#[cfg(feature = "sim")]
pub mod sim;

pub use packet::{DataPacket, EulerAngles};
pub use types::{BaudRate, DeviceHandle, DeviceId, DeviceOptionFlags, PortInfo};

#[cfg(feature = "mock")]
pub use mock::{MockCalls, MockController, MockHandle};

#[cfg(feature = "sim")]
pub use sim::{SimulatedController, SimulationConfig};

/// 设备/后端错误的结构化分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceErrorKind {
    Unknown,
    NotFound,
    NoDevice,
    AccessDenied,
    Busy,
    UnsupportedConfig,
    InvalidPacket,
    Backend,
}

/// 结构化设备错误
#[derive(Error, Debug, Clone)]
#[error("{kind:?}: {message}")]
pub struct DeviceError {
    pub kind: DeviceErrorKind,
    pub message: String,
}

impl DeviceError {
    pub fn new(kind: DeviceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// 设备已不可用（拔出、无权限等）
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            DeviceErrorKind::NoDevice | DeviceErrorKind::AccessDenied | DeviceErrorKind::NotFound
        )
    }
}

impl From<String> for DeviceError {
    fn from(message: String) -> Self {
        Self::new(DeviceErrorKind::Unknown, message)
    }
}

impl From<&str> for DeviceError {
    fn from(message: &str) -> Self {
        Self::new(DeviceErrorKind::Unknown, message)
    }
}

/// 厂商控制器能力接口
///
/// 对应 Xsens SDK 中 `XsScanner` + `XsControl` + `XsDevice` + 回调处理器的组合。
/// 实现者独占底层原生句柄；驱动保证：
///
/// - 构造阶段按 `scan_ports → open_port → resolve_device → (set_device_option_flags)
///   → add_packet_callback → goto_measurement` 的顺序调用
/// - 运行阶段只有 IO 线程调用 `packet_available` / `next_packet`
/// - 释放阶段 `remove_packet_callback` 和 `destruct` 各调用一次
///
/// `packet_available` 必须是非阻塞的。
pub trait DeviceController: Send {
    /// 扫描可用端口
    fn scan_ports(&mut self) -> Result<Vec<PortInfo>, DeviceError>;

    /// 以指定波特率打开端口
    fn open_port(&mut self, path: &str, baud_rate: BaudRate) -> Result<(), DeviceError>;

    /// 按设备 ID 解析已打开端口上的设备
    fn resolve_device(&mut self, device_id: &DeviceId) -> Option<DeviceHandle>;

    /// 设置设备选项标志
    fn set_device_option_flags(
        &mut self,
        device: &DeviceHandle,
        enable: DeviceOptionFlags,
        disable: DeviceOptionFlags,
    ) -> Result<(), DeviceError>;

    /// 注册数据包回调（数据包进入控制器内部队列，由 `next_packet` 取出）
    fn add_packet_callback(&mut self, device: &DeviceHandle);

    /// 切换到测量模式（开始连续输出）
    fn goto_measurement(&mut self, device: &DeviceHandle) -> Result<(), DeviceError>;

    /// 是否有待取出的数据包（非阻塞）
    fn packet_available(&mut self) -> bool;

    /// 取出下一个数据包
    fn next_packet(&mut self) -> Result<DataPacket, DeviceError>;

    /// 注销数据包回调
    fn remove_packet_callback(&mut self);

    /// 关闭端口并销毁控制器
    fn destruct(&mut self);
}

impl<C: DeviceController + ?Sized> DeviceController for Box<C> {
    fn scan_ports(&mut self) -> Result<Vec<PortInfo>, DeviceError> {
        (**self).scan_ports()
    }

    fn open_port(&mut self, path: &str, baud_rate: BaudRate) -> Result<(), DeviceError> {
        (**self).open_port(path, baud_rate)
    }

    fn resolve_device(&mut self, device_id: &DeviceId) -> Option<DeviceHandle> {
        (**self).resolve_device(device_id)
    }

    fn set_device_option_flags(
        &mut self,
        device: &DeviceHandle,
        enable: DeviceOptionFlags,
        disable: DeviceOptionFlags,
    ) -> Result<(), DeviceError> {
        (**self).set_device_option_flags(device, enable, disable)
    }

    fn add_packet_callback(&mut self, device: &DeviceHandle) {
        (**self).add_packet_callback(device)
    }

    fn goto_measurement(&mut self, device: &DeviceHandle) -> Result<(), DeviceError> {
        (**self).goto_measurement(device)
    }

    fn packet_available(&mut self) -> bool {
        (**self).packet_available()
    }

    fn next_packet(&mut self) -> Result<DataPacket, DeviceError> {
        (**self).next_packet()
    }

    fn remove_packet_callback(&mut self) {
        (**self).remove_packet_callback()
    }

    fn destruct(&mut self) {
        (**self).destruct()
    }
}
