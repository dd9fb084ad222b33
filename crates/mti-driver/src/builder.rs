//! Builder 模式实现
//!
//! 按固定顺序把控制器带到测量模式，然后启动 IO 线程：
//!
//! ```text
//! scan_ports → 路径校验 → 波特率校验 → open_port → resolve_device
//!   → set_device_option_flags → add_packet_callback → goto_measurement → spawn
//! ```
//!
//! 任何一步失败都会释放之前已获取的资源：
//! - 打开端口之前失败：没有资源需要释放
//! - 打开端口/解析设备失败：`destruct`
//! - 进入测量模式失败：`remove_packet_callback` + `destruct`
//! - IO 线程创建失败：控制器随线程闭包 drop，同样 `remove_packet_callback` + `destruct`

use crate::compass::{Compass, DEFAULT_JOIN_TIMEOUT};
use crate::config::{CompassConfig, DEFAULT_BAUD_RATE, PathPolicy};
use crate::error::DriverError;
use crate::pipeline::IngestionConfig;
use mti_device::{BaudRate, DeviceController, DeviceHandle, DeviceId, DeviceOptionFlags};
use std::time::Duration;
use tracing::{Span, info, info_span, warn};

/// Compass Builder（链式构造）
///
/// # Example
///
/// ```no_run
/// # use mti_device::DeviceController;
/// # fn controller() -> Box<dyn DeviceController> { unimplemented!() }
/// use mti_driver::{CompassBuilder, PathPolicy};
/// use std::time::Duration;
///
/// let compass = CompassBuilder::new("02782090", "/dev/ttyUSB0")
///     .baud_rate(115_200)
///     .path_policy(PathPolicy::Lenient)
///     .poll_interval(Duration::from_millis(2))
///     .build(controller())
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct CompassBuilder {
    device_id: DeviceId,
    path: String,
    baud_rate: u32,
    path_policy: PathPolicy,
    continuous_zru: bool,
    ingestion_config: IngestionConfig,
    join_timeout: Duration,
    span: Option<Span>,
}

impl CompassBuilder {
    /// 创建新的 Builder
    ///
    /// - `device_id`: 设备 ID（如 `"02782090"`）
    /// - `path`: 串口路径（如 `"/dev/ttyUSB0"`）
    pub fn new(device_id: impl Into<DeviceId>, path: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            path: path.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            path_policy: PathPolicy::default(),
            continuous_zru: true,
            ingestion_config: IngestionConfig::default(),
            join_timeout: DEFAULT_JOIN_TIMEOUT,
            span: None,
        }
    }

    /// 从配置创建（先校验配置）
    pub fn from_config(config: &CompassConfig) -> Result<Self, DriverError> {
        config.validate()?;
        Ok(Self::new(config.device_id.as_str(), config.serial_path.as_str())
            .baud_rate(config.serial_baud_rate)
            .path_policy(config.path_policy)
            .continuous_zru(config.continuous_zru)
            .poll_interval(config.poll_interval()))
    }

    /// 设置波特率（默认 115200）
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// 设置路径校验策略（默认 Strict）
    pub fn path_policy(mut self, policy: PathPolicy) -> Self {
        self.path_policy = policy;
        self
    }

    /// 是否启用连续零速更新（默认启用，设置失败只记录警告）
    pub fn continuous_zru(mut self, enable: bool) -> Self {
        self.continuous_zru = enable;
        self
    }

    /// 设置采样轮询周期（默认 1ms）
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.ingestion_config.poll_interval = interval;
        self
    }

    /// 设置关闭时等待 IO 线程的超时（默认 2s）
    pub fn join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    /// 设置日志 span（默认 `compass{device_id=...}`）
    ///
    /// 构造过程、IO 线程和关闭过程的日志都在这个 span 内。
    pub fn span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// 绑定设备并启动 IO 线程
    pub fn build<C>(self, mut controller: C) -> Result<Compass, DriverError>
    where
        C: DeviceController + 'static,
    {
        let span = self
            .span
            .clone()
            .unwrap_or_else(|| info_span!("compass", device_id = %self.device_id));

        let device = {
            let _enter = span.enter();
            self.bind(&mut controller)?
        };

        Compass::spawn(
            Box::new(controller),
            device,
            self.ingestion_config,
            self.join_timeout,
            span,
        )
    }

    /// 把控制器带到测量模式
    fn bind<C: DeviceController>(&self, controller: &mut C) -> Result<DeviceHandle, DriverError> {
        // 1. 发现设备（只取第一个）
        let ports = controller.scan_ports()?;
        let Some(port) = ports.into_iter().next() else {
            return Err(DriverError::DiscoveryFailed);
        };
        info!(
            device_id = %port.device_id,
            port = %port.path,
            baud_rate = port.baud_rate,
            "found device"
        );

        // 2. 路径校验
        let path = match self.path_policy {
            PathPolicy::Strict if port.path != self.path => {
                return Err(DriverError::PathMismatch {
                    found: port.path,
                    requested: self.path.clone(),
                });
            },
            PathPolicy::Strict => self.path.clone(),
            PathPolicy::Lenient => {
                if port.path != self.path {
                    warn!(
                        found = %port.path,
                        requested = %self.path,
                        "device found on a different port, using it anyway"
                    );
                }
                port.path
            },
        };

        // 3. 波特率校验
        let baud_rate = BaudRate::from_bps(self.baud_rate)
            .ok_or(DriverError::UnsupportedBaudRate(self.baud_rate))?;

        // 4. 打开端口
        if let Err(source) = controller.open_port(&path, baud_rate) {
            controller.destruct();
            return Err(DriverError::PortOpenFailed { path, source });
        }

        // 5. 解析设备句柄
        let Some(device) = controller.resolve_device(&self.device_id) else {
            controller.destruct();
            return Err(DriverError::DeviceHandleNotFound(self.device_id.clone()));
        };

        // 6. 设备选项（失败不影响构造）
        if self.continuous_zru
            && let Err(e) = controller.set_device_option_flags(
                &device,
                DeviceOptionFlags::ENABLE_CONTINUOUS_ZRU,
                DeviceOptionFlags::NONE,
            )
        {
            warn!("Failed to enable continuous ZRU: {}", e);
        }

        // 7. 注册回调并进入测量模式
        controller.add_packet_callback(&device);
        if let Err(source) = controller.goto_measurement(&device) {
            controller.remove_packet_callback();
            controller.destruct();
            return Err(DriverError::ModeTransitionFailed(source));
        }

        Ok(device)
    }
}
