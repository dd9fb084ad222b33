//! Mock 控制器（测试用）
//!
//! - 数据包通过 crossbeam 通道注入，测试线程可以在驱动运行期间随时推送
//! - 每个能力调用都有原子计数器（[`MockCalls`]），用于断言"某步从未被调用"
//!   或"资源只释放了一次"
//! - 每个构造步骤都可以单独注入失败

use crate::{
    BaudRate, DataPacket, DeviceController, DeviceError, DeviceErrorKind, DeviceHandle, DeviceId,
    DeviceOptionFlags, PortInfo,
};
use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

/// Mock 默认端口
pub const MOCK_PORT: &str = "/dev/ttyUSB0";
/// Mock 默认设备 ID
pub const MOCK_DEVICE_ID: &str = "02782090";

/// 能力调用计数器
#[derive(Debug, Default)]
pub struct MockCalls {
    pub scan_ports: AtomicUsize,
    pub open_port: AtomicUsize,
    pub resolve_device: AtomicUsize,
    pub set_device_option_flags: AtomicUsize,
    pub add_packet_callback: AtomicUsize,
    pub goto_measurement: AtomicUsize,
    pub packet_available: AtomicUsize,
    pub next_packet: AtomicUsize,
    pub remove_packet_callback: AtomicUsize,
    pub destruct: AtomicUsize,
    /// 最近一次设置的选项标志位
    pub last_enabled_flags: AtomicU32,
}

impl MockCalls {
    /// 读取计数（SeqCst，测试里不关心性能）
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    /// 设备轮询能力的调用总数
    pub fn polling_calls(&self) -> usize {
        Self::get(&self.packet_available) + Self::get(&self.next_packet)
    }
}

type PacketResult = Result<DataPacket, DeviceError>;

/// 测试侧句柄：注入数据包、读取计数
#[derive(Debug, Clone)]
pub struct MockHandle {
    feed: Sender<PacketResult>,
    calls: Arc<MockCalls>,
}

impl MockHandle {
    /// 推送一个数据包
    pub fn push_packet(&self, packet: DataPacket) {
        let _ = self.feed.send(Ok(packet));
    }

    /// 推送一个含航向角的数据包
    pub fn push_yaw(&self, yaw: f64) {
        self.push_packet(DataPacket::with_yaw(yaw));
    }

    /// 推送一次取包失败
    pub fn push_error(&self, error: DeviceError) {
        let _ = self.feed.send(Err(error));
    }

    /// 尚未被取走的数据包数量
    pub fn pending(&self) -> usize {
        self.feed.len()
    }

    pub fn calls(&self) -> &MockCalls {
        &self.calls
    }
}

/// Mock 控制器
#[derive(Debug)]
pub struct MockController {
    ports: Vec<PortInfo>,
    resolvable: bool,
    fail_open_port: bool,
    fail_option_flags: bool,
    fail_goto_measurement: bool,
    opened: Option<(String, BaudRate)>,
    feed: Sender<PacketResult>,
    packets: Receiver<PacketResult>,
    calls: Arc<MockCalls>,
}

impl MockController {
    /// 默认：`/dev/ttyUSB0` 上有一个 ID 为 `02782090` 的设备，所有步骤成功
    pub fn new() -> Self {
        let (feed, packets) = unbounded();
        Self {
            ports: vec![PortInfo {
                path: MOCK_PORT.to_string(),
                device_id: DeviceId::from(MOCK_DEVICE_ID),
                baud_rate: BaudRate::B115200.bps(),
            }],
            resolvable: true,
            fail_open_port: false,
            fail_option_flags: false,
            fail_goto_measurement: false,
            opened: None,
            feed,
            packets,
            calls: Arc::new(MockCalls::default()),
        }
    }

    /// 获取测试侧句柄（可多次调用）
    pub fn handle(&self) -> MockHandle {
        MockHandle {
            feed: self.feed.clone(),
            calls: self.calls.clone(),
        }
    }

    /// 替换扫描结果
    pub fn with_ports(mut self, ports: Vec<PortInfo>) -> Self {
        self.ports = ports;
        self
    }

    /// 扫描结果为空
    pub fn without_ports(self) -> Self {
        self.with_ports(Vec::new())
    }

    /// 单个端口
    pub fn with_port(self, path: &str, device_id: &str) -> Self {
        self.with_ports(vec![PortInfo {
            path: path.to_string(),
            device_id: DeviceId::from(device_id),
            baud_rate: BaudRate::B115200.bps(),
        }])
    }

    pub fn fail_open_port(mut self) -> Self {
        self.fail_open_port = true;
        self
    }

    /// 设备 ID 无法解析
    pub fn without_device(mut self) -> Self {
        self.resolvable = false;
        self
    }

    pub fn fail_option_flags(mut self) -> Self {
        self.fail_option_flags = true;
        self
    }

    pub fn fail_goto_measurement(mut self) -> Self {
        self.fail_goto_measurement = true;
        self
    }
}

impl Default for MockController {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceController for MockController {
    fn scan_ports(&mut self) -> Result<Vec<PortInfo>, DeviceError> {
        self.calls.scan_ports.fetch_add(1, Ordering::SeqCst);
        Ok(self.ports.clone())
    }

    fn open_port(&mut self, path: &str, baud_rate: BaudRate) -> Result<(), DeviceError> {
        self.calls.open_port.fetch_add(1, Ordering::SeqCst);
        if self.fail_open_port {
            return Err(DeviceError::new(
                DeviceErrorKind::AccessDenied,
                format!("mock: cannot open {}", path),
            ));
        }
        self.opened = Some((path.to_string(), baud_rate));
        Ok(())
    }

    fn resolve_device(&mut self, device_id: &DeviceId) -> Option<DeviceHandle> {
        self.calls.resolve_device.fetch_add(1, Ordering::SeqCst);
        let (port, baud_rate) = self.opened.clone()?;
        if !self.resolvable || !self.ports.iter().any(|p| &p.device_id == device_id) {
            return None;
        }
        Some(DeviceHandle {
            device_id: device_id.clone(),
            port,
            baud_rate,
        })
    }

    fn set_device_option_flags(
        &mut self,
        _device: &DeviceHandle,
        enable: DeviceOptionFlags,
        _disable: DeviceOptionFlags,
    ) -> Result<(), DeviceError> {
        self.calls.set_device_option_flags.fetch_add(1, Ordering::SeqCst);
        if self.fail_option_flags {
            return Err(DeviceError::new(
                DeviceErrorKind::UnsupportedConfig,
                "mock: option flags rejected",
            ));
        }
        self.calls.last_enabled_flags.store(enable.bits(), Ordering::SeqCst);
        Ok(())
    }

    fn add_packet_callback(&mut self, _device: &DeviceHandle) {
        self.calls.add_packet_callback.fetch_add(1, Ordering::SeqCst);
    }

    fn goto_measurement(&mut self, _device: &DeviceHandle) -> Result<(), DeviceError> {
        self.calls.goto_measurement.fetch_add(1, Ordering::SeqCst);
        if self.fail_goto_measurement {
            return Err(DeviceError::new(
                DeviceErrorKind::Backend,
                "mock: device refused measurement mode",
            ));
        }
        Ok(())
    }

    fn packet_available(&mut self) -> bool {
        self.calls.packet_available.fetch_add(1, Ordering::SeqCst);
        !self.packets.is_empty()
    }

    fn next_packet(&mut self) -> Result<DataPacket, DeviceError> {
        self.calls.next_packet.fetch_add(1, Ordering::SeqCst);
        match self.packets.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => Err(DeviceError::new(
                DeviceErrorKind::InvalidPacket,
                "mock: packet queue empty",
            )),
        }
    }

    fn remove_packet_callback(&mut self) {
        self.calls.remove_packet_callback.fetch_add(1, Ordering::SeqCst);
    }

    fn destruct(&mut self) {
        self.calls.destruct.fetch_add(1, Ordering::SeqCst);
        self.opened = None;
    }
}
