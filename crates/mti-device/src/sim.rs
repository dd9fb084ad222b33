//! 仿真控制器
//!
//! 在没有厂商 SDK 的主机上代替真实设备：端口扫描返回一个虚拟端口，
//! 进入测量模式后按固定输出频率产生匀速旋转的航向角。

use crate::{
    BaudRate, DataPacket, DeviceController, DeviceError, DeviceErrorKind, DeviceHandle, DeviceId,
    DeviceOptionFlags, EulerAngles, PortInfo,
};
use std::time::{Duration, Instant};
use tracing::debug;

/// 仿真参数
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// 虚拟端口路径
    pub port: String,
    /// 虚拟设备 ID
    pub device_id: DeviceId,
    /// 输出间隔（MTi 默认 100Hz）
    pub output_interval: Duration,
    /// 航向角旋转速度（度/秒）
    pub yaw_rate_dps: f64,
    /// 每 N 个数据包插入一个不含姿态的数据包（0 表示不插入）
    pub orientation_gap_every: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            device_id: DeviceId::from("02782090"),
            output_interval: Duration::from_millis(10),
            yaw_rate_dps: 15.0,
            orientation_gap_every: 50,
        }
    }
}

/// 仿真控制器
#[derive(Debug)]
pub struct SimulatedController {
    config: SimulationConfig,
    opened: Option<(String, BaudRate)>,
    callback_attached: bool,
    measuring_since: Option<Instant>,
    last_output: Option<Instant>,
    packet_counter: u32,
}

impl SimulatedController {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            opened: None,
            callback_attached: false,
            measuring_since: None,
            last_output: None,
            packet_counter: 0,
        }
    }

    /// 航向角折算到 (-180, 180]
    fn wrap_degrees(angle: f64) -> f64 {
        let wrapped = angle.rem_euclid(360.0);
        if wrapped > 180.0 { wrapped - 360.0 } else { wrapped }
    }
}

impl Default for SimulatedController {
    fn default() -> Self {
        Self::new(SimulationConfig::default())
    }
}

impl DeviceController for SimulatedController {
    fn scan_ports(&mut self) -> Result<Vec<PortInfo>, DeviceError> {
        Ok(vec![PortInfo {
            path: self.config.port.clone(),
            device_id: self.config.device_id.clone(),
            baud_rate: BaudRate::B115200.bps(),
        }])
    }

    fn open_port(&mut self, path: &str, baud_rate: BaudRate) -> Result<(), DeviceError> {
        if path != self.config.port {
            return Err(DeviceError::new(
                DeviceErrorKind::NotFound,
                format!("simulated port is {}, not {}", self.config.port, path),
            ));
        }
        self.opened = Some((path.to_string(), baud_rate));
        Ok(())
    }

    fn resolve_device(&mut self, device_id: &DeviceId) -> Option<DeviceHandle> {
        let (port, baud_rate) = self.opened.clone()?;
        (device_id == &self.config.device_id).then(|| DeviceHandle {
            device_id: device_id.clone(),
            port,
            baud_rate,
        })
    }

    fn set_device_option_flags(
        &mut self,
        _device: &DeviceHandle,
        enable: DeviceOptionFlags,
        disable: DeviceOptionFlags,
    ) -> Result<(), DeviceError> {
        debug!(
            enable = enable.bits(),
            disable = disable.bits(),
            "simulated device option flags"
        );
        Ok(())
    }

    fn add_packet_callback(&mut self, _device: &DeviceHandle) {
        self.callback_attached = true;
    }

    fn goto_measurement(&mut self, _device: &DeviceHandle) -> Result<(), DeviceError> {
        if !self.callback_attached {
            return Err(DeviceError::new(
                DeviceErrorKind::Backend,
                "no packet callback attached",
            ));
        }
        self.measuring_since = Some(Instant::now());
        Ok(())
    }

    fn packet_available(&mut self) -> bool {
        if self.measuring_since.is_none() {
            return false;
        }
        self.last_output
            .is_none_or(|last| last.elapsed() >= self.config.output_interval)
    }

    fn next_packet(&mut self) -> Result<DataPacket, DeviceError> {
        let since = self.measuring_since.ok_or_else(|| {
            DeviceError::new(DeviceErrorKind::Backend, "device not in measurement mode")
        })?;
        self.last_output = Some(Instant::now());
        self.packet_counter = self.packet_counter.wrapping_add(1);

        let sample_time_fine = (since.elapsed().as_micros() / 100) as u32;
        let gap = self.config.orientation_gap_every;
        if gap != 0 && self.packet_counter % gap == 0 {
            return Ok(DataPacket::without_orientation().sample_time_fine(sample_time_fine));
        }

        let yaw = Self::wrap_degrees(since.elapsed().as_secs_f64() * self.config.yaw_rate_dps);
        Ok(DataPacket::with_orientation(EulerAngles::new(0.0, 0.0, yaw))
            .sample_time_fine(sample_time_fine))
    }

    fn remove_packet_callback(&mut self) {
        self.callback_attached = false;
    }

    fn destruct(&mut self) {
        self.measuring_since = None;
        self.last_output = None;
        self.opened = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_degrees() {
        assert_eq!(SimulatedController::wrap_degrees(0.0), 0.0);
        assert_eq!(SimulatedController::wrap_degrees(190.0), -170.0);
        assert_eq!(SimulatedController::wrap_degrees(360.0), 0.0);
        assert_eq!(SimulatedController::wrap_degrees(-90.0), -90.0);
    }

    #[test]
    fn test_simulation_emits_after_measurement() {
        let mut sim = SimulatedController::new(SimulationConfig {
            output_interval: Duration::ZERO,
            orientation_gap_every: 2,
            ..Default::default()
        });
        assert!(!sim.packet_available());

        let port = sim.scan_ports().unwrap().remove(0);
        sim.open_port(&port.path, BaudRate::B115200).unwrap();
        let device = sim.resolve_device(&port.device_id).unwrap();
        sim.add_packet_callback(&device);
        sim.goto_measurement(&device).unwrap();

        assert!(sim.packet_available());
        assert!(sim.next_packet().unwrap().contains_orientation());
        // 第二个数据包不含姿态
        assert!(!sim.next_packet().unwrap().contains_orientation());

        sim.destruct();
        assert!(!sim.packet_available());
    }

    #[test]
    fn test_simulation_rejects_unknown_port() {
        let mut sim = SimulatedController::default();
        assert!(sim.open_port("/dev/ttyACM9", BaudRate::B115200).is_err());
    }
}
