//! 命令定义和实现

pub mod config;
pub mod read;
pub mod serve;
pub mod watch;

pub use config::CheckConfigCommand;
pub use read::ReadCommand;
pub use serve::ServeCommand;
pub use watch::WatchCommand;

use anyhow::{Context, Result};
use mti_device::{DeviceId, SimulatedController, SimulationConfig};
use mti_driver::{Compass, CompassBuilder, CompassConfig};

/// 按配置绑定仿真设备
///
/// 仿真设备挂在配置的串口路径上，设备 ID 与配置一致。
pub fn open_simulated_compass(config: &CompassConfig) -> Result<Compass> {
    let controller = SimulatedController::new(SimulationConfig {
        port: config.serial_path.clone(),
        device_id: DeviceId::from(config.device_id.as_str()),
        ..Default::default()
    });

    CompassBuilder::from_config(config)?
        .build(controller)
        .with_context(|| format!("绑定设备失败: {} @ {}", config.device_id, config.serial_path))
}
