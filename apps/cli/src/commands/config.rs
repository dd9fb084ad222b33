//! 设备配置加载
//!
//! 优先级：命令行参数 > `--config` 指定的文件 > 默认配置文件 > 内置默认值。

use anyhow::{Context, Result};
use clap::Args;
use mti_driver::{CompassConfig, PathPolicy};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 默认串口路径
pub const DEFAULT_DEVICE: &str = "/dev/ttyUSB0";

/// 默认设备 ID
pub const DEFAULT_DEVICE_ID: &str = "02782090";

/// 配置目录（`<config_dir>/mti`）
fn config_dir() -> Result<PathBuf> {
    let mut path = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("无法确定配置目录"))?;

    path.push("mti");
    Ok(path)
}

/// 默认配置文件路径（不检查是否存在）
pub fn default_config_file() -> Result<PathBuf> {
    let mut path = config_dir()?;
    path.push("config.toml");
    Ok(path)
}

/// 读取并解析配置文件
pub fn load_config_file(path: &Path) -> Result<CompassConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("解析配置文件失败: {}", path.display()))
}

/// 设备相关参数（serve / read / check-config 共用）
#[derive(Args, Debug, Clone, Default)]
pub struct DeviceArgs {
    /// 配置文件（TOML）
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 串口路径（覆盖配置，默认 /dev/ttyUSB0）
    #[arg(short, long)]
    pub device: Option<String>,

    /// 设备 ID（覆盖配置，默认 02782090）
    #[arg(long)]
    pub device_id: Option<String>,

    /// 串口波特率（覆盖配置）
    #[arg(short, long)]
    pub baud: Option<u32>,

    /// 路径不一致时改用实际发现的路径
    #[arg(long)]
    pub lenient: bool,
}

impl DeviceArgs {
    /// 合并配置文件和命令行参数，并校验结果
    pub fn resolve(&self) -> Result<CompassConfig> {
        let fallback = default_config_file()
            .ok()
            .filter(|path| path.exists());
        self.resolve_with(fallback.as_deref())
    }

    /// `fallback` 是未指定 `--config` 时使用的配置文件
    pub fn resolve_with(&self, fallback: Option<&Path>) -> Result<CompassConfig> {
        let mut config = match self.config.as_deref().or(fallback) {
            Some(path) => {
                debug!(path = %path.display(), "loading config file");
                load_config_file(path)?
            },
            None => CompassConfig::default(),
        };

        if let Some(device) = &self.device {
            config.serial_path = device.clone();
        }
        if let Some(device_id) = &self.device_id {
            config.device_id = device_id.clone();
        }
        if let Some(baud) = self.baud {
            config.serial_baud_rate = baud;
        }
        if self.lenient {
            config.path_policy = PathPolicy::Lenient;
        }

        if config.serial_path.is_empty() {
            config.serial_path = DEFAULT_DEVICE.to_string();
        }
        if config.device_id.is_empty() {
            config.device_id = DEFAULT_DEVICE_ID.to_string();
        }

        config.validate().context("配置无效")?;
        Ok(config)
    }
}

/// 配置检查命令参数
#[derive(Args, Debug)]
pub struct CheckConfigCommand {
    #[command(flatten)]
    pub device: DeviceArgs,
}

impl CheckConfigCommand {
    /// 打印合并后的配置（TOML）
    pub fn execute(&self) -> Result<()> {
        let config = self.device.resolve()?;
        let rendered = toml::to_string_pretty(&config).context("序列化配置失败")?;

        println!("✅ 配置有效");
        if let Some(path) = &self.device.config {
            println!("# source: {}", path.display());
        }
        print!("{}", rendered);
        Ok(())
    }
}
