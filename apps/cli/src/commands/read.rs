//! 本地读取命令
//!
//! 在进程内绑定设备，不经过网络。

use super::config::DeviceArgs;
use super::open_simulated_compass;
use crate::utils::{format_heading, sleep_unless_shutdown};
use anyhow::{Context, Result};
use clap::Args;
use mti_driver::HeadingState;
use serde::Serialize;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

/// 本地读取命令参数
#[derive(Args, Debug)]
pub struct ReadCommand {
    #[command(flatten)]
    pub device: DeviceArgs,

    /// 打印间隔（毫秒）
    #[arg(short, long, default_value_t = 100)]
    pub interval_ms: u64,

    /// 输出格式（text 或 json）
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

/// 一行 JSON 输出
#[derive(Debug, Serialize)]
struct Sample {
    /// 航向角（度），未知时为 null
    heading: Option<f64>,
    /// 距上次更新的时间（毫秒）
    age_ms: Option<u128>,
}

impl From<HeadingState> for Sample {
    fn from(state: HeadingState) -> Self {
        Self {
            heading: state.is_known().then_some(state.yaw),
            age_ms: state.age().map(|age| age.as_millis()),
        }
    }
}

impl ReadCommand {
    pub fn execute(&self, shutdown: &AtomicBool) -> Result<()> {
        let json = match self.format.as_str() {
            "text" => false,
            "json" => true,
            other => anyhow::bail!("不支持的输出格式: {}", other),
        };

        let config = self.device.resolve()?;
        let compass = open_simulated_compass(&config)?;
        let interval = Duration::from_millis(self.interval_ms);

        while sleep_unless_shutdown(shutdown, interval) {
            let state = compass.heading_state();
            if json {
                let line = serde_json::to_string(&Sample::from(state)).context("序列化失败")?;
                println!("{}", line);
            } else {
                println!("heading: {}", format_heading(state.yaw));
            }
        }

        let metrics = compass.metrics();
        compass.close().context("关闭设备失败")?;

        if json {
            println!("{}", serde_json::to_string(&metrics).context("序列化失败")?);
        } else {
            println!(
                "📊 {} packets, {} headings ({:.1}% valid), {} errors",
                metrics.packets_total,
                metrics.headings_published(),
                metrics.valid_heading_rate(),
                metrics.packet_errors
            );
        }
        Ok(())
    }
}
