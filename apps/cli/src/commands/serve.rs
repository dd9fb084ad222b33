//! 航向服务命令

use super::config::DeviceArgs;
use super::open_simulated_compass;
use crate::utils::sleep_unless_shutdown;
use anyhow::{Context, Result};
use clap::Args;
use mti_remote::{CommandRegistry, HeadingServer, ServerConfig};
use std::sync::atomic::AtomicBool;
use std::time::Duration;
use tracing::{info, warn};

/// 服务命令参数
#[derive(Args, Debug)]
pub struct ServeCommand {
    #[command(flatten)]
    pub device: DeviceArgs,

    /// 监听端口
    #[arg(short, long, default_value_t = 4444)]
    pub port: u16,

    /// 监听地址（协议没有鉴权，0.0.0.0 会暴露给所有网络接口）
    #[arg(long, default_value = "localhost")]
    pub bind: String,

    /// 状态日志间隔（秒，0 表示不输出）
    #[arg(long, default_value_t = 10)]
    pub stats_interval: u64,
}

impl ServeCommand {
    fn server_config(&self) -> ServerConfig {
        ServerConfig::with_host_port(&self.bind, self.port)
    }

    /// 运行直到收到关闭信号
    pub fn execute(&self, shutdown: &AtomicBool) -> Result<()> {
        let config = self.device.resolve()?;
        let compass = open_simulated_compass(&config)?;

        let registry = CommandRegistry::with_heading(compass.heading_cache());
        let server = HeadingServer::bind(self.server_config(), registry)
            .context("启动服务端失败")?
            .spawn()
            .context("启动服务端失败")?;
        info!(addr = %server.local_addr(), commands = ?["heading"], "serving");

        let tick = if self.stats_interval == 0 {
            Duration::from_secs(1)
        } else {
            Duration::from_secs(self.stats_interval)
        };
        while sleep_unless_shutdown(shutdown, tick) {
            if self.stats_interval == 0 {
                continue;
            }
            let metrics = compass.metrics();
            let stats = server.stats();
            info!(
                packets = metrics.packets_total,
                valid_rate = format!("{:.1}%", metrics.valid_heading_rate()),
                sessions = stats.active_sessions,
                commands = stats.commands_handled,
                "status"
            );
        }

        let server_result = server.join();
        let compass_result = compass.close();
        if let Err(e) = &server_result {
            warn!("heading server did not stop cleanly: {}", e);
        }
        server_result.context("停止服务端失败")?;
        compass_result.context("关闭设备失败")?;

        info!("stopped");
        Ok(())
    }
}
