//! 远程读取命令

use crate::utils::{format_heading, sleep_unless_shutdown};
use anyhow::{Context, Result};
use clap::Args;
use mti_remote::{ClientConfig, RemoteCompass, RemoteError};
use std::sync::atomic::AtomicBool;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 远程读取命令参数
#[derive(Args, Debug)]
pub struct WatchCommand {
    /// 服务端地址
    #[arg(short, long, default_value = "localhost:4444")]
    pub addr: String,

    /// 读取间隔（毫秒）
    #[arg(short, long, default_value_t = 1000)]
    pub interval_ms: u64,

    /// 连接和请求超时（毫秒）
    #[arg(short, long, default_value_t = 5000)]
    pub timeout_ms: u64,
}

/// 单次读取后的去向
#[derive(Debug, PartialEq, Eq)]
enum Step {
    Continue,
    EndOfStream,
}

impl WatchCommand {
    pub fn execute(&self, shutdown: &AtomicBool) -> Result<()> {
        let config = ClientConfig::new(self.addr.clone())
            .timeout(Duration::from_millis(self.timeout_ms));
        let client = RemoteCompass::connect(&config)
            .with_context(|| format!("连接服务端失败: {}", self.addr))?;
        info!(peer = %client.peer_addr(), "connected");

        let interval = Duration::from_millis(self.interval_ms);
        loop {
            if Self::poll(&client)? == Step::EndOfStream {
                info!("server closed the connection");
                break;
            }
            if !sleep_unless_shutdown(shutdown, interval) {
                break;
            }
        }

        client.close()?;
        Ok(())
    }

    /// 读取一次航向
    ///
    /// 错误信封只记录日志，对端断开（EOF 或连接重置）结束循环，其余错误向上返回。
    fn poll(client: &RemoteCompass) -> Result<Step> {
        match client.heading() {
            Ok(heading) => {
                info!(heading = %format_heading(heading), "heading");
                Ok(Step::Continue)
            },
            Err(RemoteError::Remote(message)) => {
                warn!("server returned error: {}", message);
                Ok(Step::Continue)
            },
            Err(e) if e.is_disconnect() => {
                debug!("connection ended: {}", e);
                Ok(Step::EndOfStream)
            },
            Err(e) => Err(e).context("读取航向失败"),
        }
    }
}
