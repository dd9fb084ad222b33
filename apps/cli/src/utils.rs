//! 工具函数

use anyhow::{Context, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::info;

/// 检查关闭标志的最大间隔
const SHUTDOWN_CHECK_INTERVAL: Duration = Duration::from_millis(50);

/// 安装 Ctrl+C 处理器，返回关闭标志
pub fn install_shutdown_handler() -> Result<Arc<AtomicBool>> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    ctrlc::set_handler(move || {
        info!("received interrupt signal, shutting down");
        flag.store(true, Ordering::Release);
    })
    .context("设置 Ctrl+C 处理器失败")?;
    Ok(shutdown)
}

/// 休眠 `duration`，期间收到关闭信号则提前返回
///
/// 返回 `true` 表示应当继续运行。
pub fn sleep_unless_shutdown(shutdown: &AtomicBool, duration: Duration) -> bool {
    let deadline = Instant::now() + duration;
    loop {
        if shutdown.load(Ordering::Acquire) {
            return false;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return true;
        }
        thread::sleep(remaining.min(SHUTDOWN_CHECK_INTERVAL));
    }
}

/// 航向角显示格式，未知时显示 `unknown`
pub fn format_heading(heading: f64) -> String {
    if heading.is_finite() {
        format!("{:.2}°", heading)
    } else {
        "unknown".to_string()
    }
}
