//! 测试辅助函数

#![allow(dead_code)]

use std::thread;
use std::time::{Duration, Instant};

/// 轮询等待条件成立，超时返回 false
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    condition()
}

pub const WAIT: Duration = Duration::from_secs(2);
