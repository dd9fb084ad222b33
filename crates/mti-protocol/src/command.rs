//! 请求

use serde::{Deserialize, Serialize};

/// 读取最新航向角
pub const HEADING_COMMAND: &str = "heading";

/// 命名命令
///
/// 命令没有请求体；`args` 只为兼容携带参数的客户端而接受，服务端忽略它。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<serde_json::Value>,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: None,
        }
    }

    /// `heading` 命令
    pub fn heading() -> Self {
        Self::new(HEADING_COMMAND)
    }
}
