//! # MTi Protocol
//!
//! 远程航向访问的线协议定义（无 IO 依赖）
//!
//! ## 模块
//!
//! - `command`: 请求（命名命令，无请求体）
//! - `response`: 响应信封（`result` 与 `error` 二选一）
//! - `framing`: 行分隔 JSON 编解码
//!
//! ## 报文示例
//!
//! ```text
//! → {"name":"heading"}
//! ← {"result":42.5}
//! → {"name":"bogus"}
//! ← {"error":"unknown command bogus"}
//! ```
//!
//! 航向角未知（NaN）时响应为 `{"result":null}`。

pub mod command;
pub mod framing;
pub mod response;

pub use command::{Command, HEADING_COMMAND};
pub use framing::{DEFAULT_MAX_MESSAGE_LEN, decode_command, decode_response, encode_line};
pub use response::Response;

use thiserror::Error;

/// 协议错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// 请求不是合法 JSON 或缺少 `name`
    #[error("invalid command: {0}")]
    MalformedCommand(String),

    /// 响应不是合法 JSON
    #[error("invalid response: {0}")]
    MalformedResponse(String),

    /// 响应信封同时包含或同时缺少 `result` / `error`
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(&'static str),

    /// `result` 的类型与命令不符
    #[error("unexpected result: {0}")]
    UnexpectedResult(String),

    /// 编码失败
    #[error("encode error: {0}")]
    Encode(String),
}
