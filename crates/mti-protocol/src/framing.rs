//! 行分隔 JSON 编解码
//!
//! 每条消息是一行 UTF-8 JSON，以 `\n` 结尾。解码时容忍 `\r\n`。

use crate::{Command, ProtocolError, Response};
use serde::Serialize;

/// 单条消息的默认最大长度（字节，不含换行）
pub const DEFAULT_MAX_MESSAGE_LEN: usize = 10 * (1 << 24);

/// 编码为一行（带结尾换行）
pub fn encode_line<T: Serialize>(message: &T) -> Result<Vec<u8>, ProtocolError> {
    let mut line =
        serde_json::to_vec(message).map_err(|e| ProtocolError::Encode(e.to_string()))?;
    line.push(b'\n');
    Ok(line)
}

/// 去掉行尾换行
fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// 解码请求
pub fn decode_command(line: &[u8]) -> Result<Command, ProtocolError> {
    serde_json::from_slice(trim_line_ending(line))
        .map_err(|e| ProtocolError::MalformedCommand(e.to_string()))
}

/// 解码响应
pub fn decode_response(line: &[u8]) -> Result<Response, ProtocolError> {
    serde_json::from_slice(trim_line_ending(line))
        .map_err(|e| ProtocolError::MalformedResponse(e.to_string()))
}
