//! 响应信封
//!
//! 线上格式是一个 JSON 对象，`result` 与 `error` 恰好出现一个。
//! `result` 为 `null` 与缺少 `result` 是两回事：前者是合法的"航向角未知"。

use crate::ProtocolError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// 响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Envelope", into = "Envelope")]
pub enum Response {
    /// 成功
    Result(Value),
    /// 失败
    Error(String),
}

impl Response {
    /// 航向角响应
    ///
    /// JSON 无法表示 NaN/Inf，非有限值编码为 `null`。
    pub fn heading(yaw: f64) -> Self {
        Self::Result(serde_json::Number::from_f64(yaw).map_or(Value::Null, Value::Number))
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }

    /// 未注册的命令
    pub fn unknown_command(name: &str) -> Self {
        Self::Error(format!("unknown command {}", name))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// 把 `heading` 的结果解码为航向角，`null` 解码为 NaN
    ///
    /// 外层错误表示响应与命令不符；内层 `Err` 是对端返回的错误信息。
    pub fn into_heading(self) -> Result<Result<f64, String>, ProtocolError> {
        match self {
            Self::Result(Value::Null) => Ok(Ok(f64::NAN)),
            Self::Result(Value::Number(n)) => n
                .as_f64()
                .map(Ok)
                .ok_or_else(|| ProtocolError::UnexpectedResult(n.to_string())),
            Self::Result(other) => Err(ProtocolError::UnexpectedResult(other.to_string())),
            Self::Error(message) => Ok(Err(message)),
        }
    }
}

/// 线上信封
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Envelope {
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// 出现即为 `Some`（包括 `null`）
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl TryFrom<Envelope> for Response {
    type Error = ProtocolError;

    fn try_from(envelope: Envelope) -> Result<Self, ProtocolError> {
        match (envelope.result, envelope.error) {
            (Some(result), None) => Ok(Response::Result(result)),
            (None, Some(error)) => Ok(Response::Error(error)),
            (Some(_), Some(_)) => Err(ProtocolError::InvalidEnvelope(
                "both result and error present",
            )),
            (None, None) => Err(ProtocolError::InvalidEnvelope(
                "neither result nor error present",
            )),
        }
    }
}

impl From<Response> for Envelope {
    fn from(response: Response) -> Self {
        match response {
            Response::Result(result) => Envelope {
                result: Some(result),
                error: None,
            },
            Response::Error(error) => Envelope {
                result: None,
                error: Some(error),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_response_serialization() {
        let json = serde_json::to_string(&Response::heading(42.5)).unwrap();
        assert_eq!(json, r#"{"result":42.5}"#);

        let json = serde_json::to_string(&Response::heading(f64::NAN)).unwrap();
        assert_eq!(json, r#"{"result":null}"#);
    }

    #[test]
    fn test_error_response_serialization() {
        let json = serde_json::to_string(&Response::unknown_command("bogus")).unwrap();
        assert_eq!(json, r#"{"error":"unknown command bogus"}"#);
    }

    #[test]
    fn test_null_result_is_distinct_from_missing() {
        let response: Response = serde_json::from_str(r#"{"result":null}"#).unwrap();
        assert_eq!(response, Response::Result(Value::Null));

        let err = serde_json::from_str::<Response>(r#"{}"#).unwrap_err();
        assert!(err.to_string().contains("neither result nor error"), "{}", err);
    }

    #[test]
    fn test_both_keys_rejected() {
        let err = serde_json::from_str::<Response>(r#"{"result":1,"error":"x"}"#).unwrap_err();
        assert!(err.to_string().contains("both result and error"), "{}", err);
    }

    #[test]
    fn test_into_heading() {
        assert_eq!(Response::heading(-12.25).into_heading(), Ok(Ok(-12.25)));
        assert!(Response::heading(f64::NAN).into_heading().unwrap().unwrap().is_nan());
        assert_eq!(
            Response::unknown_command("x").into_heading(),
            Ok(Err("unknown command x".to_string()))
        );
        assert!(matches!(
            Response::Result(Value::String("north".into())).into_heading(),
            Err(ProtocolError::UnexpectedResult(_))
        ));
    }
}
