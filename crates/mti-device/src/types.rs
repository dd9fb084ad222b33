//! 设备标识与端口描述

use std::fmt;
use std::ops::BitOr;

/// 设备 ID（十六进制序列号，如 `"02782090"`）
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for DeviceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// 控制器支持的串口波特率
///
/// 只列出驱动静态支持的档位，其他值在打开端口之前就被拒绝。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaudRate {
    /// 115200 bps（MTi 出厂默认）
    B115200,
}

impl BaudRate {
    /// 静态支持列表
    pub const SUPPORTED: [BaudRate; 1] = [BaudRate::B115200];

    /// 从 bps 数值转换，不在支持列表中返回 `None`
    pub fn from_bps(bps: u32) -> Option<Self> {
        Self::SUPPORTED.into_iter().find(|rate| rate.bps() == bps)
    }

    pub fn bps(self) -> u32 {
        match self {
            BaudRate::B115200 => 115_200,
        }
    }

    /// 支持列表的 bps 数值（用于错误信息）
    pub fn supported_bps() -> Vec<u32> {
        Self::SUPPORTED.iter().map(|rate| rate.bps()).collect()
    }
}

impl fmt::Display for BaudRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bps())
    }
}

/// 扫描得到的端口信息
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PortInfo {
    /// 端口路径（如 `/dev/ttyUSB0`）
    pub path: String,
    /// 端口上探测到的设备 ID
    pub device_id: DeviceId,
    /// 探测到的波特率（bps，可能不在支持列表中）
    pub baud_rate: u32,
}

/// 已绑定的物理设备
///
/// 构造成功后不可变，由驱动独占。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceHandle {
    pub device_id: DeviceId,
    pub port: String,
    pub baud_rate: BaudRate,
}

/// 设备选项标志位（对应 `XsDeviceOptionFlag`）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct DeviceOptionFlags(u32);

impl DeviceOptionFlags {
    pub const NONE: Self = Self(0);
    /// 连续零速更新（Zero Rotation Update）
    pub const ENABLE_CONTINUOUS_ZRU: Self = Self(0x0000_1000);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for DeviceOptionFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baud_rate_from_bps() {
        assert_eq!(BaudRate::from_bps(115_200), Some(BaudRate::B115200));
        assert_eq!(BaudRate::from_bps(9_600), None);
        assert_eq!(BaudRate::from_bps(0), None);
        assert_eq!(BaudRate::supported_bps(), vec![115_200]);
        assert_eq!(BaudRate::B115200.to_string(), "115200");
    }

    #[test]
    fn test_device_option_flags() {
        let flags = DeviceOptionFlags::NONE | DeviceOptionFlags::ENABLE_CONTINUOUS_ZRU;
        assert!(flags.contains(DeviceOptionFlags::ENABLE_CONTINUOUS_ZRU));
        assert!(!flags.is_empty());
        assert!(DeviceOptionFlags::NONE.is_empty());
        assert_eq!(DeviceOptionFlags::from_bits(flags.bits()), flags);
    }

    #[test]
    fn test_device_id_display() {
        let id = DeviceId::from("02782090");
        assert_eq!(id.to_string(), "02782090");
        assert_eq!(id.as_str(), "02782090");
        assert_eq!(id, DeviceId::new(String::from("02782090")));
    }
}
