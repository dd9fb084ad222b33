//! 数据包
//!
//! 厂商 SDK 解码后的测量数据包的最小投影：驱动只关心姿态（欧拉角）。

/// 欧拉角（单位：度）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EulerAngles {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

impl EulerAngles {
    pub fn new(roll: f64, pitch: f64, yaw: f64) -> Self {
        Self { roll, pitch, yaw }
    }

    /// 只有航向角的姿态
    pub fn from_yaw(yaw: f64) -> Self {
        Self {
            roll: 0.0,
            pitch: 0.0,
            yaw,
        }
    }
}

/// 单个测量数据包
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DataPacket {
    /// 姿态数据（数据包可能不含姿态）
    pub orientation: Option<EulerAngles>,
    /// 设备采样时间（10kHz 计数，可选）
    pub sample_time_fine: Option<u32>,
}

impl DataPacket {
    /// 含姿态的数据包
    pub fn with_orientation(orientation: EulerAngles) -> Self {
        Self {
            orientation: Some(orientation),
            sample_time_fine: None,
        }
    }

    /// 只含航向角的数据包（测试/仿真用）
    pub fn with_yaw(yaw: f64) -> Self {
        Self::with_orientation(EulerAngles::from_yaw(yaw))
    }

    /// 不含姿态的数据包
    pub fn without_orientation() -> Self {
        Self::default()
    }

    pub fn sample_time_fine(mut self, sample_time_fine: u32) -> Self {
        self.sample_time_fine = Some(sample_time_fine);
        self
    }

    pub fn contains_orientation(&self) -> bool {
        self.orientation.is_some()
    }

    pub fn orientation_euler(&self) -> Option<EulerAngles> {
        self.orientation
    }

    /// 航向角（不做有效性检查，可能为 NaN）
    pub fn yaw(&self) -> Option<f64> {
        self.orientation.map(|euler| euler.yaw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_orientation() {
        let packet = DataPacket::with_yaw(42.5);
        assert!(packet.contains_orientation());
        assert_eq!(packet.yaw(), Some(42.5));

        let empty = DataPacket::without_orientation();
        assert!(!empty.contains_orientation());
        assert_eq!(empty.yaw(), None);
    }

    #[test]
    fn test_packet_nan_yaw_is_passed_through() {
        let packet = DataPacket::with_yaw(f64::NAN);
        assert!(packet.contains_orientation());
        assert!(packet.yaw().is_some_and(f64::is_nan));
    }

    #[test]
    fn test_packet_sample_time() {
        let packet =
            DataPacket::with_orientation(EulerAngles::new(1.0, 2.0, 3.0)).sample_time_fine(10);
        assert_eq!(packet.sample_time_fine, Some(10));
        assert_eq!(packet.orientation_euler(), Some(EulerAngles::new(1.0, 2.0, 3.0)));
    }
}
