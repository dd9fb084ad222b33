//! 航向传感器通用接口
//!
//! 本地驱动和远程客户端都实现这个接口，上层代码可以不关心传感器在哪里。

/// 传感器能力描述
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensorProperties {
    /// 是否支持罗盘航向
    pub compass_heading_supported: bool,
}

/// 航向传感器
pub trait HeadingSensor {
    type Error: std::error::Error + Send + Sync + 'static;

    /// 最新航向角（度），未知时为 NaN
    fn heading(&self) -> Result<f64, Self::Error>;

    /// 所有读数（航向传感器只有一个读数）
    fn readings(&self) -> Result<Vec<f64>, Self::Error> {
        Ok(vec![self.heading()?])
    }

    /// 开始校准（MTi 在设备内部完成校准，默认无操作）
    fn start_calibration(&self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// 停止校准
    fn stop_calibration(&self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn properties(&self) -> SensorProperties {
        SensorProperties {
            compass_heading_supported: true,
        }
    }

    /// 释放传感器，重复调用必须安全
    fn close(&self) -> Result<(), Self::Error>;
}
