//! 驱动层错误类型定义

use thiserror::Error;

/// 驱动层错误类型
///
/// 按照处理方式分为三类：
/// - **瞬时错误**（`Capture` / `Actuator`）：跳过本周期，下个周期重试
/// - **安全故障**（`EstopTriggered`）：置位急停锁存，直到操作员显式复位
/// - **致命错误**（`MalformedFrame`）：内部不变量被破坏，停止所有线程
#[derive(Error, Debug)]
pub enum StationError {
    /// 视觉采集或帧转换失败（如相机断开）
    #[error("Vision capture error: {0}")]
    Capture(String),

    /// 执行器/电机总线通信失败
    #[error("Actuator error: {0}")]
    Actuator(String),

    /// 执行器或状态机报告急停条件
    #[error("Emergency stop triggered: {0}")]
    EstopTriggered(String),

    /// 急停锁存期间拒绝运动指令
    #[error("Motion command blocked: emergency stop asserted")]
    MotionBlocked,

    /// 帧三元组格式错误（内部不变量被破坏）
    #[error("Malformed frame set: {0}")]
    MalformedFrame(String),

    /// 标定数据无效
    #[error("Calibration error: {0}")]
    Calibration(String),

    /// 配置无效
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// 线程创建失败
    #[error("Failed to spawn thread: {0}")]
    ThreadSpawn(#[from] std::io::Error),

    /// 构建时缺少协作者
    #[error("Missing collaborator: {0}")]
    MissingCollaborator(&'static str),

    /// 工作站已停止
    #[error("Station is shut down")]
    ShutDown,
}

impl StationError {
    /// 是否为瞬时硬件错误（跳过本周期后重试）
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Capture(_) | Self::Actuator(_))
    }

    /// 是否为安全故障（需要置位急停锁存）
    pub fn is_safety_fault(&self) -> bool {
        matches!(self, Self::EstopTriggered(_))
    }

    /// 是否为致命错误（停止整个工作站）
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::MalformedFrame(_))
    }
}

#[cfg(test)]
mod tests {
    use super::StationError;

    #[test]
    fn test_station_error_display() {
        let err = StationError::Capture("device unplugged".to_string());
        assert_eq!(format!("{}", err), "Vision capture error: device unplugged");

        let err = StationError::MotionBlocked;
        assert!(format!("{}", err).contains("emergency stop"));

        let err = StationError::MissingCollaborator("vision");
        assert_eq!(format!("{}", err), "Missing collaborator: vision");

        let err = StationError::ShutDown;
        assert_eq!(format!("{}", err), "Station is shut down");
    }

    #[test]
    fn test_error_classification() {
        assert!(StationError::Capture(String::new()).is_transient());
        assert!(StationError::Actuator(String::new()).is_transient());
        assert!(!StationError::MotionBlocked.is_transient());

        assert!(StationError::EstopTriggered("overcurrent".into()).is_safety_fault());
        assert!(!StationError::Actuator("bus".into()).is_safety_fault());

        assert!(StationError::MalformedFrame("empty rgb".into()).is_fatal());
        assert!(!StationError::Capture("timeout".into()).is_fatal());
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::other("no threads left");
        let err: StationError = io.into();
        match err {
            StationError::ThreadSpawn(e) => assert!(e.to_string().contains("no threads")),
            _ => panic!("Expected ThreadSpawn variant"),
        }
    }
}
