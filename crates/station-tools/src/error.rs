//! 工具层错误类型定义

use thiserror::Error;

/// 工具层错误类型
#[derive(Error, Debug)]
pub enum ToolsError {
    /// 文件读写失败
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML 解析失败
    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// TOML 序列化失败
    #[error("Failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// 配置值无效
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// 标定记录编解码失败
    #[error("Calibration record encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    /// 标定记录格式无效
    #[error("Invalid calibration record: {0}")]
    InvalidRecord(String),

    /// 拟合失败（点数不足或共线）
    #[error("Calibration fit failed: {0}")]
    Fit(String),
}

#[cfg(test)]
mod tests {
    use super::ToolsError;

    #[test]
    fn test_tools_error_display() {
        let err = ToolsError::Fit("need at least 3 points, got 2".to_string());
        assert_eq!(
            format!("{}", err),
            "Calibration fit failed: need at least 3 points, got 2"
        );

        let err = ToolsError::InvalidRecord("magic mismatch".to_string());
        assert_eq!(format!("{}", err), "Invalid calibration record: magic mismatch");
    }

    #[test]
    fn test_tools_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "calib.bin");
        let err: ToolsError = io.into();
        assert!(matches!(err, ToolsError::Io(_)));
    }
}
