//! # 工作站配置
//!
//! 从 TOML 文件加载的工作站配置。所有字段都有默认值，
//! 配置文件只需写出需要覆盖的项。
//!
//! ```toml
//! [loops]
//! control_period_ms = 20
//!
//! [display]
//! channel = "depth"
//!
//! [calibration]
//! record_path = "calibration.bin"
//! load_on_start = true
//! ```

use crate::ToolsError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 工作站配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StationConfig {
    /// 循环周期
    pub loops: LoopSettings,

    /// 显示区域与读数格式
    pub display: DisplaySettings,

    /// 标定设置
    pub calibration: CalibrationSettings,
}

impl StationConfig {
    /// 从 TOML 文件加载配置
    ///
    /// # 错误
    ///
    /// 文件不可读、TOML 无效或值越界时返回错误
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ToolsError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// 从 TOML 字符串解析并校验
    pub fn from_toml_str(content: &str) -> Result<Self, ToolsError> {
        let config: StationConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 保存配置到文件
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ToolsError> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// 校验配置值
    pub fn validate(&self) -> Result<(), ToolsError> {
        let loops = &self.loops;
        for (name, period) in [
            ("sensor_period_ms", loops.sensor_period_ms),
            ("control_period_ms", loops.control_period_ms),
            ("telemetry_period_ms", loops.telemetry_period_ms),
            ("cursor_period_ms", loops.cursor_period_ms),
        ] {
            if period == 0 {
                return Err(ToolsError::InvalidConfig(format!(
                    "loops.{name} must be greater than zero"
                )));
            }
        }

        if self.display.width == 0 || self.display.height == 0 {
            return Err(ToolsError::InvalidConfig(format!(
                "display region {}x{} is empty",
                self.display.width, self.display.height
            )));
        }

        if self.calibration.clicks_required < 3 {
            return Err(ToolsError::InvalidConfig(format!(
                "calibration.clicks_required must be at least 3, got {}",
                self.calibration.clicks_required
            )));
        }

        if self.calibration.click_world_points.len() != self.calibration.clicks_required {
            return Err(ToolsError::InvalidConfig(format!(
                "calibration.click_world_points has {} entries, expected {}",
                self.calibration.click_world_points.len(),
                self.calibration.clicks_required
            )));
        }

        Ok(())
    }
}

/// 循环周期（毫秒）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopSettings {
    pub sensor_period_ms: u64,
    pub control_period_ms: u64,
    pub telemetry_period_ms: u64,
    pub cursor_period_ms: u64,
    /// 关闭时等待每个线程的最长时间
    pub join_timeout_ms: u64,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            sensor_period_ms: 30,
            control_period_ms: 50,
            telemetry_period_ms: 100,
            cursor_period_ms: 50,
            join_timeout_ms: 2000,
        }
    }
}

/// 显示设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// 图像区域左上角（屏幕坐标）
    pub origin_x: i32,
    pub origin_y: i32,
    /// 图像区域尺寸（像素）
    pub width: u32,
    pub height: u32,
    /// 关节显示偏移（度），按关节顺序
    pub joint_offsets_deg: Vec<f64>,
    /// 默认显示通道：`rgb` / `depth` / `detect`
    pub channel: String,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            origin_x: 240,
            origin_y: 40,
            width: 640,
            height: 480,
            joint_offsets_deg: vec![0.0, 90.0, 0.0, 0.0],
            channel: "rgb".to_string(),
        }
    }
}

/// 标定设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationSettings {
    /// 标定记录文件
    pub record_path: Option<PathBuf>,
    /// 启动时加载已有标定
    pub load_on_start: bool,
    /// 一次标定需要的点击数
    pub clicks_required: usize,
    /// 每次点击对应的世界坐标（毫米），顺序与点击顺序一致
    pub click_world_points: Vec<[f64; 2]>,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            record_path: None,
            load_on_start: false,
            clicks_required: 4,
            click_world_points: vec![
                [-150.0, 250.0],
                [150.0, 250.0],
                [150.0, 100.0],
                [-150.0, 100.0],
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_yields_defaults() {
        let config = StationConfig::from_toml_str("").unwrap();
        assert_eq!(config, StationConfig::default());
        assert_eq!(config.loops.control_period_ms, 50);
        assert_eq!(config.display.joint_offsets_deg[1], 90.0);
    }

    #[test]
    fn test_partial_override() {
        let config = StationConfig::from_toml_str(
            r#"
[loops]
control_period_ms = 20

[display]
channel = "depth"
"#,
        )
        .unwrap();

        assert_eq!(config.loops.control_period_ms, 20);
        assert_eq!(config.loops.sensor_period_ms, 30);
        assert_eq!(config.display.channel, "depth");
        assert_eq!(config.display.width, 640);
    }

    #[test]
    fn test_rejects_zero_period() {
        let err = StationConfig::from_toml_str("[loops]\ntelemetry_period_ms = 0\n").unwrap_err();
        assert!(matches!(err, ToolsError::InvalidConfig(_)));
        assert!(err.to_string().contains("telemetry_period_ms"));
    }

    #[test]
    fn test_rejects_mismatched_click_points() {
        let err = StationConfig::from_toml_str(
            "[calibration]\nclicks_required = 3\n",
        )
        .unwrap_err();
        assert!(matches!(err, ToolsError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_malformed_toml() {
        let err = StationConfig::from_toml_str("[loops\n").unwrap_err();
        assert!(matches!(err, ToolsError::ConfigParse(_)));
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("station.toml");

        let mut config = StationConfig::default();
        config.calibration.record_path = Some(temp_dir.path().join("calib.bin"));
        config.calibration.load_on_start = true;
        config.save(&path).unwrap();

        let loaded = StationConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file() {
        let err = StationConfig::load("/nonexistent/station.toml").unwrap_err();
        assert!(matches!(err, ToolsError::Io(_)));
    }
}
