//! # Station Tools - 共享数据结构和算法
//!
//! **依赖原则**: 不依赖 `station-driver`，只包含纯数据和纯函数
//!
//! ## 包含模块
//!
//! - `config` - 工作站 TOML 配置
//! - `calibration_record` - 标定结果持久化（bincode）
//! - `affine` - 像素 → 世界坐标仿射拟合（nalgebra 最小二乘）

pub mod affine;
pub mod calibration_record;
pub mod config;
mod error;

// 重新导出常用类型
pub use affine::AffineFit;
pub use calibration_record::CalibrationRecord;
pub use config::{CalibrationSettings, DisplaySettings, LoopSettings, StationConfig};
pub use error::ToolsError;
