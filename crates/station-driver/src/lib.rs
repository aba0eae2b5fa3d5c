//! 工作站编排层
//!
//! 本 crate 提供视觉引导机械臂工作站的实时协调功能，包括：
//! - 固定周期后台线程（采集 30 ms / 控制 50 ms / 遥测 100 ms）
//! - 覆盖式快照发布（ArcSwap 无锁读取，Latest-Wins 单槽邮箱）
//! - 急停锁存与运动拦截
//! - 像素 → 世界坐标标定查找与点击采集
//! - UI 线程的光标采样定时器
//!
//! 相机驱动、电机总线、任务状态机都是外部协作者，
//! 通过 [`VisionSensor`]、[`ArmActuator`]、[`StateMachine`] 三个 trait 接入。

mod builder;
pub mod calibration;
pub mod collaborator;
pub mod cursor;
mod error;
pub mod estop;
pub mod frame;
pub mod mailbox;
pub mod metrics;
pub mod panel;
pub mod pipeline;
pub mod readout;
pub mod state;
mod station;
pub mod timer;

pub use builder::StationBuilder;
pub use calibration::{CalibrationMap, CoordTable, ImageRegion, PixelCoord, ScreenPoint, WorldXY};
pub use collaborator::{
    ArmActuator, SafetyGate, StateMachine, StateRequest, TaskRoutine, VisionSensor,
};
pub use cursor::{
    CursorReadout, CursorSampler, DepthConverter, PixelReadout, UNAVAILABLE_TEXT, WorldReadout,
};
pub use error::StationError;
pub use estop::{EstopLatch, SafetyState};
pub use frame::{DepthFrame, FrameSet, Image, PixelFormat, VideoChannel};
pub use mailbox::{Envelope, Mailbox, MailboxReader, Slot};
pub use metrics::{MetricsSnapshot, StationMetrics};
pub use panel::{OperatorPanel, SliderInput};
pub use pipeline::{Pacer, PipelineConfig, control_loop, sensor_loop, telemetry_loop};
pub use readout::{JointDisplayConfig, TelemetrySnapshot, format_signed};
pub use state::*;
pub use station::{ShutdownReport, Station, ThreadHealth};
pub use timer::{CursorProvider, CursorTimer, PeriodicTimer};
