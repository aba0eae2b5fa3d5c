//! Builder 模式实现
//!
//! 提供链式构造 `Station` 实例的便捷方式。

use crate::calibration::{CalibrationMap, ImageRegion};
use crate::collaborator::{ArmActuator, StateMachine, VisionSensor};
use crate::error::StationError;
use crate::mailbox::{Mailbox, Slot};
use crate::metrics::StationMetrics;
use crate::pipeline::{PipelineConfig, control_loop, sensor_loop, telemetry_loop};
use crate::readout::JointDisplayConfig;
use crate::state::RobotContext;
use crate::station::{LoopThreads, Station};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use tracing::info;

/// Station Builder（链式构造）
///
/// # Example
///
/// ```no_run
/// # use station_driver::*;
/// # fn collaborators() -> (Box<dyn VisionSensor>, Box<dyn ArmActuator>, Box<dyn StateMachine>) { unimplemented!() }
/// let (vision, arm, machine) = collaborators();
/// let station = StationBuilder::new()
///     .pipeline_config(PipelineConfig::default())
///     .vision(vision)
///     .arm(arm)
///     .state_machine(machine)
///     .build()
///     .unwrap();
/// ```
#[derive(Default)]
pub struct StationBuilder {
    pipeline_config: Option<PipelineConfig>,
    region: Option<ImageRegion>,
    joint_display: Option<JointDisplayConfig>,
    calibration: Option<Arc<CalibrationMap>>,
    context: Option<Arc<RobotContext>>,
    vision: Option<Box<dyn VisionSensor>>,
    arm: Option<Box<dyn ArmActuator>>,
    machine: Option<Box<dyn StateMachine>>,
}

impl StationBuilder {
    /// 创建新的 Builder
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置 Pipeline 配置
    pub fn pipeline_config(mut self, config: PipelineConfig) -> Self {
        self.pipeline_config = Some(config);
        self
    }

    /// 设置图像显示区域（默认 origin (240, 40)，640×480）
    pub fn image_region(mut self, region: ImageRegion) -> Self {
        self.region = Some(region);
        self
    }

    /// 设置关节显示偏移
    pub fn joint_display(mut self, display: JointDisplayConfig) -> Self {
        self.joint_display = Some(display);
        self
    }

    /// 使用外部创建的标定映射
    ///
    /// 标定流程（状态机）需要在构造时拿到同一个句柄。
    /// 未设置时按图像区域尺寸创建一个未标定的映射。
    pub fn calibration(mut self, calibration: Arc<CalibrationMap>) -> Self {
        self.calibration = Some(calibration);
        self
    }

    /// 使用外部创建的共享状态（测试用）
    pub fn context(mut self, ctx: Arc<RobotContext>) -> Self {
        self.context = Some(ctx);
        self
    }

    pub fn vision(mut self, vision: Box<dyn VisionSensor>) -> Self {
        self.vision = Some(vision);
        self
    }

    pub fn arm(mut self, arm: Box<dyn ArmActuator>) -> Self {
        self.arm = Some(arm);
        self
    }

    pub fn state_machine(mut self, machine: Box<dyn StateMachine>) -> Self {
        self.machine = Some(machine);
        self
    }

    /// 构建并启动工作站
    ///
    /// # 错误
    ///
    /// - `MissingCollaborator`：未设置视觉/执行器/状态机
    /// - `Config`：配置无效，或标定映射尺寸与图像区域不一致
    /// - `ThreadSpawn`：线程创建失败（已启动的线程会被通知退出）
    pub fn build(self) -> Result<Station, StationError> {
        let config = self.pipeline_config.unwrap_or_default();
        config.validate()?;
        let region = self.region.unwrap_or_default();
        let display = self.joint_display.unwrap_or_default();

        let vision = self.vision.ok_or(StationError::MissingCollaborator("vision"))?;
        let arm = self.arm.ok_or(StationError::MissingCollaborator("arm"))?;
        let machine = self
            .machine
            .ok_or(StationError::MissingCollaborator("state machine"))?;

        let calibration = match self.calibration {
            Some(map) => {
                if map.dimensions() != (region.width, region.height) {
                    return Err(StationError::Config(format!(
                        "calibration map is {:?}, image region is {}x{}",
                        map.dimensions(),
                        region.width,
                        region.height
                    )));
                }
                map
            },
            None => Arc::new(CalibrationMap::for_region(&region)),
        };

        let ctx = self.context.unwrap_or_else(|| Arc::new(RobotContext::new()));
        let frames = Arc::new(Mailbox::new());
        let telemetry = Arc::new(Mailbox::new());
        let is_running = Arc::new(AtomicBool::new(true));
        let metrics = Arc::new(StationMetrics::new());
        let fatal = Arc::new(Slot::new());

        let sensor = {
            let (frames, config, is_running_loop, metrics, fatal) = (
                frames.clone(),
                config.clone(),
                is_running.clone(),
                metrics.clone(),
                fatal.clone(),
            );
            spawn_named("station-sensor", &is_running, move || {
                sensor_loop(vision, frames, config, is_running_loop, metrics, fatal)
            })?
        };

        let control = {
            let (ctx, config, is_running_loop, metrics) =
                (ctx.clone(), config.clone(), is_running.clone(), metrics.clone());
            spawn_named("station-control", &is_running, move || {
                control_loop(arm, machine, ctx, config, is_running_loop, metrics)
            })?
        };

        let telemetry_thread = {
            let (ctx, telemetry, config, is_running_loop, metrics) = (
                ctx.clone(),
                telemetry.clone(),
                config.clone(),
                is_running.clone(),
                metrics.clone(),
            );
            spawn_named("station-telemetry", &is_running, move || {
                telemetry_loop(ctx, telemetry, display, config, is_running_loop, metrics)
            })?
        };

        let threads = LoopThreads {
            sensor: Some(sensor),
            control: Some(control),
            telemetry: Some(telemetry_thread),
        };

        info!(
            "Station started: sensor {} ms, control {} ms, telemetry {} ms",
            config.sensor_period_ms, config.control_period_ms, config.telemetry_period_ms
        );

        Ok(Station::from_parts(
            ctx,
            calibration,
            frames,
            telemetry,
            is_running,
            metrics,
            fatal,
            config,
            region,
            threads,
        ))
    }
}

/// 创建命名线程
///
/// 创建失败时清除运行标志，已经启动的线程随之退出。
fn spawn_named(
    name: &str,
    is_running: &AtomicBool,
    f: impl FnOnce() + Send + 'static,
) -> Result<JoinHandle<()>, StationError> {
    thread::Builder::new().name(name.to_string()).spawn(f).map_err(|e| {
        // Release: All writes before this are visible to threads that see the false value
        is_running.store(false, Ordering::Release);
        StationError::ThreadSpawn(e)
    })
}
