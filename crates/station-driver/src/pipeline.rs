//! Pipeline 循环模块
//!
//! 三个固定周期的后台线程主循环：
//!
//! - [`sensor_loop`]：采集 RGB/深度，组装帧集合并发布（30 ms）
//! - [`control_loop`]：推进状态机，发布反馈快照和状态消息（50 ms）
//! - [`telemetry_loop`]：读取反馈和状态，发布遥测快照（100 ms）
//!
//! 循环之间只通过覆盖式发布通信，任何循环都不会等待其他循环。

use crate::collaborator::{ArmActuator, SafetyGate, StateMachine, StateRequest, VisionSensor};
use crate::error::StationError;
use crate::frame::FrameSet;
use crate::mailbox::{Mailbox, Slot};
use crate::metrics::StationMetrics;
use crate::readout::{JointDisplayConfig, TelemetrySnapshot};
use crate::state::{FeedbackState, GripperAction, RobotContext, StatusMessage};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

/// Pipeline 配置
///
/// 各循环的目标周期和关闭时的线程 join 超时。
///
/// # Example
///
/// ```
/// use station_driver::PipelineConfig;
///
/// // 默认配置（30/50/100/50 ms）
/// let config = PipelineConfig::default();
/// assert_eq!(config.control_period_ms, 50);
///
/// // 自定义配置
/// let config = PipelineConfig {
///     sensor_period_ms: 15,
///     ..PipelineConfig::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// 采集周期（毫秒）
    pub sensor_period_ms: u64,
    /// 控制周期（毫秒）
    pub control_period_ms: u64,
    /// 遥测周期（毫秒）
    pub telemetry_period_ms: u64,
    /// 光标采样周期（毫秒，UI 线程）
    pub cursor_period_ms: u64,
    /// 关闭时每个线程的 join 超时（毫秒）
    pub join_timeout_ms: u64,
}

impl Default for PipelineConfig {
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

impl PipelineConfig {
    /// 校验配置（所有周期必须大于 0）
    pub fn validate(&self) -> Result<(), StationError> {
        let periods = [
            ("sensor_period_ms", self.sensor_period_ms),
            ("control_period_ms", self.control_period_ms),
            ("telemetry_period_ms", self.telemetry_period_ms),
            ("cursor_period_ms", self.cursor_period_ms),
        ];
        for (name, value) in periods {
            if value == 0 {
                return Err(StationError::Config(format!("{name} must be > 0")));
            }
        }
        Ok(())
    }

    pub fn sensor_period(&self) -> Duration {
        Duration::from_millis(self.sensor_period_ms)
    }

    pub fn control_period(&self) -> Duration {
        Duration::from_millis(self.control_period_ms)
    }

    pub fn telemetry_period(&self) -> Duration {
        Duration::from_millis(self.telemetry_period_ms)
    }

    pub fn cursor_period(&self) -> Duration {
        Duration::from_millis(self.cursor_period_ms)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }
}

/// 截止时间节拍器
///
/// 按固定周期推进截止时间；某个周期超时后从当前时刻重新对齐，不追赶。
pub struct Pacer {
    period: Duration,
    next_deadline: Instant,
}

impl Pacer {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next_deadline: Instant::now() + period,
        }
    }

    /// 休眠到下一个截止时间
    ///
    /// # 返回
    ///
    /// 本周期已经超过截止时间（不休眠）时返回 `true`
    pub fn wait(&mut self) -> bool {
        let now = Instant::now();
        if now > self.next_deadline {
            self.next_deadline = now + self.period;
            return true;
        }
        // 使用 spin_sleep 获得亚毫秒级精度
        spin_sleep::sleep(self.next_deadline - now);
        self.next_deadline += self.period;
        false
    }
}

/// 采集线程主循环
///
/// # 参数
/// - `vision`: 视觉协作者（线程独占）
/// - `frames`: 帧集合邮箱
/// - `config`: Pipeline 配置
/// - `is_running`: 运行标志（用于生命周期联动）
/// - `metrics`: 运行指标
/// - `fatal`: 致命错误诊断（停止工作站时写入）
pub fn sensor_loop(
    mut vision: impl VisionSensor,
    frames: Arc<Mailbox<FrameSet>>,
    config: PipelineConfig,
    is_running: Arc<AtomicBool>,
    metrics: Arc<StationMetrics>,
    fatal: Arc<Slot<String>>,
) {
    let mut pacer = Pacer::new(config.sensor_period());
    let mut cycle: u64 = 0;
    let mut seen_overwrites = frames.overwrites();

    loop {
        // Acquire: If we see false, we must see all cleanup writes from other threads
        if !is_running.load(Ordering::Acquire) {
            trace!("Sensor thread: is_running flag is false, exiting");
            break;
        }

        cycle += 1;
        match acquire_frame_set(&mut vision, cycle, &is_running) {
            Ok(Some(set)) => {
                publish_frame_set(&frames, set, &metrics, &mut seen_overwrites);
            },
            Ok(None) => {
                trace!("Sensor thread: shutdown observed mid-cycle");
                break;
            },
            Err(e) if e.is_fatal() => {
                error!("Sensor thread: {}", e);
                error!("Sensor thread: Fatal error detected, setting is_running = false");
                fatal.put(e.to_string());
                // Release: All writes before this are visible to threads that see the false value
                is_running.store(false, Ordering::Release);
                break;
            },
            Err(e) if e.is_transient() => {
                warn!("Sensor thread: cycle {} skipped: {}", cycle, e);
                metrics.capture_errors.fetch_add(1, Ordering::Relaxed);
            },
            Err(e) => {
                error!("Sensor thread: cycle {} failed: {}", cycle, e);
                metrics.capture_errors.fetch_add(1, Ordering::Relaxed);
            },
        }

        if pacer.wait() {
            metrics.cycle_overruns.fetch_add(1, Ordering::Relaxed);
        }
    }

    vision.release();
    info!("Sensor thread: vision device released");
    trace!("Sensor thread: loop exited");
}

/// 发布帧集合并累计覆盖计数
///
/// `seen_overwrites` 是上次观察到的邮箱覆盖总数，指标只累加增量，
/// 因此 [`StationMetrics::reset`] 之后计数从零重新开始。
fn publish_frame_set(
    frames: &Mailbox<FrameSet>,
    set: FrameSet,
    metrics: &StationMetrics,
    seen_overwrites: &mut u64,
) {
    frames.publish(set);
    metrics.sensor_cycles.fetch_add(1, Ordering::Relaxed);

    let overwrites = frames.overwrites();
    metrics
        .frames_overwritten
        .fetch_add(overwrites.saturating_sub(*seen_overwrites), Ordering::Relaxed);
    *seen_overwrites = overwrites;
}

/// 采集一个周期的帧集合
///
/// 每次硬件调用前检查运行标志；观察到关闭信号时返回 `Ok(None)`。
fn acquire_frame_set(
    vision: &mut impl VisionSensor,
    cycle: u64,
    is_running: &AtomicBool,
) -> Result<Option<FrameSet>, StationError> {
    vision.capture_video_frame()?;
    if !is_running.load(Ordering::Acquire) {
        return Ok(None);
    }
    vision.capture_depth_frame()?;

    let rgb = vision.convert_frame()?;
    let depth = vision.convert_depth_frame()?;
    let detect = vision.convert_detect_frame()?;
    let depth_raw = vision.current_depth_frame();

    FrameSet::new(cycle, rgb, depth, detect, depth_raw).map(Some)
}

/// 控制线程主循环
///
/// 每个周期：
/// 1. 取出待处理的状态切换请求（急停期间只放行 `Estop`）
/// 2. 急停期间向状态机转发 `Estop`
/// 3. 执行待处理的夹爪动作
/// 4. 通过 [`SafetyGate`] 推进状态机一次
/// 5. 吸收错误：安全故障置位急停，其余写入状态消息
/// 6. 急停期间驱动执行器进入安全状态
/// 7. 读取反馈，整体发布反馈快照和状态消息
///
/// 这是反馈快照的唯一写入方。
pub fn control_loop(
    mut arm: impl ArmActuator,
    mut machine: impl StateMachine,
    ctx: Arc<RobotContext>,
    config: PipelineConfig,
    is_running: Arc<AtomicBool>,
    metrics: Arc<StationMetrics>,
) {
    // 设置线程优先级（可选 feature）
    #[cfg(feature = "realtime")]
    {
        use thread_priority::*;

        match set_current_thread_priority(ThreadPriority::Max) {
            Ok(_) => {
                info!("Control thread priority set to MAX (realtime)");
            },
            Err(e) => {
                warn!(
                    "Failed to set control thread priority: {}. \
                    On Linux, you may need to run with CAP_SYS_NICE or use rtkit.",
                    e
                );
            },
        }
    }

    let mut pacer = Pacer::new(config.control_period());
    let mut cycle: u64 = 0;

    loop {
        // Acquire: If we see false, we must see all cleanup writes from other threads
        if !is_running.load(Ordering::Acquire) {
            trace!("Control thread: is_running flag is false, exiting");
            break;
        }

        cycle += 1;
        let fault = run_control_cycle(&mut arm, &mut machine, &ctx, &metrics);

        // 安全故障可能在本周期内置位，急停检查放在推进之后
        if ctx.estop.is_asserted() {
            metrics.estop_cycles.fetch_add(1, Ordering::Relaxed);
            if let Err(e) = arm.hold_safe() {
                warn!("Control thread: failed to hold safe state: {}", e);
                metrics.actuator_errors.fetch_add(1, Ordering::Relaxed);
            }
        }

        if let Err(e) = arm.refresh_feedback() {
            debug!("Control thread: feedback read failed: {}", e);
            metrics.actuator_errors.fetch_add(1, Ordering::Relaxed);
        }

        ctx.feedback.store(Arc::new(FeedbackState {
            control_cycle: cycle,
            joint_angles: arm.joint_angles_fb(),
            end_effector_pose: arm.wrist_pose(),
        }));
        ctx.status.store(Arc::new(StatusMessage {
            control_cycle: cycle,
            text: fault.unwrap_or_else(|| machine.status_message()),
        }));
        metrics.control_cycles.fetch_add(1, Ordering::Relaxed);

        if pacer.wait() {
            metrics.cycle_overruns.fetch_add(1, Ordering::Relaxed);
        }
    }

    match arm.shutdown() {
        Ok(()) => info!("Control thread: actuator shut down"),
        Err(e) => warn!("Control thread: actuator shutdown failed: {}", e),
    }
    trace!("Control thread: loop exited");
}

/// 执行控制周期的切换、夹爪与推进步骤
///
/// # 返回
///
/// 需要写入状态消息的错误文本（无错误时为 `None`）
fn run_control_cycle(
    arm: &mut impl ArmActuator,
    machine: &mut impl StateMachine,
    ctx: &RobotContext,
    metrics: &StationMetrics,
) -> Option<String> {
    if let Some(request) = ctx.transitions.take() {
        if ctx.estop.is_asserted() && request != StateRequest::Estop {
            warn!(
                "Control thread: dropping '{}' request while estop is asserted",
                request
            );
            metrics.rejected_transitions.fetch_add(1, Ordering::Relaxed);
        } else {
            debug!("Control thread: forwarding '{}' to state machine", request);
            machine.set_next_state(request);
        }
    }

    if ctx.estop.is_asserted() {
        machine.set_next_state(StateRequest::Estop);
    }

    let command = ctx.command.load_full();
    let mut gate = SafetyGate::new(arm, &ctx.estop);

    let mut fault = None;
    if let Some(action) = ctx.gripper.take() {
        let result = match action {
            GripperAction::Open => gate.open_gripper(),
            GripperAction::Close => gate.close_gripper(),
        };
        if let Err(e) = result {
            warn!("Control thread: gripper {:?} failed: {}", action, e);
            fault = absorb_error(e, ctx, metrics);
        }
    }

    if let Err(e) = machine.advance(&mut gate, &command) {
        fault = absorb_error(e, ctx, metrics).or(fault);
    }

    metrics
        .blocked_motion_commands
        .fetch_add(gate.blocked(), Ordering::Relaxed);
    fault
}

/// 吸收 `advance` / 夹爪错误
fn absorb_error(e: StationError, ctx: &RobotContext, metrics: &StationMetrics) -> Option<String> {
    match e {
        StationError::MotionBlocked => {
            trace!("Control thread: motion blocked by estop");
            None
        },
        e if e.is_safety_fault() => {
            if ctx.estop.assert_estop() {
                error!("Control thread: estop latched: {}", e);
            }
            Some(e.to_string())
        },
        e if e.is_transient() => {
            warn!("Control thread: {}", e);
            metrics.actuator_errors.fetch_add(1, Ordering::Relaxed);
            Some(e.to_string())
        },
        e => {
            info!("Control thread: state machine reported: {}", e);
            Some(e.to_string())
        },
    }
}

/// 遥测线程主循环
///
/// 纯读取方：每个周期读取一次状态消息和一个反馈快照，整体发布遥测快照。
pub fn telemetry_loop(
    ctx: Arc<RobotContext>,
    telemetry: Arc<Mailbox<TelemetrySnapshot>>,
    display: JointDisplayConfig,
    config: PipelineConfig,
    is_running: Arc<AtomicBool>,
    metrics: Arc<StationMetrics>,
) {
    let mut pacer = Pacer::new(config.telemetry_period());

    loop {
        // Acquire: If we see false, we must see all cleanup writes from other threads
        if !is_running.load(Ordering::Acquire) {
            trace!("Telemetry thread: is_running flag is false, exiting");
            break;
        }

        let status = ctx.status();
        let feedback = ctx.feedback();
        telemetry.publish(TelemetrySnapshot::from_parts(&status, &feedback, &display));
        metrics.telemetry_cycles.fetch_add(1, Ordering::Relaxed);

        if pacer.wait() {
            metrics.cycle_overruns.fetch_add(1, Ordering::Relaxed);
        }
    }

    trace!("Telemetry thread: loop exited");
}
