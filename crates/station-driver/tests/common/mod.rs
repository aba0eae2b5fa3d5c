//! 集成测试共用的 Mock 协作者

#![allow(dead_code)]

use station_driver::{
    ArmActuator, DepthFrame, Image, JointVector, OperatorCommand, PipelineConfig, PixelFormat,
    StateMachine, StateRequest, StationError, VisionSensor,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

pub const WIDTH: u32 = 8;
pub const HEIGHT: u32 = 6;

/// 快速配置（1-2 ms 周期）
pub fn fast_config() -> PipelineConfig {
    PipelineConfig {
        sensor_period_ms: 1,
        control_period_ms: 2,
        telemetry_period_ms: 2,
        cursor_period_ms: 1,
        join_timeout_ms: 2000,
    }
}

/// 轮询等待条件成立
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    cond()
}

/// 把采集计数写入每个图像的每个字节，深度采样写入同一计数
///
/// 如果消费者看到不同周期混合的帧集合，标记会不一致。
pub struct TaggedVision {
    pub tag: u8,
    pub hardware_calls: Arc<AtomicU64>,
    pub released: Arc<AtomicBool>,
    /// 为 true 时生成空图像（致命）
    pub malformed: Arc<AtomicBool>,
}

impl TaggedVision {
    pub fn new() -> Self {
        Self {
            tag: 0,
            hardware_calls: Arc::new(AtomicU64::new(0)),
            released: Arc::new(AtomicBool::new(false)),
            malformed: Arc::new(AtomicBool::new(false)),
        }
    }

    fn image(&self, format: PixelFormat) -> Image {
        if self.malformed.load(Ordering::SeqCst) {
            return Image::new(WIDTH, HEIGHT, format, Vec::<u8>::new());
        }
        let len = (WIDTH * HEIGHT) as usize * format.bytes_per_pixel();
        Image::new(WIDTH, HEIGHT, format, vec![self.tag; len])
    }
}

impl VisionSensor for TaggedVision {
    fn capture_video_frame(&mut self) -> Result<(), StationError> {
        self.hardware_calls.fetch_add(1, Ordering::SeqCst);
        self.tag = self.tag.wrapping_add(1).max(1);
        Ok(())
    }

    fn capture_depth_frame(&mut self) -> Result<(), StationError> {
        self.hardware_calls.fetch_add(1, Ordering::SeqCst);
        // 让转换和采集交错，放大混帧窗口
        std::thread::yield_now();
        Ok(())
    }

    fn convert_frame(&mut self) -> Result<Image, StationError> {
        Ok(self.image(PixelFormat::Rgb8))
    }

    fn convert_depth_frame(&mut self) -> Result<Image, StationError> {
        Ok(self.image(PixelFormat::Gray8))
    }

    fn convert_detect_frame(&mut self) -> Result<Image, StationError> {
        Ok(self.image(PixelFormat::Rgba8))
    }

    fn current_depth_frame(&self) -> DepthFrame {
        let samples = vec![u16::from(self.tag); (WIDTH * HEIGHT) as usize];
        DepthFrame::new(WIDTH, HEIGHT, samples).unwrap_or_else(|_| DepthFrame::zeros(WIDTH, HEIGHT))
    }

    fn release(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

/// 共享计数器，测试线程在执行器被移入控制线程后仍可观察
#[derive(Clone, Default)]
pub struct ArmProbe {
    pub refreshes: Arc<AtomicU64>,
    pub motion_calls: Arc<AtomicU64>,
    pub safe_holds: Arc<AtomicU64>,
    pub hardware_calls: Arc<AtomicU64>,
    pub shut_down: Arc<AtomicBool>,
}

/// 反馈值 = 已读取次数：每个关节和末端位姿的每个分量都相同
pub struct ProbeArm {
    pub probe: ArmProbe,
    reading: f64,
}

impl ProbeArm {
    pub fn new(probe: ArmProbe) -> Self {
        Self {
            probe,
            reading: 0.0,
        }
    }

    fn io(&self) {
        self.probe.hardware_calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl ArmActuator for ProbeArm {
    fn num_joints(&self) -> usize {
        4
    }

    fn joint_angles_fb(&self) -> JointVector {
        JointVector::from_slice(&[self.reading; 4])
    }

    fn wrist_pose(&self) -> [f64; 4] {
        [self.reading; 4]
    }

    fn refresh_feedback(&mut self) -> Result<(), StationError> {
        self.io();
        let n = self.probe.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
        self.reading = n as f64;
        Ok(())
    }

    fn set_positions(&mut self, _positions: &[f64], _update_now: bool) -> Result<(), StationError> {
        self.io();
        self.probe.motion_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn set_speeds_normalized_global(&mut self, _: f64, _: bool) -> Result<(), StationError> {
        self.io();
        Ok(())
    }

    fn set_torque_limits(&mut self, _: &[f64], _: bool) -> Result<(), StationError> {
        self.io();
        Ok(())
    }

    fn send_commands(&mut self) -> Result<(), StationError> {
        self.io();
        self.probe.motion_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn open_gripper(&mut self) -> Result<(), StationError> {
        self.io();
        self.probe.motion_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close_gripper(&mut self) -> Result<(), StationError> {
        self.io();
        self.probe.motion_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn hold_safe(&mut self) -> Result<(), StationError> {
        self.io();
        self.probe.safe_holds.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), StationError> {
        self.probe.shut_down.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// 每个周期都尝试运动的状态机
///
/// `fault_once` 被置位后下一次推进返回急停故障。
pub struct EagerMachine {
    pub state: StateRequest,
    pub fault_once: Arc<AtomicBool>,
}

impl EagerMachine {
    pub fn new() -> Self {
        Self {
            state: StateRequest::Idle,
            fault_once: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl StateMachine for EagerMachine {
    fn set_next_state(&mut self, request: StateRequest) {
        self.state = request;
    }

    fn advance(
        &mut self,
        arm: &mut dyn ArmActuator,
        command: &OperatorCommand,
    ) -> Result<(), StationError> {
        if self.fault_once.swap(false, Ordering::SeqCst) {
            return Err(StationError::EstopTriggered("motor 3 over-temperature".into()));
        }
        arm.set_positions(&command.joint_positions, false)?;
        arm.send_commands()
    }

    fn status_message(&self) -> String {
        format!("State: {}", self.state)
    }
}
