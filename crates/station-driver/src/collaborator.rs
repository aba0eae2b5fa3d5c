//! 外部协作者接口
//!
//! 编排层只依赖以下三个 trait，具体实现（相机驱动、电机总线、状态机/轨迹规划）
//! 都在本 crate 之外：
//!
//! - [`VisionSensor`]：RGB/深度采集与可渲染图像转换
//! - [`ArmActuator`]：机械臂反馈读取与指令下发
//! - [`StateMachine`]：每个控制周期推进一次的任务状态机
//!
//! 协作者在构建时被移动到各自的线程中，只能通过句柄访问共享记录，
//! 从不持有共享记录本身。

use crate::error::StationError;
use crate::estop::EstopLatch;
use crate::frame::{DepthFrame, Image};
use crate::state::{JointVector, OperatorCommand};
use std::fmt;
use std::str::FromStr;

/// 视觉协作者
///
/// 由采集线程独占。`capture_*` 填充内部缓冲区，`convert_*` 从缓冲区生成可渲染图像。
pub trait VisionSensor: Send {
    /// 采集一帧 RGB
    fn capture_video_frame(&mut self) -> Result<(), StationError>;

    /// 采集一帧深度
    fn capture_depth_frame(&mut self) -> Result<(), StationError>;

    /// 生成 RGB 图像
    fn convert_frame(&mut self) -> Result<Image, StationError>;

    /// 生成深度可视化图像
    fn convert_depth_frame(&mut self) -> Result<Image, StationError>;

    /// 生成检测叠加图像
    fn convert_detect_frame(&mut self) -> Result<Image, StationError>;

    /// 最近一次采集的原始深度网格
    fn current_depth_frame(&self) -> DepthFrame;

    /// 释放设备（采集线程退出时调用一次）
    fn release(&mut self) {}
}

/// 机械臂反馈/执行协作者
///
/// `update_now = false` 表示只更新内部目标值，硬件写入推迟到下一次
/// [`send_commands`](ArmActuator::send_commands)。
pub trait ArmActuator: Send {
    /// 关节数量
    fn num_joints(&self) -> usize;

    /// 最近一次读取的关节角度反馈（弧度）
    fn joint_angles_fb(&self) -> JointVector;

    /// 末端位姿 `[x, y, z, phi]`
    fn wrist_pose(&self) -> [f64; 4];

    /// 从总线读取最新反馈
    fn refresh_feedback(&mut self) -> Result<(), StationError>;

    /// 设置关节目标位置（弧度）
    fn set_positions(&mut self, positions: &[f64], update_now: bool) -> Result<(), StationError>;

    /// 设置全局归一化速度（0.0 - 1.0）
    fn set_speeds_normalized_global(
        &mut self,
        fraction: f64,
        update_now: bool,
    ) -> Result<(), StationError>;

    /// 设置各关节力矩上限（0.0 - 1.0）
    fn set_torque_limits(&mut self, limits: &[f64], update_now: bool) -> Result<(), StationError>;

    /// 下发所有延迟写入
    fn send_commands(&mut self) -> Result<(), StationError>;

    /// 张开夹爪
    fn open_gripper(&mut self) -> Result<(), StationError>;

    /// 闭合夹爪
    fn close_gripper(&mut self) -> Result<(), StationError>;

    /// 进入安全/空闲状态（不产生运动）
    fn hold_safe(&mut self) -> Result<(), StationError>;

    /// 关闭设备（控制线程退出时调用一次）
    fn shutdown(&mut self) -> Result<(), StationError>;
}

/// 任务状态机协作者
pub trait StateMachine: Send {
    /// 请求状态切换，在下一次 `advance()` 之前或期间生效
    fn set_next_state(&mut self, request: StateRequest);

    /// 推进一个周期
    ///
    /// 可以读取操作员指令并通过 `arm` 下发运动。返回的错误由控制循环吸收：
    /// `EstopTriggered` 置位急停锁存，其余错误写入状态消息。
    fn advance(
        &mut self,
        arm: &mut dyn ArmActuator,
        command: &OperatorCommand,
    ) -> Result<(), StationError>;

    /// 当前状态消息
    fn status_message(&self) -> String;
}

impl<T: VisionSensor + ?Sized> VisionSensor for Box<T> {
    fn capture_video_frame(&mut self) -> Result<(), StationError> {
        (**self).capture_video_frame()
    }

    fn capture_depth_frame(&mut self) -> Result<(), StationError> {
        (**self).capture_depth_frame()
    }

    fn convert_frame(&mut self) -> Result<Image, StationError> {
        (**self).convert_frame()
    }

    fn convert_depth_frame(&mut self) -> Result<Image, StationError> {
        (**self).convert_depth_frame()
    }

    fn convert_detect_frame(&mut self) -> Result<Image, StationError> {
        (**self).convert_detect_frame()
    }

    fn current_depth_frame(&self) -> DepthFrame {
        (**self).current_depth_frame()
    }

    fn release(&mut self) {
        (**self).release()
    }
}

impl<T: ArmActuator + ?Sized> ArmActuator for Box<T> {
    fn num_joints(&self) -> usize {
        (**self).num_joints()
    }

    fn joint_angles_fb(&self) -> JointVector {
        (**self).joint_angles_fb()
    }

    fn wrist_pose(&self) -> [f64; 4] {
        (**self).wrist_pose()
    }

    fn refresh_feedback(&mut self) -> Result<(), StationError> {
        (**self).refresh_feedback()
    }

    fn set_positions(&mut self, positions: &[f64], update_now: bool) -> Result<(), StationError> {
        (**self).set_positions(positions, update_now)
    }

    fn set_speeds_normalized_global(
        &mut self,
        fraction: f64,
        update_now: bool,
    ) -> Result<(), StationError> {
        (**self).set_speeds_normalized_global(fraction, update_now)
    }

    fn set_torque_limits(&mut self, limits: &[f64], update_now: bool) -> Result<(), StationError> {
        (**self).set_torque_limits(limits, update_now)
    }

    fn send_commands(&mut self) -> Result<(), StationError> {
        (**self).send_commands()
    }

    fn open_gripper(&mut self) -> Result<(), StationError> {
        (**self).open_gripper()
    }

    fn close_gripper(&mut self) -> Result<(), StationError> {
        (**self).close_gripper()
    }

    fn hold_safe(&mut self) -> Result<(), StationError> {
        (**self).hold_safe()
    }

    fn shutdown(&mut self) -> Result<(), StationError> {
        (**self).shutdown()
    }
}

impl<T: StateMachine + ?Sized> StateMachine for Box<T> {
    fn set_next_state(&mut self, request: StateRequest) {
        (**self).set_next_state(request)
    }

    fn advance(
        &mut self,
        arm: &mut dyn ArmActuator,
        command: &OperatorCommand,
    ) -> Result<(), StationError> {
        (**self).advance(arm, command)
    }

    fn status_message(&self) -> String {
        (**self).status_message()
    }
}

/// 任务例程
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskRoutine {
    Mirror,
    Stack3,
    LineEmUp,
    StackEmHigh,
    Pyramid5,
}

/// 状态切换请求
///
/// 名称与操作面板按钮一一对应，见 [`StateRequest::name`]。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateRequest {
    Idle,
    Estop,
    Calibrate,
    Execute,
    Manual,
    AddWaypoint,
    ClearWaypoints,
    ClickAndPick,
    SaveCalibration,
    LoadCalibration,
    RecordBlockPosition,
    Task(TaskRoutine),
}

impl StateRequest {
    /// 请求名称
    pub fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Estop => "estop",
            Self::Calibrate => "calibrate",
            Self::Execute => "execute",
            Self::Manual => "manual",
            Self::AddWaypoint => "add_wp",
            Self::ClearWaypoints => "clear_wp",
            Self::ClickAndPick => "click_and_pick",
            Self::SaveCalibration => "save_calibration_points",
            Self::LoadCalibration => "load_previous_calibration",
            Self::RecordBlockPosition => "record_block_position",
            Self::Task(TaskRoutine::Mirror) => "mirror",
            Self::Task(TaskRoutine::Stack3) => "stack_3",
            Self::Task(TaskRoutine::LineEmUp) => "line_em_up",
            Self::Task(TaskRoutine::StackEmHigh) => "stack_em_high",
            Self::Task(TaskRoutine::Pyramid5) => "pyramid5",
        }
    }

    /// 是否可能产生运动（急停期间一律拒绝）
    pub fn is_motion(self) -> bool {
        matches!(
            self,
            Self::Execute | Self::Manual | Self::ClickAndPick | Self::Task(_)
        )
    }
}

impl fmt::Display for StateRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StateRequest {
    type Err = StationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let request = match s {
            "idle" => Self::Idle,
            "estop" => Self::Estop,
            "calibrate" => Self::Calibrate,
            "execute" => Self::Execute,
            "manual" => Self::Manual,
            "add_wp" => Self::AddWaypoint,
            "clear_wp" => Self::ClearWaypoints,
            "click_and_pick" => Self::ClickAndPick,
            "save_calibration_points" => Self::SaveCalibration,
            "load_previous_calibration" => Self::LoadCalibration,
            "record_block_position" => Self::RecordBlockPosition,
            "mirror" => Self::Task(TaskRoutine::Mirror),
            "stack_3" => Self::Task(TaskRoutine::Stack3),
            "line_em_up" => Self::Task(TaskRoutine::LineEmUp),
            "stack_em_high" => Self::Task(TaskRoutine::StackEmHigh),
            "pyramid5" => Self::Task(TaskRoutine::Pyramid5),
            other => {
                return Err(StationError::Config(format!("unknown state '{other}'")));
            },
        };
        Ok(request)
    }
}

/// 安全闸门
///
/// 包装真实执行器交给状态机。急停锁存期间拒绝一切运动类调用
/// （位置、下发、夹爪），只放行读取、限幅配置和安全保持。
pub struct SafetyGate<'a> {
    inner: &'a mut dyn ArmActuator,
    latch: &'a EstopLatch,
    blocked: u64,
}

impl<'a> SafetyGate<'a> {
    pub fn new(inner: &'a mut dyn ArmActuator, latch: &'a EstopLatch) -> Self {
        Self {
            inner,
            latch,
            blocked: 0,
        }
    }

    /// 本闸门拦截的运动指令数量
    pub fn blocked(&self) -> u64 {
        self.blocked
    }

    fn guard_motion(&mut self) -> Result<(), StationError> {
        if self.latch.is_asserted() {
            self.blocked += 1;
            return Err(StationError::MotionBlocked);
        }
        Ok(())
    }
}

impl ArmActuator for SafetyGate<'_> {
    fn num_joints(&self) -> usize {
        self.inner.num_joints()
    }

    fn joint_angles_fb(&self) -> JointVector {
        self.inner.joint_angles_fb()
    }

    fn wrist_pose(&self) -> [f64; 4] {
        self.inner.wrist_pose()
    }

    fn refresh_feedback(&mut self) -> Result<(), StationError> {
        self.inner.refresh_feedback()
    }

    fn set_positions(&mut self, positions: &[f64], update_now: bool) -> Result<(), StationError> {
        self.guard_motion()?;
        self.inner.set_positions(positions, update_now)
    }

    fn set_speeds_normalized_global(
        &mut self,
        fraction: f64,
        update_now: bool,
    ) -> Result<(), StationError> {
        self.inner.set_speeds_normalized_global(fraction, update_now)
    }

    fn set_torque_limits(&mut self, limits: &[f64], update_now: bool) -> Result<(), StationError> {
        self.inner.set_torque_limits(limits, update_now)
    }

    fn send_commands(&mut self) -> Result<(), StationError> {
        self.guard_motion()?;
        self.inner.send_commands()
    }

    fn open_gripper(&mut self) -> Result<(), StationError> {
        self.guard_motion()?;
        self.inner.open_gripper()
    }

    fn close_gripper(&mut self) -> Result<(), StationError> {
        self.guard_motion()?;
        self.inner.close_gripper()
    }

    fn hold_safe(&mut self) -> Result<(), StationError> {
        self.inner.hold_safe()
    }

    fn shutdown(&mut self) -> Result<(), StationError> {
        self.inner.shutdown()
    }
}
