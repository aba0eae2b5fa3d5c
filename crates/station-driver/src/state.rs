//! 共享机器人状态
//!
//! [`RobotContext`] 汇总所有跨线程共享的记录，由编排层持有（`Arc`）：
//!
//! | 字段 | 写入方 | 读取方 | 机制 |
//! |------|--------|--------|------|
//! | `feedback` | 控制循环（唯一） | 遥测循环、显示 | `ArcSwap` 快照 |
//! | `command` | 操作员输入 | 控制循环 | `ArcSwap` 快照 |
//! | `status` | 控制循环 | 遥测循环 | `ArcSwap` 快照 |
//! | `transitions` | 操作员输入 | 控制循环 | 单槽 Latest-Wins |
//! | `gripper` | 操作员输入 | 控制循环 | 单槽 Latest-Wins |
//! | `estop` | 任意线程置位，操作员复位 | 控制循环 | 原子锁存 |

use crate::collaborator::StateRequest;
use crate::estop::EstopLatch;
use crate::mailbox::Slot;
use arc_swap::ArcSwap;
use smallvec::SmallVec;
use std::sync::Arc;

/// 关节向量（弧度），6 轴以内不分配堆内存
pub type JointVector = SmallVec<[f64; 6]>;

/// 机械臂反馈快照
///
/// 由控制循环在每个周期结束时整体发布一次，读取方看到的关节角度与末端位姿
/// 总是来自同一个控制周期。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedbackState {
    /// 产生此快照的控制周期（0 表示尚无反馈）
    pub control_cycle: u64,
    /// 关节角度反馈（弧度）
    pub joint_angles: JointVector,
    /// 末端位姿 `[x, y, z, phi]`
    pub end_effector_pose: [f64; 4],
}

/// 操作员指令（持久参数）
///
/// 写入时只更新目标值（`update_now = false` 语义），由状态机在下一个控制周期下发。
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorCommand {
    /// 修订号，每次写入递增
    pub revision: u64,
    /// 目标关节位置（弧度），空表示尚未设置
    pub joint_positions: JointVector,
    /// 各关节力矩上限（0.0 - 1.0），空表示尚未设置
    pub torque_limits: JointVector,
    /// 全局速度比例（0.0 - 1.0）
    pub speed_fraction: f64,
}

impl Default for OperatorCommand {
    fn default() -> Self {
        Self {
            revision: 0,
            joint_positions: JointVector::new(),
            torque_limits: JointVector::new(),
            speed_fraction: 0.25,
        }
    }
}

/// 夹爪动作（一次性，控制循环取走后执行）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GripperAction {
    Open,
    Close,
}

/// 状态消息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusMessage {
    /// 发布此消息的控制周期
    pub control_cycle: u64,
    /// 人类可读文本
    pub text: String,
}

/// 共享机器人状态上下文
pub struct RobotContext {
    /// 反馈快照（控制循环唯一写入）
    pub feedback: ArcSwap<FeedbackState>,
    /// 操作员指令
    pub command: ArcSwap<OperatorCommand>,
    /// 状态机状态消息
    pub status: ArcSwap<StatusMessage>,
    /// 急停锁存
    pub estop: EstopLatch,
    /// 待处理的状态切换请求
    pub transitions: Slot<StateRequest>,
    /// 待处理的夹爪动作
    pub gripper: Slot<GripperAction>,
}

impl RobotContext {
    pub fn new() -> Self {
        Self {
            feedback: ArcSwap::from_pointee(FeedbackState::default()),
            command: ArcSwap::from_pointee(OperatorCommand::default()),
            status: ArcSwap::from_pointee(StatusMessage::default()),
            estop: EstopLatch::new(),
            transitions: Slot::new(),
            gripper: Slot::new(),
        }
    }

    /// 最新反馈快照
    pub fn feedback(&self) -> Arc<FeedbackState> {
        self.feedback.load_full()
    }

    /// 当前操作员指令
    pub fn command(&self) -> Arc<OperatorCommand> {
        self.command.load_full()
    }

    /// 最新状态消息
    pub fn status(&self) -> Arc<StatusMessage> {
        self.status.load_full()
    }

    /// 修改操作员指令
    ///
    /// 基于当前快照生成新快照并整体替换，修订号自动递增。返回新修订号。
    pub fn update_command(&self, f: impl Fn(&mut OperatorCommand)) -> u64 {
        let previous = self.command.rcu(|current| {
            let mut next = OperatorCommand::clone(current);
            f(&mut next);
            next.revision = current.revision + 1;
            next
        });
        previous.revision + 1
    }
}

impl Default for RobotContext {
    fn default() -> Self {
        Self::new()
    }
}
