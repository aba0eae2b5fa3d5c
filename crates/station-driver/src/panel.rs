//! 操作面板
//!
//! UI 线程使用的句柄。所有方法都只写入邮箱或锁存后立即返回，
//! 实际的执行器调用由控制循环在下一个周期完成。

use crate::collaborator::StateRequest;
use crate::error::StationError;
use crate::metrics::StationMetrics;
use crate::state::{GripperAction, JointVector, RobotContext};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{info, warn};

/// 滑块输入（显示单位）
#[derive(Debug, Clone, PartialEq)]
pub struct SliderInput {
    /// 各关节目标角度（度）
    pub joint_deg: JointVector,
    /// 力矩百分比（0 - 100，所有关节相同）
    pub torque_pct: f64,
    /// 速度百分比（0 - 100）
    pub speed_pct: f64,
}

/// 操作面板句柄（可克隆）
#[derive(Clone)]
pub struct OperatorPanel {
    ctx: Arc<RobotContext>,
    metrics: Arc<StationMetrics>,
}

impl OperatorPanel {
    pub fn new(ctx: Arc<RobotContext>, metrics: Arc<StationMetrics>) -> Self {
        Self { ctx, metrics }
    }

    /// 请求状态切换（覆盖未处理的上一个请求）
    ///
    /// # 错误
    ///
    /// 急停锁存期间返回 `MotionBlocked`，请求被丢弃。
    pub fn request_state(&self, request: StateRequest) -> Result<(), StationError> {
        if self.ctx.estop.is_asserted() && request != StateRequest::Estop {
            warn!("Rejecting '{}' request: estop is asserted", request);
            self.metrics.rejected_transitions.fetch_add(1, Ordering::Relaxed);
            return Err(StationError::MotionBlocked);
        }
        self.ctx.transitions.put(request);
        Ok(())
    }

    /// 急停
    ///
    /// 置位锁存并请求 `Estop`。返回本次调用是否完成了锁存。
    pub fn estop(&self) -> bool {
        let tripped = self.ctx.estop.assert_estop();
        if tripped {
            warn!("Emergency stop asserted by operator");
        }
        self.ctx.transitions.put(StateRequest::Estop);
        tripped
    }

    /// 复位急停并请求 `Idle`
    ///
    /// 未处于急停时返回 `false`，不产生任何请求。
    pub fn reset_estop(&self) -> bool {
        if !self.ctx.estop.reset() {
            return false;
        }
        info!("Emergency stop reset by operator");
        self.ctx.transitions.put(StateRequest::Idle);
        true
    }

    pub fn is_estopped(&self) -> bool {
        self.ctx.estop.is_asserted()
    }

    /// 直接控制开关：开启 → `Manual`，关闭 → `Idle`
    pub fn set_direct_control(&self, enabled: bool) -> Result<(), StationError> {
        let request = if enabled {
            StateRequest::Manual
        } else {
            StateRequest::Idle
        };
        self.request_state(request)
    }

    /// 滑块变化：换算为弧度/比例后写入操作员指令
    ///
    /// 只更新目标值，由控制循环在下一个周期下发。返回新的指令修订号。
    pub fn move_sliders(&self, input: &SliderInput) -> u64 {
        let positions: JointVector = input.joint_deg.iter().map(|deg| deg.to_radians()).collect();
        let torque = (input.torque_pct / 100.0).clamp(0.0, 1.0);
        let speed = (input.speed_pct / 100.0).clamp(0.0, 1.0);
        let joints = positions.len();

        self.ctx.update_command(|cmd| {
            cmd.joint_positions = positions.clone();
            cmd.torque_limits = std::iter::repeat_n(torque, joints).collect();
            cmd.speed_fraction = speed;
        })
    }

    /// 张开夹爪（由控制循环执行）
    pub fn open_gripper(&self) {
        self.ctx.gripper.put(GripperAction::Open);
    }

    /// 闭合夹爪（由控制循环执行）
    pub fn close_gripper(&self) {
        self.ctx.gripper.put(GripperAction::Close);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    fn panel() -> (OperatorPanel, Arc<RobotContext>) {
        let ctx = Arc::new(RobotContext::new());
        (
            OperatorPanel::new(ctx.clone(), Arc::new(StationMetrics::new())),
            ctx,
        )
    }

    #[test]
    fn test_request_state_latest_wins() {
        let (panel, ctx) = panel();
        panel.request_state(StateRequest::Calibrate).unwrap();
        panel.request_state(StateRequest::Execute).unwrap();
        assert_eq!(ctx.transitions.take(), Some(StateRequest::Execute));
    }

    #[test]
    fn test_estop_rejects_requests_until_reset() {
        let (panel, ctx) = panel();
        assert!(panel.estop());
        assert!(!panel.estop());
        assert_eq!(ctx.transitions.take(), Some(StateRequest::Estop));

        assert!(matches!(
            panel.request_state(StateRequest::Execute),
            Err(StationError::MotionBlocked)
        ));
        assert!(panel.set_direct_control(false).is_err());
        assert!(!ctx.transitions.is_pending());

        assert!(panel.reset_estop());
        assert!(!panel.is_estopped());
        assert_eq!(ctx.transitions.take(), Some(StateRequest::Idle));
        panel.request_state(StateRequest::Execute).unwrap();
    }

    #[test]
    fn test_reset_without_estop_is_noop() {
        let (panel, ctx) = panel();
        assert!(!panel.reset_estop());
        assert!(!ctx.transitions.is_pending());
    }

    #[test]
    fn test_direct_control_maps_to_manual_and_idle() {
        let (panel, ctx) = panel();
        panel.set_direct_control(true).unwrap();
        assert_eq!(ctx.transitions.take(), Some(StateRequest::Manual));
        panel.set_direct_control(false).unwrap();
        assert_eq!(ctx.transitions.take(), Some(StateRequest::Idle));
    }

    #[test]
    fn test_sliders_convert_units() {
        let (panel, ctx) = panel();
        let revision = panel.move_sliders(&SliderInput {
            joint_deg: smallvec![0.0, 90.0, -180.0, 45.0],
            torque_pct: 50.0,
            speed_pct: 150.0,
        });
        assert_eq!(revision, 1);

        let cmd = ctx.command();
        assert!((cmd.joint_positions[1] - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert!((cmd.joint_positions[2] + std::f64::consts::PI).abs() < 1e-12);
        assert_eq!(cmd.torque_limits.as_slice(), &[0.5; 4]);
        assert_eq!(cmd.speed_fraction, 1.0);
    }

    #[test]
    fn test_gripper_latest_wins() {
        let (panel, ctx) = panel();
        panel.open_gripper();
        panel.close_gripper();
        assert_eq!(ctx.gripper.take(), Some(GripperAction::Close));
        assert_eq!(ctx.gripper.take(), None);
    }
}
