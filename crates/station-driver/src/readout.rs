//! 遥测读数与显示格式化
//!
//! 弧度 → 角度换算和关节偏移只在发布时应用，共享状态中始终保存原始弧度。

use crate::state::{FeedbackState, JointVector, StatusMessage};
use smallvec::smallvec;

/// 关节显示配置
#[derive(Debug, Clone, PartialEq)]
pub struct JointDisplayConfig {
    /// 各关节显示偏移（度），缺省的关节偏移为 0
    pub offsets_deg: JointVector,
}

impl Default for JointDisplayConfig {
    /// 肩关节（第 2 轴）+90°
    fn default() -> Self {
        Self {
            offsets_deg: smallvec![0.0, 90.0, 0.0, 0.0],
        }
    }
}

impl JointDisplayConfig {
    /// 弧度 → 显示角度
    pub fn to_display_degrees(&self, joint_angles: &[f64]) -> JointVector {
        joint_angles
            .iter()
            .enumerate()
            .map(|(i, rad)| rad.to_degrees() + self.offsets_deg.get(i).copied().unwrap_or(0.0))
            .collect()
    }
}

/// 遥测快照（一次发布）
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySnapshot {
    pub status: String,
    /// 关节读数（度，已含偏移）
    pub joints_deg: JointVector,
    /// 末端读数 `[x, y, z, phi]`
    pub end_effector: [f64; 4],
    /// 反馈来源的控制周期
    pub control_cycle: u64,
}

impl TelemetrySnapshot {
    pub fn from_parts(
        status: &StatusMessage,
        feedback: &FeedbackState,
        display: &JointDisplayConfig,
    ) -> Self {
        Self {
            status: status.text.clone(),
            joints_deg: display.to_display_degrees(&feedback.joint_angles),
            end_effector: feedback.end_effector_pose,
            control_cycle: feedback.control_cycle,
        }
    }

    /// 关节读数文本
    pub fn joint_texts(&self) -> Vec<String> {
        self.joints_deg.iter().map(|v| format_signed(*v)).collect()
    }

    /// 末端读数文本
    pub fn end_effector_texts(&self) -> [String; 4] {
        self.end_effector.map(format_signed)
    }
}

/// 带符号两位小数，如 `+90.00` / `-0.50`
pub fn format_signed(value: f64) -> String {
    format!("{value:+.2}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_shoulder_offset_applied_at_publication() {
        let feedback = FeedbackState {
            control_cycle: 12,
            joint_angles: smallvec![0.0, 0.0, FRAC_PI_2, -FRAC_PI_2],
            end_effector_pose: [100.0, -25.5, 40.0, 1.5],
        };
        let status = StatusMessage {
            control_cycle: 12,
            text: "State: Idle".to_string(),
        };
        let snapshot =
            TelemetrySnapshot::from_parts(&status, &feedback, &JointDisplayConfig::default());

        assert_eq!(snapshot.joint_texts(), ["+0.00", "+90.00", "+90.00", "-90.00"]);
        assert_eq!(
            snapshot.end_effector_texts(),
            ["+100.00", "-25.50", "+40.00", "+1.50"]
        );
        assert_eq!(snapshot.status, "State: Idle");
        assert_eq!(snapshot.control_cycle, 12);
        // 共享状态中仍然是原始弧度
        assert_eq!(feedback.joint_angles[1], 0.0);
    }

    #[test]
    fn test_extra_joints_have_no_offset() {
        let display = JointDisplayConfig::default();
        let degrees = display.to_display_degrees(&[0.0; 6]);
        assert_eq!(degrees.as_slice(), &[0.0, 90.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_format_signed() {
        assert_eq!(format_signed(1.23456), "+1.23");
        assert_eq!(format_signed(-2.5), "-2.50");
        assert_eq!(format_signed(0.0), "+0.00");
    }
}
