//! # 终端显示界面
//!
//! 唯一的消费者：只读已发布的快照，不直接修改共享状态。
//! 操作员输入通过 [`OperatorPanel`] 和光标采样器转发。

use station_driver::{
    CursorProvider, CursorTimer, FrameSet, ImageRegion, MailboxReader, OperatorPanel,
    ScreenPoint, SliderInput, StateRequest, TaskRoutine, TelemetrySnapshot, VideoChannel,
};
use std::collections::VecDeque;
use std::f64::consts::{FRAC_PI_4, PI};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// 事件循环最长休眠时间
const MAX_IDLE: Duration = Duration::from_millis(10);

/// 操作员动作
#[derive(Debug, Clone, PartialEq)]
pub enum OperatorAction {
    Request(StateRequest),
    Click(ScreenPoint),
    Sliders(SliderInput),
    DirectControl(bool),
    Estop,
    ResetEstop,
    OpenGripper,
    CloseGripper,
}

/// 按时间脚本回放的操作员
pub struct ScriptedOperator {
    start: Instant,
    steps: VecDeque<(Duration, OperatorAction)>,
}

impl ScriptedOperator {
    pub fn new(start: Instant, mut steps: Vec<(Duration, OperatorAction)>) -> Self {
        steps.sort_by_key(|(at, _)| *at);
        Self {
            start,
            steps: steps.into(),
        }
    }

    /// 演示脚本：标定 → 保存 → 记录方块 → 手动示教 → 执行 → 急停/复位 → 点击抓取 → 任务 → 重新加载标定
    ///
    /// 标定点击沿图像内椭圆分布（左上、右上、右下、左下……），与默认世界坐标顺序一致。
    pub fn demo(start: Instant, region: &ImageRegion, calibration_clicks: usize) -> Self {
        let at = |secs: f64| Duration::from_secs_f64(secs);
        let screen = |px: f64, py: f64| {
            ScreenPoint::new(region.origin_x + px as i32, region.origin_y + py as i32)
        };
        let (w, h) = (f64::from(region.width), f64::from(region.height));

        let mut steps = vec![(at(0.5), OperatorAction::Request(StateRequest::Calibrate))];

        let n = calibration_clicks.max(1);
        for i in 0..n {
            let angle = PI + FRAC_PI_4 + 2.0 * PI * i as f64 / n as f64;
            let point = screen(w / 2.0 + 0.35 * w * angle.cos(), h / 2.0 + 0.35 * h * angle.sin());
            steps.push((at(1.0 + 0.3 * i as f64), OperatorAction::Click(point)));
        }

        let t = 1.5 + 0.3 * n as f64;
        let sliders = |joint_deg: [f64; 4], torque_pct, speed_pct| {
            OperatorAction::Sliders(SliderInput {
                joint_deg: joint_deg.iter().copied().collect(),
                torque_pct,
                speed_pct,
            })
        };

        steps.extend([
            (at(t), OperatorAction::Request(StateRequest::SaveCalibration)),
            (at(t + 0.4), OperatorAction::Click(screen(w * 0.6, h * 0.5))),
            (at(t + 0.5), OperatorAction::Request(StateRequest::RecordBlockPosition)),
            (at(t + 1.0), OperatorAction::DirectControl(true)),
            (at(t + 1.1), sliders([10.0, -20.0, 30.0, 0.0], 50.0, 40.0)),
            (at(t + 2.0), OperatorAction::Request(StateRequest::AddWaypoint)),
            (at(t + 2.2), sliders([-20.0, 10.0, 40.0, -10.0], 50.0, 40.0)),
            (at(t + 3.2), OperatorAction::Request(StateRequest::AddWaypoint)),
            (at(t + 3.4), OperatorAction::DirectControl(false)),
            (at(t + 3.6), OperatorAction::Request(StateRequest::Execute)),
            (at(t + 5.5), OperatorAction::Estop),
            // 急停期间的请求被拒绝
            (at(t + 5.8), OperatorAction::Request(StateRequest::Execute)),
            (at(t + 5.9), OperatorAction::OpenGripper),
            (at(t + 6.5), OperatorAction::ResetEstop),
            (at(t + 7.0), OperatorAction::Request(StateRequest::ClickAndPick)),
            (at(t + 7.3), OperatorAction::Click(screen(w * 0.4, h * 0.6))),
            (at(t + 9.0), OperatorAction::Request(StateRequest::Task(TaskRoutine::Stack3))),
            (at(t + 12.0), OperatorAction::CloseGripper),
            (at(t + 12.5), OperatorAction::Request(StateRequest::LoadCalibration)),
            (at(t + 13.0), OperatorAction::Request(StateRequest::Idle)),
        ]);

        Self::new(start, steps)
    }

    /// 取出所有已到期的动作
    pub fn due(&mut self, now: Instant) -> Vec<OperatorAction> {
        let elapsed = now.saturating_duration_since(self.start);
        let mut actions = Vec::new();
        while let Some((at, _)) = self.steps.front() {
            if *at > elapsed {
                break;
            }
            if let Some((_, action)) = self.steps.pop_front() {
                actions.push(action);
            }
        }
        actions
    }

    pub fn remaining(&self) -> usize {
        self.steps.len()
    }
}

/// 脚本化光标：在图像区域内外做李萨如运动，偶尔离开窗口
pub fn scripted_cursor(region: ImageRegion, start: Instant) -> impl Fn() -> Option<ScreenPoint> {
    move || {
        let t = start.elapsed().as_secs_f64();
        if (0.3 * t).sin() > 0.95 {
            return None;
        }
        let (w, h) = (f64::from(region.width), f64::from(region.height));
        let x = f64::from(region.origin_x) + w / 2.0 + 0.6 * w * (0.7 * t).sin();
        let y = f64::from(region.origin_y) + h / 2.0 + 0.6 * h * (1.1 * t).cos();
        Some(ScreenPoint::new(x as i32, y as i32))
    }
}

/// 显示统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayStats {
    pub frames_shown: u64,
    /// 显示端错过的帧（被采集线程覆盖）
    pub frames_skipped: u64,
    pub telemetry_shown: u64,
    pub cursor_samples: u64,
    pub actions_applied: u64,
    pub actions_rejected: u64,
}

/// 终端显示界面
pub struct TerminalDisplay<P> {
    panel: OperatorPanel,
    frames: MailboxReader<FrameSet>,
    telemetry: MailboxReader<TelemetrySnapshot>,
    cursor: CursorTimer<P>,
    channel: VideoChannel,
    operator: ScriptedOperator,
    last_status: String,
    stats: DisplayStats,
}

impl<P: CursorProvider> TerminalDisplay<P> {
    pub fn new(
        panel: OperatorPanel,
        frames: MailboxReader<FrameSet>,
        telemetry: MailboxReader<TelemetrySnapshot>,
        cursor: CursorTimer<P>,
        channel: VideoChannel,
        operator: ScriptedOperator,
    ) -> Self {
        Self {
            panel,
            frames,
            telemetry,
            cursor,
            channel,
            operator,
            last_status: String::new(),
            stats: DisplayStats::default(),
        }
    }

    /// 事件循环的一次迭代（非阻塞）
    pub fn tick(&mut self, now: Instant) {
        for action in self.operator.due(now) {
            self.apply(action);
        }

        if let Some(readout) = self.cursor.poll(now) {
            self.stats.cursor_samples += 1;
            debug!(
                pixel = %readout.pixel_text(),
                world = %readout.world_text(),
                "Cursor"
            );
        }

        let last_frame = self.frames.last_seen();
        if let Some(envelope) = self.frames.poll() {
            if last_frame > 0 {
                self.stats.frames_skipped += envelope.seq - last_frame - 1;
            }
            self.stats.frames_shown += 1;
            let image = envelope.value.channel(self.channel);
            debug!(
                "Frame cycle {} {:?} {}x{} ({} bytes, age {:?})",
                envelope.value.cycle(),
                self.channel,
                image.width(),
                image.height(),
                image.data().len(),
                envelope.age()
            );
        }

        if let Some(envelope) = self.telemetry.poll() {
            self.stats.telemetry_shown += 1;
            let snapshot = &envelope.value;
            let line = format!(
                "{} | joints [{}] | ee [{}]",
                snapshot.status,
                snapshot.joint_texts().join(", "),
                snapshot.end_effector_texts().join(", ")
            );
            if snapshot.status != self.last_status {
                info!("{}", line);
                self.last_status.clone_from(&snapshot.status);
            } else {
                debug!("{}", line);
            }
        }
    }

    /// 距离下一次需要处理事件的时间
    pub fn next_wakeup(&self, now: Instant) -> Duration {
        self.cursor.time_until_due(now).min(MAX_IDLE)
    }

    pub fn stats(&self) -> &DisplayStats {
        &self.stats
    }

    /// 脚本是否已全部执行
    pub fn script_finished(&self) -> bool {
        self.operator.remaining() == 0
    }

    fn apply(&mut self, action: OperatorAction) {
        debug!("Operator action: {:?}", action);
        let accepted = match action {
            OperatorAction::Request(request) => match self.panel.request_state(request) {
                Ok(()) => true,
                Err(e) => {
                    warn!("Request '{}' rejected: {}", request, e);
                    false
                },
            },
            OperatorAction::Click(point) => match self.cursor.sampler().on_click(point) {
                Some(pixel) => {
                    info!("Click recorded at pixel ({}, {})", pixel.x, pixel.y);
                    true
                },
                None => {
                    debug!("Click at ({}, {}) outside image ignored", point.x, point.y);
                    false
                },
            },
            OperatorAction::Sliders(input) => {
                let revision = self.panel.move_sliders(&input);
                debug!("Slider command revision {}", revision);
                true
            },
            OperatorAction::DirectControl(enabled) => {
                self.panel.set_direct_control(enabled).is_ok()
            },
            OperatorAction::Estop => self.panel.estop(),
            OperatorAction::ResetEstop => self.panel.reset_estop(),
            OperatorAction::OpenGripper => {
                self.panel.open_gripper();
                true
            },
            OperatorAction::CloseGripper => {
                self.panel.close_gripper();
                true
            },
        };

        if accepted {
            self.stats.actions_applied += 1;
        } else {
            self.stats.actions_rejected += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_operator_releases_due_actions_in_order() {
        let start = Instant::now();
        let mut operator = ScriptedOperator::new(
            start,
            vec![
                (Duration::from_millis(200), OperatorAction::Estop),
                (Duration::from_millis(100), OperatorAction::OpenGripper),
                (Duration::from_millis(300), OperatorAction::ResetEstop),
            ],
        );

        assert!(operator.due(start).is_empty());
        assert_eq!(
            operator.due(start + Duration::from_millis(250)),
            vec![OperatorAction::OpenGripper, OperatorAction::Estop]
        );
        assert_eq!(operator.remaining(), 1);
        assert_eq!(
            operator.due(start + Duration::from_secs(1)),
            vec![OperatorAction::ResetEstop]
        );
        assert_eq!(operator.remaining(), 0);
    }

    #[test]
    fn test_demo_calibration_clicks_land_inside_region() {
        let region = ImageRegion::default();
        let start = Instant::now();
        let mut operator = ScriptedOperator::demo(start, &region, 4);

        let clicks: Vec<ScreenPoint> = operator
            .due(start + Duration::from_secs(3))
            .into_iter()
            .filter_map(|action| match action {
                OperatorAction::Click(point) => Some(point),
                _ => None,
            })
            .collect();

        assert_eq!(clicks.len(), 4);
        assert!(clicks.iter().all(|p| region.contains(*p)));
        // 第一个点在左上，第三个点在右下
        assert!(clicks[0].x < clicks[2].x && clicks[0].y < clicks[2].y);
    }

    #[test]
    fn test_scripted_cursor_leaves_region() {
        let region = ImageRegion::default();
        // 起点回拨，让光标已经运动过一段时间
        let Some(start) = Instant::now().checked_sub(Duration::from_secs(2)) else {
            return;
        };
        let cursor = scripted_cursor(region, start);
        let point = cursor().unwrap();
        // 振幅 0.6 倍宽度，两秒后 x 偏移 > 0.5 倍宽度
        assert!(!region.contains(point), "{point:?}");
    }
}
