//! # 仿真协作者
//!
//! 无硬件时驱动工作站：
//! - [`SimVision`]：合成 RGB/深度/检测图像，带噪声、移动方块和随机丢帧
//! - [`SimArm`]：按速度比例逐周期逼近目标的简化机械臂，带随机总线故障
//! - [`SimMachine`]：覆盖全部面板状态的任务状态机（标定、示教、抓取、任务例程）

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use station_driver::{
    ArmActuator, CalibrationMap, CoordTable, DepthFrame, Image, JointVector, OperatorCommand,
    PixelFormat, StateMachine, StateRequest, StationError, TaskRoutine, VisionSensor,
};
use station_tools::{AffineFit, CalibrationRecord, ToolsError};
use std::f64::consts::FRAC_PI_2;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 桌面原始深度读数
const TABLE_RAW_DEPTH: u16 = 700;
/// 方块顶面原始深度读数
const BLOCK_RAW_DEPTH: u16 = 640;
/// 方块半边长（像素）
const BLOCK_HALF_SIZE: i64 = 20;

/// 原始深度 → 毫米（Kinect 11-bit 近似）
pub fn raw_depth_to_mm(raw: u16) -> f64 {
    1000.0 * 0.1236 * (f64::from(raw) / 2842.5 + 1.1863).tan()
}

fn calibration_error(err: ToolsError) -> StationError {
    StationError::Calibration(err.to_string())
}

/// 把记录中的坐标表安装到标定映射
pub fn install_record(map: &CalibrationMap, record: &CalibrationRecord) -> Result<(), StationError> {
    let table = CoordTable::new(record.width, record.height, record.table.clone())?;
    map.install(table)
}

// ==================== Vision ====================

/// 合成相机
pub struct SimVision {
    width: u32,
    height: u32,
    rng: StdRng,
    failure_rate: f64,
    cycle: u64,
    depth: DepthFrame,
    released: bool,
}

impl SimVision {
    pub fn new(width: u32, height: u32, seed: u64, failure_rate: f64) -> Self {
        Self {
            width,
            height,
            rng: StdRng::seed_from_u64(seed),
            failure_rate: failure_rate.clamp(0.0, 1.0),
            cycle: 0,
            depth: DepthFrame::zeros(width, height),
            released: false,
        }
    }

    /// 方块中心随采集周期水平往返移动
    fn block_center(&self) -> (i64, i64) {
        let span = (i64::from(self.width) - 4 * BLOCK_HALF_SIZE).max(1);
        let travel = (self.cycle as i64 * 2) % (2 * span);
        let offset = if travel < span { travel } else { 2 * span - travel };
        (2 * BLOCK_HALF_SIZE + offset, i64::from(self.height) / 2)
    }

    fn in_block(&self, center: (i64, i64), x: u32, y: u32) -> bool {
        (i64::from(x) - center.0).abs() <= BLOCK_HALF_SIZE
            && (i64::from(y) - center.1).abs() <= BLOCK_HALF_SIZE
    }

    fn check_device(&mut self, what: &str) -> Result<(), StationError> {
        if self.released {
            return Err(StationError::Capture("device released".to_string()));
        }
        if self.rng.gen_bool(self.failure_rate) {
            return Err(StationError::Capture(format!("simulated {what} drop")));
        }
        Ok(())
    }
}

impl VisionSensor for SimVision {
    fn capture_video_frame(&mut self) -> Result<(), StationError> {
        self.check_device("video frame")?;
        self.cycle += 1;
        Ok(())
    }

    fn capture_depth_frame(&mut self) -> Result<(), StationError> {
        self.check_device("depth frame")?;
        let center = self.block_center();
        let mut samples = Vec::with_capacity(self.width as usize * self.height as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                let base = if self.in_block(center, x, y) {
                    BLOCK_RAW_DEPTH
                } else {
                    TABLE_RAW_DEPTH
                };
                samples.push(base + self.rng.gen_range(0..6u16));
            }
        }
        self.depth = DepthFrame::new(self.width, self.height, samples)?;
        Ok(())
    }

    fn convert_frame(&mut self) -> Result<Image, StationError> {
        let center = self.block_center();
        let (w, h) = (self.width.max(1), self.height.max(1));
        let mut data = Vec::with_capacity(w as usize * h as usize * 3);
        for y in 0..self.height {
            for x in 0..self.width {
                if self.in_block(center, x, y) {
                    data.extend_from_slice(&[200, 40, 40]);
                } else {
                    data.push((x * 255 / w) as u8);
                    data.push((y * 255 / h) as u8);
                    data.push((self.cycle % 256) as u8);
                }
            }
        }
        Ok(Image::new(self.width, self.height, PixelFormat::Rgb8, data))
    }

    fn convert_depth_frame(&mut self) -> Result<Image, StationError> {
        let mut data = Vec::with_capacity(self.width as usize * self.height as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                let raw = self.depth.sample(x, y).unwrap_or(0);
                let shade = f64::from(raw.saturating_sub(600)) / 200.0 * 255.0;
                data.push(shade.min(255.0) as u8);
            }
        }
        Ok(Image::new(self.width, self.height, PixelFormat::Gray8, data))
    }

    fn convert_detect_frame(&mut self) -> Result<Image, StationError> {
        let center = self.block_center();
        let mut data = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        for y in 0..self.height {
            for x in 0..self.width {
                let edge = self.in_block(center, x, y)
                    && ((i64::from(x) - center.0).abs() == BLOCK_HALF_SIZE
                        || (i64::from(y) - center.1).abs() == BLOCK_HALF_SIZE);
                if edge {
                    data.extend_from_slice(&[0, 255, 0, 255]);
                } else {
                    data.extend_from_slice(&[0, 0, 0, 0]);
                }
            }
        }
        Ok(Image::new(self.width, self.height, PixelFormat::Rgba8, data))
    }

    fn current_depth_frame(&self) -> DepthFrame {
        self.depth.clone()
    }

    fn release(&mut self) {
        if !self.released {
            info!("Simulated camera released after {} captures", self.cycle);
        }
        self.released = true;
    }
}

// ==================== Arm ====================

/// 满速时每次反馈刷新的最大关节步进（弧度）
const MAX_STEP_RAD: f64 = 0.12;
/// 基座高度与连杆长度（毫米）
const BASE_HEIGHT_MM: f64 = 117.0;
const LINKS_MM: [f64; 3] = [100.0, 100.0, 110.0];

/// 简化机械臂
pub struct SimArm {
    joints: JointVector,
    targets: JointVector,
    pending_targets: Option<JointVector>,
    speed: f64,
    pending_speed: Option<f64>,
    torque: JointVector,
    pending_torque: Option<JointVector>,
    gripper_closed: bool,
    rng: StdRng,
    fault_rate: f64,
    shut_down: bool,
}

impl SimArm {
    pub fn new(num_joints: usize, seed: u64, fault_rate: f64) -> Self {
        Self {
            joints: JointVector::from_elem(0.0, num_joints),
            targets: JointVector::from_elem(0.0, num_joints),
            pending_targets: None,
            speed: 0.25,
            pending_speed: None,
            torque: JointVector::from_elem(1.0, num_joints),
            pending_torque: None,
            gripper_closed: false,
            rng: StdRng::seed_from_u64(seed),
            fault_rate: fault_rate.clamp(0.0, 1.0),
            shut_down: false,
        }
    }

    fn check_bus(&mut self, what: &str) -> Result<(), StationError> {
        if self.shut_down {
            return Err(StationError::Actuator("arm is shut down".to_string()));
        }
        if self.rng.gen_bool(self.fault_rate) {
            return Err(StationError::Actuator(format!("simulated bus timeout on {what}")));
        }
        Ok(())
    }

    fn check_len(&self, what: &str, len: usize) -> Result<(), StationError> {
        if len != self.joints.len() {
            return Err(StationError::Actuator(format!(
                "{what} has {len} values, arm has {} joints",
                self.joints.len()
            )));
        }
        Ok(())
    }
}

impl ArmActuator for SimArm {
    fn num_joints(&self) -> usize {
        self.joints.len()
    }

    fn joint_angles_fb(&self) -> JointVector {
        self.joints.clone()
    }

    fn wrist_pose(&self) -> [f64; 4] {
        let joint = |i: usize| self.joints.get(i).copied().unwrap_or(0.0);
        let mut angle = 0.0;
        let mut reach = 0.0;
        let mut z = BASE_HEIGHT_MM;
        for (i, link) in LINKS_MM.iter().enumerate() {
            angle += joint(i + 1);
            reach += link * angle.sin();
            z += link * angle.cos();
        }
        let base = joint(0);
        [-reach * base.sin(), reach * base.cos(), z, angle - FRAC_PI_2]
    }

    fn refresh_feedback(&mut self) -> Result<(), StationError> {
        self.check_bus("feedback read")?;
        let step = MAX_STEP_RAD * self.speed.max(0.05);
        for ((joint, target), torque) in self.joints.iter_mut().zip(&self.targets).zip(&self.torque) {
            // 力矩为 0 时关节不动
            let limit = step * torque.clamp(0.0, 1.0);
            *joint += (target - *joint).clamp(-limit, limit);
        }
        Ok(())
    }

    fn set_positions(&mut self, positions: &[f64], update_now: bool) -> Result<(), StationError> {
        self.check_len("position command", positions.len())?;
        let positions: JointVector = positions.iter().copied().collect();
        if update_now {
            self.check_bus("position write")?;
            self.targets = positions;
        } else {
            self.pending_targets = Some(positions);
        }
        Ok(())
    }

    fn set_speeds_normalized_global(
        &mut self,
        fraction: f64,
        update_now: bool,
    ) -> Result<(), StationError> {
        let fraction = fraction.clamp(0.0, 1.0);
        if update_now {
            self.check_bus("speed write")?;
            self.speed = fraction;
        } else {
            self.pending_speed = Some(fraction);
        }
        Ok(())
    }

    fn set_torque_limits(&mut self, limits: &[f64], update_now: bool) -> Result<(), StationError> {
        self.check_len("torque limits", limits.len())?;
        let limits: JointVector = limits.iter().map(|l| l.clamp(0.0, 1.0)).collect();
        if update_now {
            self.check_bus("torque write")?;
            self.torque = limits;
        } else {
            self.pending_torque = Some(limits);
        }
        Ok(())
    }

    fn send_commands(&mut self) -> Result<(), StationError> {
        self.check_bus("command write")?;
        if let Some(targets) = self.pending_targets.take() {
            self.targets = targets;
        }
        if let Some(speed) = self.pending_speed.take() {
            self.speed = speed;
        }
        if let Some(torque) = self.pending_torque.take() {
            self.torque = torque;
        }
        Ok(())
    }

    fn open_gripper(&mut self) -> Result<(), StationError> {
        self.check_bus("gripper write")?;
        self.gripper_closed = false;
        debug!("Gripper opened");
        Ok(())
    }

    fn close_gripper(&mut self) -> Result<(), StationError> {
        self.check_bus("gripper write")?;
        self.gripper_closed = true;
        debug!("Gripper closed");
        Ok(())
    }

    fn hold_safe(&mut self) -> Result<(), StationError> {
        if self.shut_down {
            return Ok(());
        }
        self.targets = self.joints.clone();
        self.pending_targets = None;
        self.pending_speed = None;
        self.pending_torque = None;
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), StationError> {
        if !self.shut_down {
            let gripper = if self.gripper_closed { "closed" } else { "open" };
            info!("Simulated arm shut down, gripper {}", gripper);
        }
        self.shut_down = true;
        Ok(())
    }
}

// ==================== State machine ====================

/// 关节到位容差（弧度）
const ARRIVAL_TOLERANCE_RAD: f64 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MachineState {
    Idle,
    Estop,
    Calibrate,
    Manual,
    Execute,
    ClickAndPick,
    Task(TaskRoutine),
}

/// 仿真任务状态机
pub struct SimMachine {
    state: MachineState,
    next: Option<StateRequest>,
    status: String,
    calibration: Arc<CalibrationMap>,
    click_world_points: Vec<[f64; 2]>,
    record_path: Option<PathBuf>,
    clicked: Vec<[f64; 2]>,
    fitted_points: Option<(Vec<[f64; 2]>, Vec<[f64; 2]>)>,
    waypoints: Vec<JointVector>,
    plan: Vec<JointVector>,
    plan_index: usize,
    block_positions: Vec<[f64; 2]>,
    applied_revision: u64,
}

impl SimMachine {
    /// # 参数
    ///
    /// - `calibration`: 共享标定映射句柄（点击从这里取）
    /// - `click_world_points`: 标定点击依次对应的世界坐标（毫米）
    /// - `record_path`: 保存/加载标定记录的文件
    pub fn new(
        calibration: Arc<CalibrationMap>,
        click_world_points: Vec<[f64; 2]>,
        record_path: Option<PathBuf>,
    ) -> Self {
        Self {
            state: MachineState::Idle,
            next: None,
            status: "Idle: waiting for input".to_string(),
            calibration,
            click_world_points,
            record_path,
            clicked: Vec::new(),
            fitted_points: None,
            waypoints: Vec::new(),
            plan: Vec::new(),
            plan_index: 0,
            block_positions: Vec::new(),
            applied_revision: 0,
        }
    }

    /// 已记录的方块位置（世界坐标）
    pub fn block_positions(&self) -> &[[f64; 2]] {
        &self.block_positions
    }

    pub fn waypoint_count(&self) -> usize {
        self.waypoints.len()
    }

    fn enter(&mut self, state: MachineState, status: impl Into<String>) {
        self.state = state;
        self.status = status.into();
    }

    fn start_plan(&mut self, state: MachineState, plan: Vec<JointVector>) {
        self.plan = plan;
        self.plan_index = 0;
        self.state = state;
    }

    fn transition(&mut self, request: StateRequest, arm: &mut dyn ArmActuator) {
        debug!("Transition requested: {}", request);
        match request {
            StateRequest::Idle => {
                self.plan.clear();
                self.enter(MachineState::Idle, "Idle: waiting for input");
            },
            StateRequest::Estop => {
                self.plan.clear();
                self.enter(MachineState::Estop, "EMERGENCY STOP");
            },
            StateRequest::Calibrate => {
                self.clicked.clear();
                self.calibration.invalidate();
                // 标定开始前的点击作废
                self.calibration.take_click();
                let needed = self.click_world_points.len();
                self.enter(
                    MachineState::Calibrate,
                    format!("Calibration: click point 1 of {needed}"),
                );
            },
            StateRequest::Manual => {
                self.plan.clear();
                self.enter(MachineState::Manual, "Manual: sliders drive the arm");
            },
            StateRequest::Execute => {
                if self.waypoints.is_empty() {
                    self.enter(MachineState::Idle, "Execute: no waypoints recorded");
                } else {
                    self.start_plan(MachineState::Execute, self.waypoints.clone());
                }
            },
            StateRequest::AddWaypoint => {
                self.waypoints.push(arm.joint_angles_fb());
                self.status = format!("Waypoint {} recorded", self.waypoint_count());
            },
            StateRequest::ClearWaypoints => {
                self.waypoints.clear();
                self.status = "Waypoints cleared".to_string();
            },
            StateRequest::ClickAndPick => {
                if self.calibration.is_calibrated() {
                    self.calibration.take_click();
                    self.plan.clear();
                    self.enter(MachineState::ClickAndPick, "Click and pick: click a block");
                } else {
                    self.enter(MachineState::Idle, "Click and pick: calibrate first");
                }
            },
            StateRequest::SaveCalibration => {
                self.status = match self.save_calibration() {
                    Ok(path) => format!("Calibration saved to {}", path.display()),
                    Err(e) => {
                        warn!("Save calibration failed: {}", e);
                        format!("Save calibration failed: {e}")
                    },
                };
            },
            StateRequest::LoadCalibration => {
                self.status = match self.load_calibration() {
                    Ok(path) => format!("Calibration loaded from {}", path.display()),
                    Err(e) => {
                        warn!("Load calibration failed: {}", e);
                        format!("Load calibration failed: {e}")
                    },
                };
            },
            StateRequest::RecordBlockPosition => {
                let world = self.calibration.take_click().and_then(|p| self.calibration.world_at(p));
                self.status = match world {
                    Some(w) => {
                        self.block_positions.push([w.x, w.y]);
                        format!(
                            "Block {} recorded at ({:.0}, {:.0})",
                            self.block_positions().len(),
                            w.x,
                            w.y
                        )
                    },
                    None => "Record block: click a calibrated pixel first".to_string(),
                };
            },
            StateRequest::Task(routine) => {
                let plan = task_plan(routine, arm.num_joints(), &self.waypoints);
                if plan.is_empty() {
                    self.enter(
                        MachineState::Idle,
                        format!("{}: nothing to do", StateRequest::Task(routine)),
                    );
                } else {
                    self.start_plan(MachineState::Task(routine), plan);
                }
            },
        }
    }

    fn label(&self) -> String {
        match self.state {
            MachineState::Execute => "Execute".to_string(),
            MachineState::ClickAndPick => "Click and pick".to_string(),
            MachineState::Task(routine) => StateRequest::Task(routine).to_string(),
            other => format!("{other:?}"),
        }
    }

    fn manual(
        &mut self,
        arm: &mut dyn ArmActuator,
        command: &OperatorCommand,
    ) -> Result<(), StationError> {
        if command.revision == self.applied_revision || command.joint_positions.is_empty() {
            return Ok(());
        }
        if !command.torque_limits.is_empty() {
            arm.set_torque_limits(&command.torque_limits, false)?;
        }
        arm.set_speeds_normalized_global(command.speed_fraction, false)?;
        arm.set_positions(&command.joint_positions, false)?;
        arm.send_commands()?;
        self.applied_revision = command.revision;
        self.status = format!("Manual: command {} applied", command.revision);
        Ok(())
    }

    fn calibrate_step(&mut self) {
        if let Some(click) = self.calibration.take_click() {
            debug!("Calibration click at ({}, {})", click.x, click.y);
            self.clicked.push([f64::from(click.x), f64::from(click.y)]);
        }

        let needed = self.click_world_points.len();
        if self.clicked.len() < needed {
            self.status = format!("Calibration: click point {} of {}", self.clicked.len() + 1, needed);
            return;
        }

        let status = match self.fit_and_install() {
            Ok(rms) => {
                info!("Calibration installed, residual {:.2} mm", rms);
                format!("Calibration complete (residual {rms:.1} mm)")
            },
            Err(e) => {
                warn!("Calibration failed: {}", e);
                format!("Calibration failed: {e}")
            },
        };
        self.enter(MachineState::Idle, status);
    }

    fn fit_and_install(&mut self) -> Result<f64, StationError> {
        let pixels = std::mem::take(&mut self.clicked);
        let world = self.click_world_points.clone();
        let fit = AffineFit::solve(&pixels, &world).map_err(calibration_error)?;

        let (width, height) = self.calibration.dimensions();
        let table = CoordTable::new(width, height, fit.rasterize(width, height))?;
        self.calibration.install(table)?;

        let rms = fit.rms_error(&pixels, &world);
        self.fitted_points = Some((pixels, world));
        Ok(rms)
    }

    fn save_calibration(&self) -> Result<PathBuf, StationError> {
        let path = self
            .record_path
            .clone()
            .ok_or_else(|| StationError::Calibration("no calibration record path".to_string()))?;
        let table = self
            .calibration
            .table()
            .ok_or_else(|| StationError::Calibration("not calibrated".to_string()))?;
        let (pixels, world) = self.fitted_points.clone().unwrap_or_default();

        let record = CalibrationRecord::new(
            table.width(),
            table.height(),
            pixels,
            world,
            table.entries().to_vec(),
        )
        .map_err(calibration_error)?;
        record.save(&path).map_err(calibration_error)?;
        Ok(path)
    }

    fn load_calibration(&mut self) -> Result<PathBuf, StationError> {
        let path = self
            .record_path
            .clone()
            .ok_or_else(|| StationError::Calibration("no calibration record path".to_string()))?;
        let record = CalibrationRecord::load(&path).map_err(calibration_error)?;
        install_record(&self.calibration, &record)?;
        self.fitted_points = Some((record.pixel_points, record.world_points));
        Ok(path)
    }

    fn await_pick_click(&mut self, num_joints: usize) {
        let Some(click) = self.calibration.take_click() else {
            return;
        };
        match self.calibration.world_at(click) {
            Some(world) => {
                self.status = format!("Click and pick: picking at ({:.0}, {:.0})", world.x, world.y);
                self.plan = pick_plan([world.x, world.y], num_joints);
                self.plan_index = 0;
            },
            None => {
                self.enter(MachineState::Idle, "Click and pick: calibration lost");
            },
        }
    }

    fn follow_plan(&mut self, arm: &mut dyn ArmActuator) -> Result<(), StationError> {
        let label = self.label();
        let Some(target) = self.plan.get(self.plan_index).cloned() else {
            self.plan.clear();
            self.enter(MachineState::Idle, format!("{label}: complete"));
            return Ok(());
        };

        let feedback = arm.joint_angles_fb();
        let arrived = feedback.len() == target.len()
            && feedback
                .iter()
                .zip(&target)
                .all(|(fb, t)| (fb - t).abs() < ARRIVAL_TOLERANCE_RAD);

        if arrived {
            // 抓取/放置交替
            if self.state != MachineState::Execute {
                if self.plan_index % 2 == 0 {
                    arm.close_gripper()?;
                } else {
                    arm.open_gripper()?;
                }
            }
            self.plan_index += 1;
            return Ok(());
        }

        arm.set_positions(&target, false)?;
        arm.send_commands()?;
        self.status = format!(
            "{label}: moving to pose {} of {}",
            self.plan_index + 1,
            self.plan.len()
        );
        Ok(())
    }
}

impl StateMachine for SimMachine {
    fn set_next_state(&mut self, request: StateRequest) {
        self.next = Some(request);
    }

    fn advance(
        &mut self,
        arm: &mut dyn ArmActuator,
        command: &OperatorCommand,
    ) -> Result<(), StationError> {
        if let Some(request) = self.next.take() {
            self.transition(request, arm);
        }

        match self.state {
            MachineState::Idle | MachineState::Estop => Ok(()),
            MachineState::Manual => self.manual(arm, command),
            MachineState::Calibrate => {
                self.calibrate_step();
                Ok(())
            },
            MachineState::ClickAndPick if self.plan.is_empty() => {
                self.await_pick_click(arm.num_joints());
                Ok(())
            },
            MachineState::Execute | MachineState::ClickAndPick | MachineState::Task(_) => {
                self.follow_plan(arm)
            },
        }
    }

    fn status_message(&self) -> String {
        self.status.clone()
    }
}

/// 由基座转角和伸展量生成关节位姿
fn pose(num_joints: usize, base: f64, reach: f64) -> JointVector {
    let mut joints = JointVector::from_elem(0.0, num_joints);
    let values = [base, reach, reach * 0.6, -0.4];
    for (joint, value) in joints.iter_mut().zip(values) {
        *joint = value;
    }
    joints
}

/// 世界坐标 → 接近/抓取/抬起三段位姿
fn pick_plan(world: [f64; 2], num_joints: usize) -> Vec<JointVector> {
    let base = (-world[0]).atan2(world[1]);
    let reach = (world[0].hypot(world[1]) / 300.0).clamp(0.1, 1.2);
    vec![
        pose(num_joints, base, reach * 0.8),
        pose(num_joints, base, reach),
        pose(num_joints, base, reach * 0.8),
    ]
}

/// 任务例程的位姿序列：偶数位姿抓取，奇数位姿放置
fn task_plan(routine: TaskRoutine, num_joints: usize, waypoints: &[JointVector]) -> Vec<JointVector> {
    let picks_and_places: &[(f64, f64)] = match routine {
        TaskRoutine::Mirror => {
            return waypoints
                .iter()
                .map(|wp| {
                    let mut mirrored = wp.clone();
                    if let Some(base) = mirrored.first_mut() {
                        *base = -*base;
                    }
                    mirrored
                })
                .collect();
        },
        TaskRoutine::Stack3 => &[
            (-0.6, 0.7),
            (0.4, 0.6),
            (-0.3, 0.8),
            (0.4, 0.55),
            (0.0, 0.9),
            (0.4, 0.5),
        ],
        TaskRoutine::LineEmUp => &[
            (-0.5, 0.7),
            (0.5, 0.5),
            (-0.2, 0.9),
            (0.5, 0.65),
            (0.2, 0.8),
            (0.5, 0.8),
        ],
        TaskRoutine::StackEmHigh => &[
            (-0.7, 0.6),
            (0.6, 0.7),
            (-0.4, 0.8),
            (0.6, 0.65),
            (-0.1, 0.7),
            (0.6, 0.6),
            (0.2, 0.9),
            (0.6, 0.55),
        ],
        TaskRoutine::Pyramid5 => &[
            (-0.8, 0.7),
            (0.3, 0.6),
            (-0.5, 0.8),
            (0.5, 0.6),
            (-0.2, 0.7),
            (0.4, 0.55),
            (0.1, 0.9),
            (0.35, 0.5),
            (0.6, 0.8),
            (0.4, 0.45),
        ],
    };
    picks_and_places
        .iter()
        .map(|&(base, reach)| pose(num_joints, base, reach))
        .collect()
}
