//! # Arm Station
//!
//! 用仿真硬件运行工作站：三个后台循环（采集 / 控制 / 遥测）加终端显示界面。
//!
//! ```bash
//! # 默认配置运行 20 秒
//! arm-station --duration 20
//!
//! # 指定配置文件和标定记录，显示深度通道
//! arm-station --config station.toml --calibration calibration.bin --channel depth
//!
//! # 查看每帧/每次光标采样
//! RUST_LOG=arm_station=debug arm-station
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use station_driver::{
    CalibrationMap, CursorTimer, ImageRegion, JointDisplayConfig, PipelineConfig, StationBuilder,
    VideoChannel,
};
use station_tools::{CalibrationRecord, StationConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod display;
mod sim;

use display::{ScriptedOperator, TerminalDisplay, scripted_cursor};
use sim::{SimArm, SimMachine, SimVision};

/// 仿真机械臂关节数
const NUM_JOINTS: usize = 4;

/// Arm Station - 视觉引导机械臂工作站
#[derive(Parser, Debug)]
#[command(name = "arm-station")]
#[command(about = "Run the arm station against simulated hardware", long_about = None)]
#[command(version)]
struct Args {
    /// 配置文件（TOML）
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 标定记录文件（覆盖配置；文件存在时启动即加载）
    #[arg(long)]
    calibration: Option<PathBuf>,

    /// 运行时长（秒），缺省时运行到 Ctrl+C
    #[arg(short, long)]
    duration: Option<f64>,

    /// 显示通道：rgb / depth / detect（覆盖配置）
    #[arg(long)]
    channel: Option<String>,

    /// 仿真采集失败率（0.0 - 1.0）
    #[arg(long, default_value_t = 0.02)]
    capture_failure_rate: f64,

    /// 仿真总线故障率（0.0 - 1.0）
    #[arg(long, default_value_t = 0.005)]
    bus_fault_rate: f64,

    /// 仿真随机种子
    #[arg(long, default_value_t = 7)]
    seed: u64,
}

fn pipeline_config(config: &StationConfig) -> PipelineConfig {
    let loops = &config.loops;
    PipelineConfig {
        sensor_period_ms: loops.sensor_period_ms,
        control_period_ms: loops.control_period_ms,
        telemetry_period_ms: loops.telemetry_period_ms,
        cursor_period_ms: loops.cursor_period_ms,
        join_timeout_ms: loops.join_timeout_ms,
    }
}

fn image_region(config: &StationConfig) -> ImageRegion {
    let display = &config.display;
    ImageRegion {
        origin_x: display.origin_x,
        origin_y: display.origin_y,
        width: display.width,
        height: display.height,
    }
}

fn joint_display(config: &StationConfig) -> JointDisplayConfig {
    JointDisplayConfig {
        offsets_deg: config.display.joint_offsets_deg.iter().copied().collect(),
    }
}

fn check_rate(name: &str, rate: f64) -> Result<f64> {
    if !(0.0..=1.0).contains(&rate) {
        anyhow::bail!("--{name} must be within 0.0..=1.0, got {rate}");
    }
    Ok(rate)
}

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("arm_station=info,station_driver=info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => StationConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => StationConfig::default(),
    };
    if let Some(path) = &args.calibration {
        config.calibration.load_on_start = path.exists();
        config.calibration.record_path = Some(path.clone());
    }

    let channel: VideoChannel = args
        .channel
        .as_deref()
        .unwrap_or(&config.display.channel)
        .parse::<VideoChannel>()
        .context("Invalid display channel")?;
    let capture_failure_rate = check_rate("capture-failure-rate", args.capture_failure_rate)?;
    let bus_fault_rate = check_rate("bus-fault-rate", args.bus_fault_rate)?;
    let run_for = args
        .duration
        .map(Duration::try_from_secs_f64)
        .transpose()
        .context("Invalid --duration")?;

    let pipeline = pipeline_config(&config);
    let region = image_region(&config);
    let calibration = Arc::new(CalibrationMap::for_region(&region));

    if config.calibration.load_on_start
        && let Some(path) = &config.calibration.record_path
    {
        match CalibrationRecord::load(path) {
            Ok(record) => {
                sim::install_record(&calibration, &record)
                    .with_context(|| format!("Calibration record {} does not fit", path.display()))?;
                info!("Loaded calibration from {}", path.display());
            },
            Err(e) => warn!("Could not load calibration {}: {}", path.display(), e),
        }
    }

    // Ctrl+C 只置位标志，由主循环有序关闭
    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_flag = interrupted.clone();
    ctrlc::set_handler(move || {
        interrupted_flag.store(true, Ordering::Release);
    })
    .context("Failed to set Ctrl+C handler")?;

    let station = StationBuilder::new()
        .pipeline_config(pipeline.clone())
        .image_region(region)
        .joint_display(joint_display(&config))
        .calibration(calibration.clone())
        .vision(Box::new(SimVision::new(
            region.width,
            region.height,
            args.seed,
            capture_failure_rate,
        )))
        .arm(Box::new(SimArm::new(NUM_JOINTS, args.seed, bus_fault_rate)))
        .state_machine(Box::new(SimMachine::new(
            calibration,
            config.calibration.click_world_points.clone(),
            config.calibration.record_path.clone(),
        )))
        .build()
        .context("Failed to start station")?;

    info!(
        "Arm station running: {}x{} image at ({}, {}), channel {:?}",
        region.width, region.height, region.origin_x, region.origin_y, channel
    );

    let start = Instant::now();
    let cursor = CursorTimer::new(
        pipeline.cursor_period(),
        scripted_cursor(region, start),
        station.cursor_sampler(Box::new(sim::raw_depth_to_mm)),
    );
    let mut terminal = TerminalDisplay::new(
        station.panel(),
        station.frame_reader(),
        station.telemetry_reader(),
        cursor,
        channel,
        ScriptedOperator::demo(start, &region, config.calibration.clicks_required),
    );
    let deadline = run_for.map(|d| start + d);

    // UI 事件循环
    loop {
        let now = Instant::now();
        if interrupted.load(Ordering::Acquire) {
            info!("Received interrupt signal, shutting down");
            break;
        }
        if deadline.is_some_and(|d| now >= d) {
            info!("Run duration elapsed, shutting down");
            break;
        }
        if !station.is_running() {
            error!("Station stopped unexpectedly");
            break;
        }

        terminal.tick(now);
        std::thread::sleep(terminal.next_wakeup(Instant::now()));
    }

    let fatal = station.fatal_error();
    let metrics = station.get_metrics();
    let report = station.shutdown();

    info!("Final metrics: {:?}", metrics);
    info!(
        "Display: {:?} (script finished: {})",
        terminal.stats(),
        terminal.script_finished()
    );
    if !report.is_clean() {
        warn!("Threads did not stop in time: {:?}", report.stalled);
    }

    if let Some(diagnostic) = fatal {
        anyhow::bail!("Station stopped on fatal error: {diagnostic}");
    }
    Ok(())
}
