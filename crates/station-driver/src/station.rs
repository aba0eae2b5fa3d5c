//! Station API 模块
//!
//! 提供对外的 `Station` 结构体，持有共享记录并管理三个后台线程的生命周期。

use crate::calibration::{CalibrationMap, ImageRegion};
use crate::cursor::{CursorSampler, DepthConverter};
use crate::frame::FrameSet;
use crate::mailbox::{Mailbox, MailboxReader, Slot};
use crate::metrics::{MetricsSnapshot, StationMetrics};
use crate::panel::OperatorPanel;
use crate::pipeline::PipelineConfig;
use crate::readout::TelemetrySnapshot;
use crate::state::{FeedbackState, RobotContext};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{JoinHandle, spawn};
use std::time::Duration;
use tracing::{error, info};

/// Extension trait for timeout-capable thread joins
trait JoinTimeout {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()>;
}

impl<T: Send + 'static> JoinTimeout for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()> {
        let (tx, rx) = crossbeam_channel::bounded(1);

        // Watchdog thread joins the target; it is leaked if the target never exits
        spawn(move || {
            let _ = tx.send(self.join());
        });

        match rx.recv_timeout(timeout) {
            Ok(join_result) => join_result.map(|_| ()),
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => Err(Box::new(
                std::io::Error::new(std::io::ErrorKind::TimedOut, "Thread join timeout"),
            )),
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                Err(Box::new(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "Thread panicked during join",
                )))
            },
        }
    }
}

/// 各线程存活状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadHealth {
    pub sensor: bool,
    pub control: bool,
    pub telemetry: bool,
}

impl ThreadHealth {
    pub fn all_alive(&self) -> bool {
        self.sensor && self.control && self.telemetry
    }
}

/// 关闭结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// 未能在超时内退出（或 panic）的线程名
    pub stalled: Vec<&'static str>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.stalled.is_empty()
    }
}

/// 后台线程句柄
pub(crate) struct LoopThreads {
    pub(crate) sensor: Option<JoinHandle<()>>,
    pub(crate) control: Option<JoinHandle<()>>,
    pub(crate) telemetry: Option<JoinHandle<()>>,
}

/// 工作站
///
/// 由 [`StationBuilder`](crate::StationBuilder) 构建。共享记录归 `Station` 所有，
/// 协作者已经被移动到各自的线程中。
///
/// Drop 时通知所有线程退出并等待（每个线程最多 `join_timeout_ms`）。
pub struct Station {
    ctx: Arc<RobotContext>,
    calibration: Arc<CalibrationMap>,
    frames: Arc<Mailbox<FrameSet>>,
    telemetry: Arc<Mailbox<TelemetrySnapshot>>,
    is_running: Arc<AtomicBool>,
    metrics: Arc<StationMetrics>,
    fatal: Arc<Slot<String>>,
    config: PipelineConfig,
    region: ImageRegion,
    threads: LoopThreads,
}

impl Station {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        ctx: Arc<RobotContext>,
        calibration: Arc<CalibrationMap>,
        frames: Arc<Mailbox<FrameSet>>,
        telemetry: Arc<Mailbox<TelemetrySnapshot>>,
        is_running: Arc<AtomicBool>,
        metrics: Arc<StationMetrics>,
        fatal: Arc<Slot<String>>,
        config: PipelineConfig,
        region: ImageRegion,
        threads: LoopThreads,
    ) -> Self {
        Self {
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
        }
    }

    /// 操作面板句柄
    pub fn panel(&self) -> OperatorPanel {
        OperatorPanel::new(self.ctx.clone(), self.metrics.clone())
    }

    /// 共享机器人状态
    pub fn context(&self) -> Arc<RobotContext> {
        self.ctx.clone()
    }

    /// 标定映射
    pub fn calibration(&self) -> Arc<CalibrationMap> {
        self.calibration.clone()
    }

    /// 帧集合邮箱
    pub fn frames(&self) -> Arc<Mailbox<FrameSet>> {
        self.frames.clone()
    }

    /// 帧集合订阅者（只返回新帧）
    pub fn frame_reader(&self) -> MailboxReader<FrameSet> {
        MailboxReader::new(self.frames.clone())
    }

    /// 遥测快照订阅者
    pub fn telemetry_reader(&self) -> MailboxReader<TelemetrySnapshot> {
        MailboxReader::new(self.telemetry.clone())
    }

    /// 最新遥测快照
    pub fn latest_telemetry(&self) -> Option<TelemetrySnapshot> {
        self.telemetry.latest().map(|e| e.value.clone())
    }

    /// 最新反馈快照（无锁）
    pub fn feedback(&self) -> Arc<FeedbackState> {
        self.ctx.feedback()
    }

    /// 创建 UI 线程使用的光标采样器
    pub fn cursor_sampler(&self, depth: Box<dyn DepthConverter>) -> CursorSampler {
        CursorSampler::new(
            self.region,
            self.calibration.clone(),
            self.frames.clone(),
            depth,
            self.metrics.clone(),
        )
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn region(&self) -> &ImageRegion {
        &self.region
    }

    /// 是否仍在运行（未关闭、未发生致命错误）
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
    }

    /// 致命错误诊断（如果发生过）
    pub fn fatal_error(&self) -> Option<String> {
        self.fatal.peek()
    }

    /// 检查线程健康状态
    pub fn check_health(&self) -> ThreadHealth {
        let alive = |h: &Option<JoinHandle<()>>| h.as_ref().is_some_and(|h| !h.is_finished());
        ThreadHealth {
            sensor: alive(&self.threads.sensor),
            control: alive(&self.threads.control),
            telemetry: alive(&self.threads.telemetry),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.check_health().all_alive()
    }

    /// 获取指标快照
    pub fn get_metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// 阻塞等待工作站停止（致命错误或其他线程调用关闭），最多等待 `timeout`
    ///
    /// 返回是否已停止。
    pub fn wait(&self, timeout: Duration) -> bool {
        let poll = Duration::from_millis(10);
        let deadline = std::time::Instant::now() + timeout;
        while self.is_running() {
            let now = std::time::Instant::now();
            if now >= deadline {
                return false;
            }
            spin_sleep::sleep(poll.min(deadline - now));
        }
        true
    }

    /// 关闭工作站并等待所有线程退出
    pub fn shutdown(mut self) -> ShutdownReport {
        self.stop_and_join()
    }

    fn stop_and_join(&mut self) -> ShutdownReport {
        // Release: All writes before this are visible to threads that see the false value
        self.is_running.store(false, Ordering::Release);

        let mut report = ShutdownReport::default();
        if self.threads.sensor.is_none()
            && self.threads.control.is_none()
            && self.threads.telemetry.is_none()
        {
            // 已经关闭过
            return report;
        }

        let join_timeout = self.config.join_timeout();
        let handles = [
            ("sensor", self.threads.sensor.take()),
            ("control", self.threads.control.take()),
            ("telemetry", self.threads.telemetry.take()),
        ];
        for (name, handle) in handles {
            if let Some(handle) = handle
                && let Err(_e) = handle.join_timeout(join_timeout)
            {
                error!(
                    "{} thread panicked or failed to shut down within {:?}",
                    name, join_timeout
                );
                report.stalled.push(name);
            }
        }

        if report.is_clean() {
            info!("Station shut down cleanly");
        }
        report
    }
}

impl Drop for Station {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}
