//! 工作站运行指标
//!
//! 零开销的原子计数器，用于监控各循环的健康状态。
//! 所有计数器都使用原子操作，可以在任何线程安全地读取，不会引入锁竞争。

use std::sync::atomic::{AtomicU64, Ordering};

/// 工作站实时指标
///
/// # 使用示例
///
/// ```rust
/// use station_driver::StationMetrics;
/// use std::sync::Arc;
/// use std::sync::atomic::Ordering;
///
/// let metrics = Arc::new(StationMetrics::default());
///
/// // 在采集线程中更新指标
/// metrics.sensor_cycles.fetch_add(1, Ordering::Relaxed);
///
/// // 在主线程中读取快照
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.sensor_cycles, 1);
/// ```
#[derive(Debug, Default)]
pub struct StationMetrics {
    /// 成功发布的帧集合数
    pub sensor_cycles: AtomicU64,

    /// 采集/转换失败次数（跳过周期后重试）
    pub capture_errors: AtomicU64,

    /// 未被显示消费即被覆盖的帧集合数
    ///
    /// 如果这个值快速增长，说明显示刷新跟不上采集速度（这是预期行为，不是错误）。
    /// 采集线程按增量累加，[`reset`](Self::reset) 之后从零重新计数。
    pub frames_overwritten: AtomicU64,

    /// 完成的控制周期数
    pub control_cycles: AtomicU64,

    /// 执行器瞬时错误次数（已吸收进状态消息）
    pub actuator_errors: AtomicU64,

    /// 在急停状态下运行的控制周期数
    pub estop_cycles: AtomicU64,

    /// 急停期间被拦截的运动指令数
    pub blocked_motion_commands: AtomicU64,

    /// 急停期间被拒绝的状态切换请求数
    pub rejected_transitions: AtomicU64,

    /// 完成的遥测周期数
    pub telemetry_cycles: AtomicU64,

    /// 周期超时次数（单个周期耗时超过目标周期）
    pub cycle_overruns: AtomicU64,

    /// 未被标定流程消费即被覆盖的点击数
    pub clicks_overwritten: AtomicU64,
}

impl StationMetrics {
    /// 创建新的指标实例（所有计数器初始化为 0）
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取指标快照
    ///
    /// 各计数器分别以 `Relaxed` 读取，不同计数器之间可能有微小的时间差。
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sensor_cycles: self.sensor_cycles.load(Ordering::Relaxed),
            capture_errors: self.capture_errors.load(Ordering::Relaxed),
            frames_overwritten: self.frames_overwritten.load(Ordering::Relaxed),
            control_cycles: self.control_cycles.load(Ordering::Relaxed),
            actuator_errors: self.actuator_errors.load(Ordering::Relaxed),
            estop_cycles: self.estop_cycles.load(Ordering::Relaxed),
            blocked_motion_commands: self.blocked_motion_commands.load(Ordering::Relaxed),
            rejected_transitions: self.rejected_transitions.load(Ordering::Relaxed),
            telemetry_cycles: self.telemetry_cycles.load(Ordering::Relaxed),
            cycle_overruns: self.cycle_overruns.load(Ordering::Relaxed),
            clicks_overwritten: self.clicks_overwritten.load(Ordering::Relaxed),
        }
    }

    /// 重置所有计数器
    pub fn reset(&self) {
        self.sensor_cycles.store(0, Ordering::Relaxed);
        self.capture_errors.store(0, Ordering::Relaxed);
        self.frames_overwritten.store(0, Ordering::Relaxed);
        self.control_cycles.store(0, Ordering::Relaxed);
        self.actuator_errors.store(0, Ordering::Relaxed);
        self.estop_cycles.store(0, Ordering::Relaxed);
        self.blocked_motion_commands.store(0, Ordering::Relaxed);
        self.rejected_transitions.store(0, Ordering::Relaxed);
        self.telemetry_cycles.store(0, Ordering::Relaxed);
        self.cycle_overruns.store(0, Ordering::Relaxed);
        self.clicks_overwritten.store(0, Ordering::Relaxed);
    }
}

/// 指标快照（不可变，用于读取）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub sensor_cycles: u64,
    pub capture_errors: u64,
    pub frames_overwritten: u64,
    pub control_cycles: u64,
    pub actuator_errors: u64,
    pub estop_cycles: u64,
    pub blocked_motion_commands: u64,
    pub rejected_transitions: u64,
    pub telemetry_cycles: u64,
    pub cycle_overruns: u64,
    pub clicks_overwritten: u64,
}

impl MetricsSnapshot {
    /// 采集失败率（百分比）
    ///
    /// 返回 0.0 到 100.0 之间的值。没有任何采集尝试时返回 0.0。
    pub fn capture_error_rate(&self) -> f64 {
        let attempts = self.sensor_cycles + self.capture_errors;
        if attempts == 0 {
            return 0.0;
        }
        (self.capture_errors as f64 / attempts as f64) * 100.0
    }

    /// 帧覆盖率（百分比）
    pub fn frame_overwrite_rate(&self) -> f64 {
        if self.sensor_cycles == 0 {
            return 0.0;
        }
        (self.frames_overwritten as f64 / self.sensor_cycles as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_metrics_default() {
        let snapshot = StationMetrics::new().snapshot();
        assert_eq!(snapshot, MetricsSnapshot::default());
        assert_eq!(snapshot.capture_error_rate(), 0.0);
        assert_eq!(snapshot.frame_overwrite_rate(), 0.0);
    }

    #[test]
    fn test_metrics_rates() {
        let metrics = StationMetrics::new();
        metrics.sensor_cycles.fetch_add(90, Ordering::Relaxed);
        metrics.capture_errors.fetch_add(10, Ordering::Relaxed);
        metrics.frames_overwritten.fetch_add(45, Ordering::Relaxed);

        let snapshot = metrics.snapshot();
        assert!((snapshot.capture_error_rate() - 10.0).abs() < 1e-9);
        assert!((snapshot.frame_overwrite_rate() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_metrics_reset() {
        let metrics = StationMetrics::new();
        metrics.control_cycles.fetch_add(100, Ordering::Relaxed);
        metrics.estop_cycles.fetch_add(10, Ordering::Relaxed);
        metrics.reset();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_metrics_concurrent_increment() {
        let metrics = Arc::new(StationMetrics::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let metrics = metrics.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        metrics.telemetry_cycles.fetch_add(1, Ordering::Relaxed);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(metrics.snapshot().telemetry_cycles, 4000);
    }
}
