//! UI 线程周期回调
//!
//! UI 线程不允许阻塞等待，因此光标采样由非阻塞的 [`PeriodicTimer::poll`] 驱动：
//! 事件循环每次迭代调用一次，到期时执行回调。

use crate::calibration::ScreenPoint;
use crate::cursor::{CursorReadout, CursorSampler};
use std::time::{Duration, Instant};

/// 光标位置提供者（由显示界面实现）
pub trait CursorProvider {
    /// 当前光标屏幕坐标；光标不在窗口内时返回 `None`
    fn cursor_position(&self) -> Option<ScreenPoint>;
}

impl<F> CursorProvider for F
where
    F: Fn() -> Option<ScreenPoint>,
{
    fn cursor_position(&self) -> Option<ScreenPoint> {
        self()
    }
}

/// 非阻塞周期定时器
///
/// 错过的周期不补发：一次 `poll` 最多触发一次，下一次到期时刻从当前时刻重新对齐。
#[derive(Debug, Clone)]
pub struct PeriodicTimer {
    period: Duration,
    next_due: Instant,
}

impl PeriodicTimer {
    /// 创建定时器，第一次到期时刻为 `start + period`
    pub fn new(period: Duration, start: Instant) -> Self {
        Self {
            period,
            next_due: start + period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// 检查是否到期；到期则推进下一次到期时刻并返回 `true`
    pub fn poll(&mut self, now: Instant) -> bool {
        if now < self.next_due {
            return false;
        }
        self.next_due += self.period;
        if self.next_due <= now {
            self.next_due = now + self.period;
        }
        true
    }

    /// 距离下一次到期的时间（已到期为 0）
    pub fn time_until_due(&self, now: Instant) -> Duration {
        self.next_due.saturating_duration_since(now)
    }
}

/// 光标采样定时器：周期定时器 + 光标提供者 + 采样器
pub struct CursorTimer<P> {
    timer: PeriodicTimer,
    provider: P,
    sampler: CursorSampler,
}

impl<P: CursorProvider> CursorTimer<P> {
    pub fn new(period: Duration, provider: P, sampler: CursorSampler) -> Self {
        Self {
            timer: PeriodicTimer::new(period, Instant::now()),
            provider,
            sampler,
        }
    }

    /// 到期时采样一次并返回读数，否则返回 `None`
    pub fn poll(&mut self, now: Instant) -> Option<CursorReadout> {
        if !self.timer.poll(now) {
            return None;
        }
        Some(self.sampler.sample(self.provider.cursor_position()))
    }

    pub fn time_until_due(&self, now: Instant) -> Duration {
        self.timer.time_until_due(now)
    }

    /// 采样器（用于转发点击事件）
    pub fn sampler(&self) -> &CursorSampler {
        &self.sampler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::{CalibrationMap, ImageRegion};
    use crate::mailbox::Mailbox;
    use crate::metrics::StationMetrics;
    use std::sync::Arc;

    #[test]
    fn test_timer_fires_once_per_period() {
        let start = Instant::now();
        let mut timer = PeriodicTimer::new(Duration::from_millis(50), start);

        assert!(!timer.poll(start));
        assert!(!timer.poll(start + Duration::from_millis(49)));
        assert!(timer.poll(start + Duration::from_millis(50)));
        assert!(!timer.poll(start + Duration::from_millis(60)));
        assert!(timer.poll(start + Duration::from_millis(100)));
    }

    #[test]
    fn test_timer_does_not_burst_after_stall() {
        let start = Instant::now();
        let mut timer = PeriodicTimer::new(Duration::from_millis(50), start);

        let late = start + Duration::from_millis(500);
        assert!(timer.poll(late));
        assert!(!timer.poll(late));
        assert_eq!(timer.time_until_due(late), Duration::from_millis(50));
    }

    #[test]
    fn test_cursor_timer_samples_provider() {
        let region = ImageRegion::default();
        let sampler = CursorSampler::new(
            region,
            Arc::new(CalibrationMap::for_region(&region)),
            Arc::new(Mailbox::new()),
            Box::new(|raw: u16| f64::from(raw)),
            Arc::new(StationMetrics::new()),
        );
        let provider = || Some(ScreenPoint::new(250, 45));
        let mut timer = CursorTimer::new(Duration::ZERO, provider, sampler);

        let readout = timer.poll(Instant::now()).unwrap();
        let pixel = readout.pixel.unwrap();
        assert_eq!((pixel.x, pixel.y), (10, 5));
        // 尚无帧集合：深度为 0，世界读数不可用
        assert_eq!(pixel.raw_depth, 0);
        assert!(readout.world.is_none());
    }
}
