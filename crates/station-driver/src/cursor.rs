//! 光标/标定采样
//!
//! 在 UI 线程的周期定时器中运行，把光标屏幕坐标映射为像素读数和世界坐标读数，
//! 并把操作员点击写入标定点击邮箱。
//!
//! 处理步骤：
//! 1. 屏幕坐标减去图像原点偏移；越界则两个读数都不可用
//! 2. 已标定时查找世界平面坐标
//! 3. 从同一帧集合的原始深度中取样，换算为毫米
//! 4. 像素读数总是发布；世界读数只在已标定且深度帧有数据时发布

use crate::calibration::{CalibrationMap, ImageRegion, PixelCoord, ScreenPoint};
use crate::frame::FrameSet;
use crate::mailbox::Mailbox;
use crate::metrics::StationMetrics;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{debug, trace};

/// 不可用读数的显示文本
pub const UNAVAILABLE_TEXT: &str = "(-,-,-)";

/// 深度换算（传感器相关，原始读数 → 毫米）
pub trait DepthConverter: Send + Sync {
    fn raw_to_mm(&self, raw: u16) -> f64;
}

impl<F> DepthConverter for F
where
    F: Fn(u16) -> f64 + Send + Sync,
{
    fn raw_to_mm(&self, raw: u16) -> f64 {
        self(raw)
    }
}

/// 像素读数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelReadout {
    pub x: u32,
    pub y: u32,
    /// 原始深度读数（无深度数据时为 0）
    pub raw_depth: u16,
}

/// 世界坐标读数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldReadout {
    pub x: f64,
    pub y: f64,
    pub z_mm: f64,
}

/// 一次光标采样结果
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CursorReadout {
    pub pixel: Option<PixelReadout>,
    pub world: Option<WorldReadout>,
}

impl CursorReadout {
    /// 两个读数都不可用
    pub const UNAVAILABLE: Self = Self {
        pixel: None,
        world: None,
    };

    /// 像素读数文本 `(x,y,raw)`
    pub fn pixel_text(&self) -> String {
        match self.pixel {
            Some(p) => format!("({},{},{})", p.x, p.y, p.raw_depth),
            None => UNAVAILABLE_TEXT.to_string(),
        }
    }

    /// 世界读数文本 `(x,y,z)`，保留到整数
    pub fn world_text(&self) -> String {
        match self.world {
            Some(w) => format!("({:.0},{:.0},{:.0})", w.x, w.y, w.z_mm),
            None => UNAVAILABLE_TEXT.to_string(),
        }
    }
}

/// 光标/标定采样器
///
/// 只读取已发布的快照，不修改任何共享状态（点击邮箱除外）。
pub struct CursorSampler {
    region: ImageRegion,
    calibration: Arc<CalibrationMap>,
    frames: Arc<Mailbox<FrameSet>>,
    depth: Box<dyn DepthConverter>,
    readouts: Arc<Mailbox<CursorReadout>>,
    metrics: Arc<StationMetrics>,
}

impl CursorSampler {
    pub fn new(
        region: ImageRegion,
        calibration: Arc<CalibrationMap>,
        frames: Arc<Mailbox<FrameSet>>,
        depth: Box<dyn DepthConverter>,
        metrics: Arc<StationMetrics>,
    ) -> Self {
        Self {
            region,
            calibration,
            frames,
            depth,
            readouts: Arc::new(Mailbox::new()),
            metrics,
        }
    }

    pub fn region(&self) -> &ImageRegion {
        &self.region
    }

    /// 读数邮箱（显示界面订阅）
    pub fn readouts(&self) -> Arc<Mailbox<CursorReadout>> {
        self.readouts.clone()
    }

    /// 计算并发布一次读数
    ///
    /// `cursor == None` 表示光标不在窗口内。
    pub fn sample(&self, cursor: Option<ScreenPoint>) -> CursorReadout {
        let readout = match cursor.and_then(|p| self.region.to_image(p)) {
            Some(pixel) => self.readout_at(pixel),
            None => CursorReadout::UNAVAILABLE,
        };
        self.readouts.publish(readout);
        readout
    }

    fn readout_at(&self, pixel: PixelCoord) -> CursorReadout {
        let frames = self.frames.latest();
        let depth = frames.as_ref().map(|envelope| envelope.value.depth_raw());

        let sample = depth.and_then(|d| d.sample(pixel.x, pixel.y));
        let raw_depth = sample.unwrap_or(0);
        let depth_available = depth.is_some_and(|d| d.has_data());

        // 深度网格覆盖不到的像素没有世界坐标
        let world = match sample {
            Some(raw) if depth_available => {
                self.calibration.world_at(pixel).map(|xy| WorldReadout {
                    x: xy.x,
                    y: xy.y,
                    z_mm: self.depth.raw_to_mm(raw),
                })
            },
            _ => None,
        };

        trace!(
            "Cursor at pixel ({}, {}), raw depth {}, world {}",
            pixel.x,
            pixel.y,
            raw_depth,
            if world.is_some() { "available" } else { "unavailable" }
        );

        CursorReadout {
            pixel: Some(PixelReadout {
                x: pixel.x,
                y: pixel.y,
                raw_depth,
            }),
            world,
        }
    }

    /// 处理操作员点击
    ///
    /// 图像内的点击写入点击邮箱（覆盖未消费的上一次点击），返回图像坐标；
    /// 图像外的点击被忽略。
    pub fn on_click(&self, point: ScreenPoint) -> Option<PixelCoord> {
        let Some(pixel) = self.region.to_image(point) else {
            trace!("Ignoring click outside image at ({}, {})", point.x, point.y);
            return None;
        };
        if self.calibration.record_click(pixel) {
            self.metrics.clicks_overwritten.fetch_add(1, Ordering::Relaxed);
        }
        debug!("Click recorded at pixel ({}, {})", pixel.x, pixel.y);
        Some(pixel)
    }
}
