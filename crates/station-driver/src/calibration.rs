//! 像素 → 世界坐标标定
//!
//! - [`ImageRegion`]：屏幕坐标与传感器图像坐标之间的固定偏移和有效范围
//! - [`CoordTable`]：逐像素的世界坐标查找表（完整标定后才存在）
//! - [`CalibrationMap`]：查找表 + 点击邮箱，由编排层持有，以 `Arc` 交给标定流程
//!
//! 标定前 `is_calibrated() == false`，所有世界坐标读取都返回 `None`。

use crate::error::StationError;
use crate::mailbox::Slot;
use arc_swap::ArcSwapOption;
use std::sync::Arc;

/// 屏幕坐标（显示界面坐标系，可为负）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenPoint {
    pub x: i32,
    pub y: i32,
}

impl ScreenPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// 传感器图像像素坐标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelCoord {
    pub x: u32,
    pub y: u32,
}

impl PixelCoord {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// 世界坐标（平面，单位与标定流程一致，通常为毫米）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldXY {
    pub x: f64,
    pub y: f64,
}

/// 图像在显示界面中的区域
///
/// 有效范围为半开区间 `[origin_x, origin_x + width) × [origin_y, origin_y + height)`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageRegion {
    /// 图像左上角屏幕 X
    pub origin_x: i32,
    /// 图像左上角屏幕 Y
    pub origin_y: i32,
    /// 图像宽度（像素）
    pub width: u32,
    /// 图像高度（像素）
    pub height: u32,
}

impl Default for ImageRegion {
    fn default() -> Self {
        Self {
            origin_x: 240,
            origin_y: 40,
            width: 640,
            height: 480,
        }
    }
}

impl ImageRegion {
    /// 屏幕坐标 → 图像坐标
    ///
    /// 减去图像原点偏移（整数减法）；落在有效范围外返回 `None`。
    pub fn to_image(&self, point: ScreenPoint) -> Option<PixelCoord> {
        let dx = i64::from(point.x) - i64::from(self.origin_x);
        let dy = i64::from(point.y) - i64::from(self.origin_y);
        if dx < 0 || dy < 0 || dx >= i64::from(self.width) || dy >= i64::from(self.height) {
            return None;
        }
        Some(PixelCoord::new(dx as u32, dy as u32))
    }

    /// 屏幕坐标是否位于图像内
    pub fn contains(&self, point: ScreenPoint) -> bool {
        self.to_image(point).is_some()
    }
}

/// 逐像素世界坐标表
///
/// 内部按行优先存储，对外以 `(x, y)` 像素坐标访问。
#[derive(Debug, Clone, PartialEq)]
pub struct CoordTable {
    width: u32,
    height: u32,
    entries: Vec<[f64; 2]>,
}

impl CoordTable {
    /// 从行优先条目创建
    ///
    /// # 错误
    ///
    /// 条目数量不等于 `width * height`，或包含非有限值时返回 `Calibration`。
    pub fn new(width: u32, height: u32, entries: Vec<[f64; 2]>) -> Result<Self, StationError> {
        let expected = width as usize * height as usize;
        if expected == 0 || entries.len() != expected {
            return Err(StationError::Calibration(format!(
                "table has {} entries, expected {}x{}",
                entries.len(),
                width,
                height
            )));
        }
        if let Some(pos) = entries.iter().position(|e| !e[0].is_finite() || !e[1].is_finite()) {
            return Err(StationError::Calibration(format!(
                "non-finite world coordinate at pixel ({}, {})",
                pos % width as usize,
                pos / width as usize
            )));
        }
        Ok(Self {
            width,
            height,
            entries,
        })
    }

    /// 按像素函数生成完整表
    pub fn from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> [f64; 2]) -> Self {
        let mut entries = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                entries.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            entries,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// 行优先条目（用于持久化）
    pub fn entries(&self) -> &[[f64; 2]] {
        &self.entries
    }

    /// 查找像素对应的世界坐标
    pub fn world_at(&self, pixel: PixelCoord) -> Option<WorldXY> {
        if pixel.x >= self.width || pixel.y >= self.height {
            return None;
        }
        let [x, y] = self.entries[pixel.y as usize * self.width as usize + pixel.x as usize];
        Some(WorldXY { x, y })
    }
}

/// 标定映射
///
/// # 线程模型
///
/// - 查找表：`ArcSwapOption`，标定流程整体安装（原子替换），UI 线程无锁读取
/// - 点击邮箱：单槽 Latest-Wins，操作员输入写入，标定流程 `take_click()` 消费
pub struct CalibrationMap {
    width: u32,
    height: u32,
    table: ArcSwapOption<CoordTable>,
    clicks: Slot<PixelCoord>,
}

impl CalibrationMap {
    /// 创建未标定的映射，`width × height` 为传感器图像尺寸
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            table: ArcSwapOption::empty(),
            clicks: Slot::new(),
        }
    }

    /// 按图像区域尺寸创建
    pub fn for_region(region: &ImageRegion) -> Self {
        Self::new(region.width, region.height)
    }

    /// 图像尺寸
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// 是否已完成标定
    pub fn is_calibrated(&self) -> bool {
        self.table.load().is_some()
    }

    /// 安装完整的查找表（标定完成）
    ///
    /// # 错误
    ///
    /// 表尺寸与图像尺寸不一致时返回 `Calibration`，原有标定保持不变。
    pub fn install(&self, table: CoordTable) -> Result<(), StationError> {
        if table.width() != self.width || table.height() != self.height {
            return Err(StationError::Calibration(format!(
                "table is {}x{}, image is {}x{}",
                table.width(),
                table.height(),
                self.width,
                self.height
            )));
        }
        self.table.store(Some(Arc::new(table)));
        Ok(())
    }

    /// 作废当前标定（重新标定开始时调用）
    pub fn invalidate(&self) {
        self.table.store(None);
    }

    /// 当前查找表（未标定时为 `None`）
    pub fn table(&self) -> Option<Arc<CoordTable>> {
        self.table.load_full()
    }

    /// 查找世界坐标；未标定时总是 `None`
    pub fn world_at(&self, pixel: PixelCoord) -> Option<WorldXY> {
        self.table.load_full()?.world_at(pixel)
    }

    /// 记录一次点击（覆盖未消费的上一次点击）
    ///
    /// # 返回
    ///
    /// 如果覆盖了未消费的点击，返回 `true`
    pub fn record_click(&self, pixel: PixelCoord) -> bool {
        self.clicks.put(pixel)
    }

    /// 消费待处理的点击（`newClickPending` 随之清除）
    pub fn take_click(&self) -> Option<PixelCoord> {
        self.clicks.take()
    }

    /// 是否有待处理的点击
    pub fn has_pending_click(&self) -> bool {
        self.clicks.is_pending()
    }

    /// 查看待处理的点击但不消费
    pub fn pending_click(&self) -> Option<PixelCoord> {
        self.clicks.peek()
    }

    /// 未消费即被覆盖的点击数
    pub fn clicks_overwritten(&self) -> u64 {
        self.clicks.overwrites()
    }
}
