//! 视觉帧数据结构
//!
//! - [`Image`]：可直接渲染的图像（RGB、深度可视化、检测叠加）
//! - [`DepthFrame`]：原始深度采样网格（行优先，`[y][x]`）
//! - [`FrameSet`]：一次采集周期产出的帧三元组 + 同周期的原始深度
//!
//! 所有像素缓冲区使用 `Arc<[u8]>` / `Arc<[u16]>`，快照克隆只增加引用计数。

use crate::error::StationError;
use std::sync::Arc;

/// 像素格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 8 位灰度
    Gray8,
    /// 24 位 RGB
    Rgb8,
    /// 32 位 RGBA
    Rgba8,
}

impl PixelFormat {
    /// 每像素字节数
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Gray8 => 1,
            Self::Rgb8 => 3,
            Self::Rgba8 => 4,
        }
    }
}

/// 可渲染图像
#[derive(Debug, Clone)]
pub struct Image {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Arc<[u8]>,
}

impl Image {
    /// 创建图像（不校验缓冲区长度，校验在组装 [`FrameSet`] 时进行）
    pub fn new(width: u32, height: u32, format: PixelFormat, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            width,
            height,
            format,
            data: data.into(),
        }
    }

    /// 全零图像
    pub fn blank(width: u32, height: u32, format: PixelFormat) -> Self {
        let len = width as usize * height as usize * format.bytes_per_pixel();
        Self::new(width, height, format, vec![0u8; len])
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// 原始像素字节
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// 缓冲区长度是否与声明尺寸一致，且图像非空
    pub fn is_well_formed(&self) -> bool {
        let expected = self.width as usize * self.height as usize * self.format.bytes_per_pixel();
        expected > 0 && self.data.len() == expected
    }
}

/// 原始深度帧
///
/// 采样值为传感器原始读数（未换算成毫米），`0` 表示无效/无数据。
#[derive(Debug, Clone)]
pub struct DepthFrame {
    width: u32,
    height: u32,
    samples: Arc<[u16]>,
    /// 是否存在任意非零采样（构造时计算一次）
    has_data: bool,
}

impl DepthFrame {
    /// 从行优先采样创建深度帧
    ///
    /// # 错误
    ///
    /// 采样数量与 `width * height` 不一致时返回 `MalformedFrame`。
    pub fn new(
        width: u32,
        height: u32,
        samples: impl Into<Arc<[u16]>>,
    ) -> Result<Self, StationError> {
        let samples = samples.into();
        let expected = width as usize * height as usize;
        if samples.len() != expected {
            return Err(StationError::MalformedFrame(format!(
                "depth grid has {} samples, expected {}x{}={}",
                samples.len(),
                width,
                height,
                expected
            )));
        }
        let has_data = samples.iter().any(|&s| s != 0);
        Ok(Self {
            width,
            height,
            samples,
            has_data,
        })
    }

    /// 全零深度帧（“尚无深度数据”）
    pub fn zeros(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            samples: vec![0u16; len].into(),
            has_data: false,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// 读取 `(x, y)` 处的原始采样，越界返回 `None`
    pub fn sample(&self, x: u32, y: u32) -> Option<u16> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.samples
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// 整帧是否存在非零采样
    pub fn has_data(&self) -> bool {
        self.has_data
    }
}

/// 显示通道（操作员可选）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoChannel {
    /// RGB 视频
    #[default]
    Rgb,
    /// 深度可视化
    Depth,
    /// 检测叠加
    Detect,
}

impl std::str::FromStr for VideoChannel {
    type Err = StationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rgb" | "video" => Ok(Self::Rgb),
            "depth" => Ok(Self::Depth),
            "detect" | "detection" => Ok(Self::Detect),
            other => Err(StationError::Config(format!("unknown video channel '{other}'"))),
        }
    }
}

/// 一次采集周期的帧集合
///
/// 三个可渲染图像与原始深度来自同一个采集周期 `cycle`，
/// 作为一个整体发布，消费者不可能看到不同周期混合的结果。
#[derive(Debug, Clone)]
pub struct FrameSet {
    cycle: u64,
    rgb: Image,
    depth: Image,
    detect: Image,
    depth_raw: DepthFrame,
}

impl FrameSet {
    /// 组装帧集合并校验
    ///
    /// # 错误
    ///
    /// 任一图像为空或缓冲区长度与尺寸不符，或原始深度网格与图像尺寸不一致时，
    /// 返回 `MalformedFrame`（致命）。
    pub fn new(
        cycle: u64,
        rgb: Image,
        depth: Image,
        detect: Image,
        depth_raw: DepthFrame,
    ) -> Result<Self, StationError> {
        for (name, image) in [("rgb", &rgb), ("depth", &depth), ("detect", &detect)] {
            if !image.is_well_formed() {
                return Err(StationError::MalformedFrame(format!(
                    "cycle {}: {} image {}x{} {:?} carries {} bytes",
                    cycle,
                    name,
                    image.width(),
                    image.height(),
                    image.format(),
                    image.data().len()
                )));
            }
            if (image.width(), image.height()) != (depth_raw.width(), depth_raw.height()) {
                return Err(StationError::MalformedFrame(format!(
                    "cycle {}: depth grid {}x{} does not match {}x{} {} image",
                    cycle,
                    depth_raw.width(),
                    depth_raw.height(),
                    image.width(),
                    image.height(),
                    name
                )));
            }
        }
        Ok(Self {
            cycle,
            rgb,
            depth,
            detect,
            depth_raw,
        })
    }

    /// 采集周期序号
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn rgb(&self) -> &Image {
        &self.rgb
    }

    pub fn depth(&self) -> &Image {
        &self.depth
    }

    pub fn detect(&self) -> &Image {
        &self.detect
    }

    /// 同周期的原始深度帧
    pub fn depth_raw(&self) -> &DepthFrame {
        &self.depth_raw
    }

    /// 按显示通道选择图像
    pub fn channel(&self, channel: VideoChannel) -> &Image {
        match channel {
            VideoChannel::Rgb => &self.rgb,
            VideoChannel::Depth => &self.depth,
            VideoChannel::Detect => &self.detect,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_well_formed() {
        let image = Image::blank(4, 2, PixelFormat::Rgb8);
        assert!(image.is_well_formed());
        assert_eq!(image.data().len(), 24);

        let short = Image::new(4, 2, PixelFormat::Rgb8, vec![0u8; 10]);
        assert!(!short.is_well_formed());

        let empty = Image::new(0, 0, PixelFormat::Gray8, Vec::<u8>::new());
        assert!(!empty.is_well_formed());
    }

    #[test]
    fn test_depth_frame_sample_and_bounds() {
        let frame = DepthFrame::new(3, 2, vec![1u16, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(frame.sample(0, 0), Some(1));
        assert_eq!(frame.sample(2, 1), Some(6));
        assert_eq!(frame.sample(3, 0), None);
        assert_eq!(frame.sample(0, 2), None);
        assert!(frame.has_data());
    }

    #[test]
    fn test_depth_frame_rejects_wrong_length() {
        let err = DepthFrame::new(3, 2, vec![0u16; 5]).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_zero_depth_has_no_data() {
        assert!(!DepthFrame::zeros(8, 8).has_data());
        assert!(!DepthFrame::new(2, 1, vec![0u16, 0]).unwrap().has_data());
    }

    #[test]
    fn test_frame_set_rejects_malformed_image() {
        let good = Image::blank(2, 2, PixelFormat::Rgb8);
        let bad = Image::new(2, 2, PixelFormat::Gray8, vec![0u8; 3]);
        let err = FrameSet::new(7, good.clone(), bad, good, DepthFrame::zeros(2, 2)).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("cycle 7") && msg.contains("depth"), "{msg}");
    }

    #[test]
    fn test_frame_set_rejects_depth_grid_size_mismatch() {
        let image = Image::blank(4, 3, PixelFormat::Rgb8);
        let depth = DepthFrame::new(2, 2, vec![500u16; 4]).unwrap();
        let err = FrameSet::new(1, image.clone(), image.clone(), image, depth).unwrap_err();
        assert!(matches!(err, StationError::MalformedFrame(_)));
        assert!(err.is_fatal());
        assert!(err.to_string().contains("depth grid 2x2"), "{err}");
    }

    #[test]
    fn test_channel_selection() {
        let rgb = Image::blank(1, 1, PixelFormat::Rgb8);
        let depth = Image::blank(1, 1, PixelFormat::Gray8);
        let detect = Image::blank(1, 1, PixelFormat::Rgba8);
        let set = FrameSet::new(1, rgb, depth, detect, DepthFrame::zeros(1, 1)).unwrap();

        assert_eq!(set.channel(VideoChannel::Rgb).format(), PixelFormat::Rgb8);
        assert_eq!(set.channel(VideoChannel::Depth).format(), PixelFormat::Gray8);
        assert_eq!(set.channel(VideoChannel::Detect).format(), PixelFormat::Rgba8);
    }

    #[test]
    fn test_video_channel_from_str() {
        assert_eq!("RGB".parse::<VideoChannel>().unwrap(), VideoChannel::Rgb);
        assert_eq!("depth".parse::<VideoChannel>().unwrap(), VideoChannel::Depth);
        assert_eq!("detect".parse::<VideoChannel>().unwrap(), VideoChannel::Detect);
        assert!("thermal".parse::<VideoChannel>().is_err());
    }
}
