//! # 仿射标定拟合
//!
//! 由操作员点击的像素点和已知世界坐标，最小二乘求解
//!
//! ```text
//! [x]   [a b c] [u]
//! [y] = [d e f] [v]
//!               [1]
//! ```
//!
//! 再把映射栅格化成逐像素坐标表。

use crate::ToolsError;
use nalgebra::{DMatrix, Matrix2x3, Vector3};

/// 判定点集退化（共线）的相对奇异值阈值
const RANK_TOLERANCE: f64 = 1e-9;

/// 像素 → 世界坐标仿射映射
#[derive(Debug, Clone, PartialEq)]
pub struct AffineFit {
    coefficients: Matrix2x3<f64>,
}

impl AffineFit {
    /// 最小二乘求解
    ///
    /// # 参数
    ///
    /// - `pixels`: 像素坐标 `[u, v]`
    /// - `world`: 对应的世界坐标 `[x, y]`（毫米）
    ///
    /// # 错误
    ///
    /// 点数少于 3、数量不一致或所有点共线时返回 [`ToolsError::Fit`]
    pub fn solve(pixels: &[[f64; 2]], world: &[[f64; 2]]) -> Result<Self, ToolsError> {
        if pixels.len() != world.len() {
            return Err(ToolsError::Fit(format!(
                "{} pixel points but {} world points",
                pixels.len(),
                world.len()
            )));
        }
        let n = pixels.len();
        if n < 3 {
            return Err(ToolsError::Fit(format!(
                "need at least 3 points, got {n}"
            )));
        }

        let a = DMatrix::from_fn(n, 3, |r, c| match c {
            0 => pixels[r][0],
            1 => pixels[r][1],
            _ => 1.0,
        });
        let b = DMatrix::from_fn(n, 2, |r, c| world[r][c]);

        let svd = a.svd(true, true);
        let largest = svd.singular_values.max();
        if svd.rank(largest * RANK_TOLERANCE) < 3 {
            return Err(ToolsError::Fit("points are collinear".to_string()));
        }

        let x = svd
            .solve(&b, largest * RANK_TOLERANCE)
            .map_err(|e| ToolsError::Fit(e.to_string()))?;

        Ok(Self {
            coefficients: Matrix2x3::from_fn(|r, c| x[(c, r)]),
        })
    }

    /// 映射单个像素
    pub fn apply(&self, pixel: [f64; 2]) -> [f64; 2] {
        let world = self.coefficients * Vector3::new(pixel[0], pixel[1], 1.0);
        [world.x, world.y]
    }

    /// 拟合残差的均方根（毫米）
    pub fn rms_error(&self, pixels: &[[f64; 2]], world: &[[f64; 2]]) -> f64 {
        let n = pixels.len().min(world.len());
        if n == 0 {
            return 0.0;
        }
        let sum: f64 = pixels
            .iter()
            .zip(world)
            .map(|(p, w)| {
                let [x, y] = self.apply(*p);
                (x - w[0]).powi(2) + (y - w[1]).powi(2)
            })
            .sum();
        (sum / n as f64).sqrt()
    }

    /// 生成 `width * height` 的行优先坐标表
    pub fn rasterize(&self, width: u32, height: u32) -> Vec<[f64; 2]> {
        let mut table = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                table.push(self.apply([f64::from(x), f64::from(y)]));
            }
        }
        table
    }
}
