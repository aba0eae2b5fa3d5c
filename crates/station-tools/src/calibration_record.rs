//! # 标定记录
//!
//! 保存一次标定的全部结果：点击像素、对应世界坐标和完整坐标表。
//! 重启后加载即可恢复标定，无需重新点击。

use crate::ToolsError;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// 文件魔数
const MAGIC: &[u8; 8] = b"ARMCALIB";

/// 当前格式版本
const VERSION: u8 = 1;

/// 标定记录 v1
///
/// 文件格式：
/// ```text
/// [MAGIC: 8 bytes]
/// [Version: 1 byte]
/// [Data: bincode serialized CalibrationRecord]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    /// 图像宽度（像素）
    pub width: u32,

    /// 图像高度（像素）
    pub height: u32,

    /// 操作员点击的像素坐标
    pub pixel_points: Vec<[f64; 2]>,

    /// 每个点击对应的世界坐标（毫米）
    pub world_points: Vec<[f64; 2]>,

    /// 坐标表，行优先，`width * height` 项
    pub table: Vec<[f64; 2]>,
}

impl CalibrationRecord {
    /// 创建记录并校验尺寸
    pub fn new(
        width: u32,
        height: u32,
        pixel_points: Vec<[f64; 2]>,
        world_points: Vec<[f64; 2]>,
        table: Vec<[f64; 2]>,
    ) -> Result<Self, ToolsError> {
        let record = Self {
            width,
            height,
            pixel_points,
            world_points,
            table,
        };
        record.validate()?;
        Ok(record)
    }

    /// 校验点对数量和坐标表尺寸
    pub fn validate(&self) -> Result<(), ToolsError> {
        if self.pixel_points.len() != self.world_points.len() {
            return Err(ToolsError::InvalidRecord(format!(
                "{} pixel points but {} world points",
                self.pixel_points.len(),
                self.world_points.len()
            )));
        }

        let expected = self.width as usize * self.height as usize;
        if self.table.len() != expected {
            return Err(ToolsError::InvalidRecord(format!(
                "table has {} entries, expected {}x{} = {}",
                self.table.len(),
                self.width,
                self.height,
                expected
            )));
        }

        Ok(())
    }

    /// 查询像素对应的世界坐标
    pub fn world_at(&self, x: u32, y: u32) -> Option<[f64; 2]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.table
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// 保存到文件
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ToolsError> {
        self.validate()?;

        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::new(file);

        writer.write_all(MAGIC)?;
        writer.write_all(&[VERSION])?;

        let data = bincode::serialize(self)?;
        writer.write_all(&data)?;

        writer.flush()?;
        Ok(())
    }

    /// 从文件加载
    ///
    /// # 错误
    ///
    /// 魔数不匹配、版本不支持或内容不一致时返回 [`ToolsError::InvalidRecord`]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ToolsError> {
        let file = File::open(path.as_ref())?;
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; 8];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(ToolsError::InvalidRecord("magic mismatch".to_string()));
        }

        let mut version = [0u8; 1];
        reader.read_exact(&mut version)?;
        if version[0] != VERSION {
            return Err(ToolsError::InvalidRecord(format!(
                "unsupported version {}",
                version[0]
            )));
        }

        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;

        let record: CalibrationRecord = bincode::deserialize(&data)?;
        record.validate()?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> CalibrationRecord {
        let (w, h) = (4u32, 3u32);
        let table = (0..h)
            .flat_map(|y| (0..w).map(move |x| [f64::from(x) * 2.0, f64::from(y) * -2.0]))
            .collect();
        CalibrationRecord::new(
            w,
            h,
            vec![[0.0, 0.0], [3.0, 0.0], [0.0, 2.0]],
            vec![[0.0, 0.0], [6.0, 0.0], [0.0, -4.0]],
            table,
        )
        .unwrap()
    }

    #[test]
    fn test_world_at() {
        let record = sample_record();
        assert_eq!(record.world_at(3, 2), Some([6.0, -4.0]));
        assert_eq!(record.world_at(4, 0), None);
        assert_eq!(record.world_at(0, 3), None);
    }

    #[test]
    fn test_rejects_wrong_table_size() {
        let err = CalibrationRecord::new(4, 3, vec![], vec![], vec![[0.0, 0.0]; 11]).unwrap_err();
        assert!(matches!(err, ToolsError::InvalidRecord(_)));
    }

    #[test]
    fn test_rejects_unpaired_points() {
        let err =
            CalibrationRecord::new(1, 1, vec![[0.0, 0.0]], vec![], vec![[0.0, 0.0]]).unwrap_err();
        assert!(matches!(err, ToolsError::InvalidRecord(_)));
    }

    #[test]
    fn test_save_and_load() {
        let temp_file = tempfile::NamedTempFile::new().unwrap();
        let record = sample_record();

        record.save(temp_file.path()).unwrap();
        let loaded = CalibrationRecord::load(temp_file.path()).unwrap();

        assert_eq!(loaded, record);
    }

    #[test]
    fn test_load_rejects_bad_magic() {
        let temp_file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(temp_file.path(), b"NOTCALIB\x01rest").unwrap();

        let err = CalibrationRecord::load(temp_file.path()).unwrap_err();
        assert!(err.to_string().contains("magic mismatch"));
    }

    #[test]
    fn test_load_rejects_future_version() {
        let temp_file = tempfile::NamedTempFile::new().unwrap();
        let mut bytes = MAGIC.to_vec();
        bytes.push(VERSION + 1);
        std::fs::write(temp_file.path(), bytes).unwrap();

        let err = CalibrationRecord::load(temp_file.path()).unwrap_err();
        assert!(err.to_string().contains("unsupported version"));
    }

    #[test]
    fn test_load_truncated_file() {
        let temp_file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(temp_file.path(), b"ARM").unwrap();

        let err = CalibrationRecord::load(temp_file.path()).unwrap_err();
        assert!(matches!(err, ToolsError::Io(_)));
    }
}
