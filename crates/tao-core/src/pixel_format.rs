//! 像素格式定义.
//!
//! 编码器输入 (`incolour`) 与解码器输出 (`outcolour`) 可选的像素排列方式.

use std::fmt;
use std::str::FromStr;

use crate::TaoError;

/// 像素格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum PixelFormat {
    /// 未指定
    None,
    /// YUV 4:2:0 平面格式, 8 位 (H.264 baseline 原生格式)
    Yuv420p,
    /// RGB 各 8 位, 打包
    Rgb24,
}

impl PixelFormat {
    /// 平面数量
    pub const fn plane_count(&self) -> u32 {
        match self {
            Self::None => 0,
            Self::Yuv420p => 3,
            Self::Rgb24 => 1,
        }
    }

    /// 是否为平面格式
    pub const fn is_planar(&self) -> bool {
        matches!(self, Self::Yuv420p)
    }

    /// 计算指定平面每行的字节数
    ///
    /// 格式为 None 或平面索引超出范围时返回 `None`.
    /// 4:2:0 色度宽度向上取整.
    pub fn plane_linesize(&self, plane: usize, width: u32) -> Option<usize> {
        if plane >= self.plane_count() as usize {
            return None;
        }
        let w = width as usize;
        match self {
            Self::Yuv420p if plane == 0 => Some(w),
            Self::Yuv420p => Some(w.div_ceil(2)),
            Self::Rgb24 => Some(w * 3),
            Self::None => None,
        }
    }

    /// 计算指定平面的行数
    pub fn plane_height(&self, plane: usize, height: u32) -> Option<usize> {
        if plane >= self.plane_count() as usize {
            return None;
        }
        let h = height as usize;
        match self {
            Self::Yuv420p if plane == 0 => Some(h),
            Self::Yuv420p => Some(h.div_ceil(2)),
            Self::Rgb24 => Some(h),
            Self::None => None,
        }
    }

    /// 计算整帧的字节数
    pub fn frame_size(&self, width: u32, height: u32) -> Option<usize> {
        if *self == Self::None {
            return None;
        }
        let mut total = 0usize;
        for plane in 0..self.plane_count() as usize {
            total += self.plane_linesize(plane, width)? * self.plane_height(plane, height)?;
        }
        Some(total)
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Yuv420p => "yuv420p",
            Self::Rgb24 => "rgb24",
        };
        write!(f, "{name}")
    }
}

impl FromStr for PixelFormat {
    type Err = TaoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yuv420p" | "yuv" | "i420" => Ok(Self::Yuv420p),
            "rgb24" | "rgb" => Ok(Self::Rgb24),
            other => Err(TaoError::InvalidArgument(format!(
                "未知像素格式: {other}"
            ))),
        }
    }
}
