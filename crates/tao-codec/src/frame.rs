//! 原始视频帧 (Frame).

use tao_core::PixelFormat;

/// 视频帧
///
/// 多平面存储, 例如 YUV420P 有 Y, U, V 三个平面, RGB24 只有一个打包平面.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// 各平面的像素数据
    pub data: Vec<Vec<u8>>,
    /// 各平面每行的字节数 (linesize / stride)
    pub linesize: Vec<usize>,
    /// 宽度 (像素)
    pub width: u32,
    /// 高度 (像素)
    pub height: u32,
    /// 像素格式
    pub pixel_format: PixelFormat,
    /// 显示时间戳 (帧序号)
    pub pts: i64,
    /// 是否为关键帧
    pub is_keyframe: bool,
    /// 图片类型
    pub picture_type: PictureType,
}

impl VideoFrame {
    /// 创建像素全零的视频帧, 各平面按紧凑行宽分配
    pub fn new(width: u32, height: u32, pixel_format: PixelFormat) -> Self {
        let plane_count = pixel_format.plane_count() as usize;
        let mut data = Vec::with_capacity(plane_count);
        let mut linesize = Vec::with_capacity(plane_count);
        for plane in 0..plane_count {
            let stride = pixel_format.plane_linesize(plane, width).unwrap_or(0);
            let rows = pixel_format.plane_height(plane, height).unwrap_or(0);
            data.push(vec![0u8; stride * rows]);
            linesize.push(stride);
        }
        Self {
            data,
            linesize,
            width,
            height,
            pixel_format,
            pts: 0,
            is_keyframe: false,
            picture_type: PictureType::None,
        }
    }
}

/// 图片类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PictureType {
    /// 未指定
    #[default]
    None,
    /// I 帧 (帧内编码)
    I,
    /// P 帧 (前向预测)
    P,
}
