//! 编解码器参数.
//!
//! 打开编解码器时传入的配置信息. 除结构化字段外, `options` 中的
//! 键值对原样转交给具体编解码器的参数表 (如 `H264Config`).

use tao_core::PixelFormat;

use crate::codec_id::CodecId;

/// 编解码器参数
#[derive(Debug, Clone)]
pub struct CodecParameters {
    /// 编解码器标识
    pub codec_id: CodecId,
    /// 额外数据 (如带外传输的 SPS/PPS)
    pub extra_data: Vec<u8>,
    /// 码率 (bits/s), 0 表示未指定
    pub bit_rate: u64,
    /// 视频参数
    pub video: VideoCodecParams,
    /// 编解码器专有参数 (键, 值)
    pub options: Vec<(String, String)>,
}

/// 视频编解码器参数
#[derive(Debug, Clone)]
pub struct VideoCodecParams {
    /// 宽度 (像素)
    pub width: u32,
    /// 高度 (像素)
    pub height: u32,
    /// 像素格式
    pub pixel_format: PixelFormat,
    /// 帧率 (分子, 分母)
    pub frame_rate: (u32, u32),
}

impl CodecParameters {
    /// 创建视频参数
    pub fn video(codec_id: CodecId, width: u32, height: u32, pixel_format: PixelFormat) -> Self {
        Self {
            codec_id,
            extra_data: Vec::new(),
            bit_rate: 0,
            video: VideoCodecParams {
                width,
                height,
                pixel_format,
                frame_rate: (25, 1),
            },
            options: Vec::new(),
        }
    }

    /// 追加一个专有参数
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.push((key.into(), value.into()));
        self
    }

    /// 每帧平均比特数 (由码率与帧率换算), 未指定码率时返回 `None`
    pub fn bits_per_frame(&self) -> Option<usize> {
        let (num, den) = self.video.frame_rate;
        if self.bit_rate == 0 || num == 0 {
            return None;
        }
        Some((self.bit_rate * u64::from(den) / u64::from(num)) as usize)
    }
}
