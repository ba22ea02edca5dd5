//! H.264 baseline 编码器.
//!
//! 每个输入帧编码为一个 Annex B 访问单元. 帧级预算优先取 `bit budget`
//! 参数, 其次由 `bit_rate / frame_rate` 换算, 都没有时不限预算.

use bytes::Bytes;
use log::{debug, warn};
use tao_core::{PixelFormat, TaoError, TaoResult};

use crate::codec_id::CodecId;
use crate::codec_parameters::CodecParameters;
use crate::encoder::Encoder;
use crate::frame::VideoFrame;
use crate::h264::colour::{Bt601Converter, ColourConverter};
use crate::h264::{H264Config, PictureCodingType, PictureEncoder, YuvPicture};
use crate::packet::Packet;

/// H.264 编码器
pub struct H264Encoder {
    /// 打开前通过 `set_option` 累积的参数
    config: H264Config,
    encoder: Option<PictureEncoder>,
    converter: Box<dyn ColourConverter>,
    /// 每幅图像的比特预算, 0 表示不限
    bit_budget: usize,
    /// 码率换算出的预算, `bit budget` 为 0 时使用
    rate_budget: usize,
    /// 输出数据包缓冲
    output_packet: Option<Packet>,
    /// 是否已收到刷新信号
    flushing: bool,
}

impl H264Encoder {
    pub fn create() -> TaoResult<Box<dyn Encoder>> {
        Ok(Box::new(Self::new()))
    }

    pub fn new() -> Self {
        Self {
            config: H264Config::default(),
            encoder: None,
            converter: Box::new(Bt601Converter),
            bit_budget: 0,
            rate_budget: 0,
            output_packet: None,
            flushing: false,
        }
    }

    /// SPS + PPS, 可作为容器的 extra_data
    pub fn param_sets(&self) -> TaoResult<Vec<u8>> {
        self.encoder
            .as_ref()
            .ok_or_else(|| TaoError::Codec("编码器未打开, 请先调用 open()".into()))?
            .param_sets()
    }

    fn effective_budget(&self) -> usize {
        if self.bit_budget > 0 {
            self.bit_budget
        } else {
            self.rate_budget
        }
    }

    fn to_picture(&self, frame: &VideoFrame) -> TaoResult<YuvPicture> {
        match frame.pixel_format {
            PixelFormat::Yuv420p => YuvPicture::from_video_frame(frame),
            PixelFormat::Rgb24 => {
                YuvPicture::from_video_frame(&self.converter.rgb_to_yuv420(frame)?)
            }
            other => Err(TaoError::Unsupported(format!(
                "h264 编码器不支持 {other} 输入"
            ))),
        }
    }
}

impl Default for H264Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder for H264Encoder {
    fn codec_id(&self) -> CodecId {
        CodecId::H264
    }

    fn name(&self) -> &str {
        "h264"
    }

    fn open(&mut self, params: &CodecParameters) -> TaoResult<()> {
        let mut config = self.config.clone();
        let video = &params.video;
        if video.width != 0 {
            config.width = video.width;
        }
        if video.height != 0 {
            config.height = video.height;
        }
        if video.pixel_format != PixelFormat::None {
            config.in_colour = video.pixel_format;
        }
        config.apply_options(params.options.iter().map(|(k, v)| (k.as_str(), v.as_str())))?;
        if config.width == 0 || config.height == 0 {
            return Err(TaoError::InvalidArgument("宽度和高度不能为 0".into()));
        }

        let encoder = PictureEncoder::new(config.clone())?;
        self.bit_budget = config.bit_budget;
        self.rate_budget = params.bits_per_frame().unwrap_or(0);
        self.config = config;
        self.encoder = Some(encoder);
        self.output_packet = None;
        self.flushing = false;

        debug!(
            "打开 h264 编码器: {}x{}, 输入={}, 预算={} 比特/帧",
            self.config.width,
            self.config.height,
            self.config.in_colour,
            self.effective_budget()
        );
        Ok(())
    }

    fn set_option(&mut self, key: &str, value: &str) -> TaoResult<()> {
        match self.encoder.as_mut() {
            Some(encoder) => {
                encoder.set_parameter(key, value)?;
                self.config = encoder.config().clone();
            }
            None => self.config.set_parameter(key, value)?,
        }
        self.bit_budget = self.config.bit_budget;
        Ok(())
    }

    fn send_frame(&mut self, frame: Option<&VideoFrame>) -> TaoResult<()> {
        if self.encoder.is_none() {
            return Err(TaoError::Codec("编码器未打开, 请先调用 open()".into()));
        }
        if self.output_packet.is_some() {
            return Err(TaoError::NeedMoreData);
        }
        let Some(frame) = frame else {
            self.flushing = true;
            return Ok(());
        };

        let picture = self.to_picture(frame)?;
        let budget = self.effective_budget();
        let encoder = self
            .encoder
            .as_mut()
            .ok_or_else(|| TaoError::Codec("编码器未打开, 请先调用 open()".into()))?;
        let encoded = match encoder.encode(&picture, budget) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!("帧 pts={} 编码失败: {e}", frame.pts);
                return Err(e);
            }
        };
        self.config = encoder.config().clone();

        let mut pkt = Packet::from_data(Bytes::from(encoded.data));
        pkt.bit_len = encoded.bit_len;
        pkt.pts = frame.pts;
        pkt.is_keyframe = encoded.picture_type == PictureCodingType::Intra;
        self.output_packet = Some(pkt);
        Ok(())
    }

    fn receive_packet(&mut self) -> TaoResult<Packet> {
        if let Some(pkt) = self.output_packet.take() {
            return Ok(pkt);
        }
        if self.flushing {
            return Err(TaoError::Eof);
        }
        Err(TaoError::NeedMoreData)
    }

    fn flush(&mut self) {
        if let Some(encoder) = self.encoder.as_mut() {
            encoder.reset();
        }
        self.output_packet = None;
        self.flushing = false;
    }
}
