//! H.264 baseline 解码器.
//!
//! 输入为 Annex B 访问单元, 每个数据包最多产出一帧.
//! 输出像素格式由 `outcolour` 参数决定 (yuv420p 或 rgb24).

use log::debug;
use tao_core::{PixelFormat, TaoError, TaoResult};

use crate::codec_id::CodecId;
use crate::codec_parameters::CodecParameters;
use crate::decoder::Decoder;
use crate::frame::{PictureType, VideoFrame};
use crate::h264::colour::{Bt601Converter, ColourConverter};
use crate::h264::{H264Config, PictureDecoder};
use crate::packet::Packet;
use crate::parsers::h264::SliceType;

/// H.264 解码器
pub struct H264Decoder {
    decoder: PictureDecoder,
    converter: Box<dyn ColourConverter>,
    out_colour: PixelFormat,
    /// 待取出的帧
    output_frame: Option<VideoFrame>,
    opened: bool,
    flushing: bool,
}

impl H264Decoder {
    pub fn create() -> TaoResult<Box<dyn Decoder>> {
        Ok(Box::new(Self::new()))
    }

    pub fn new() -> Self {
        Self {
            decoder: PictureDecoder::new(),
            converter: Box::new(Bt601Converter),
            out_colour: PixelFormat::Yuv420p,
            output_frame: None,
            opened: false,
            flushing: false,
        }
    }
}

impl Default for H264Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for H264Decoder {
    fn codec_id(&self) -> CodecId {
        CodecId::H264
    }

    fn name(&self) -> &str {
        "h264"
    }

    fn open(&mut self, params: &CodecParameters) -> TaoResult<()> {
        let mut config = H264Config {
            out_colour: match params.video.pixel_format {
                PixelFormat::None => PixelFormat::Yuv420p,
                other => other,
            },
            ..H264Config::default()
        };
        config.apply_options(params.options.iter().map(|(k, v)| (k.as_str(), v.as_str())))?;
        if !matches!(config.out_colour, PixelFormat::Yuv420p | PixelFormat::Rgb24) {
            return Err(TaoError::Unsupported(format!(
                "h264 解码器不支持输出 {}",
                config.out_colour
            )));
        }

        self.decoder = PictureDecoder::new();
        if !params.extra_data.is_empty() {
            self.decoder.decode(&params.extra_data)?;
        }
        self.out_colour = config.out_colour;
        self.output_frame = None;
        self.opened = true;
        self.flushing = false;
        debug!("打开 h264 解码器: 输出={}", self.out_colour);
        Ok(())
    }

    fn send_packet(&mut self, packet: &Packet) -> TaoResult<()> {
        if !self.opened {
            return Err(TaoError::Codec("解码器未打开, 请先调用 open()".into()));
        }
        if packet.is_empty() {
            self.flushing = true;
            return Ok(());
        }
        if self.output_frame.is_some() {
            return Err(TaoError::NeedMoreData);
        }

        let Some(decoded) = self.decoder.decode(&packet.data)? else {
            return Ok(());
        };
        let mut frame = decoded.picture.to_video_frame();
        if self.out_colour == PixelFormat::Rgb24 {
            frame = self.converter.yuv420_to_rgb(&frame)?;
        }
        frame.pts = packet.pts;
        frame.is_keyframe = decoded.is_idr;
        frame.picture_type = match decoded.slice_type {
            SliceType::I => PictureType::I,
            SliceType::P => PictureType::P,
        };
        self.output_frame = Some(frame);
        Ok(())
    }

    fn receive_frame(&mut self) -> TaoResult<VideoFrame> {
        if let Some(frame) = self.output_frame.take() {
            return Ok(frame);
        }
        if self.flushing {
            return Err(TaoError::Eof);
        }
        Err(TaoError::NeedMoreData)
    }

    fn flush(&mut self) {
        self.decoder.reset();
        self.output_frame = None;
        self.flushing = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::Encoder;
    use crate::encoders::h264::H264Encoder;

    fn encode_gray(w: u32, h: u32, frames: usize) -> Vec<Packet> {
        let mut enc = H264Encoder::new();
        enc.open(&CodecParameters::video(CodecId::H264, w, h, PixelFormat::Yuv420p))
            .unwrap();
        (0..frames)
            .map(|i| {
                let mut vf = VideoFrame::new(w, h, PixelFormat::Yuv420p);
                vf.data[0].fill(60 + i as u8 * 10);
                vf.data[1].fill(128);
                vf.data[2].fill(128);
                vf.pts = i as i64;
                enc.send_frame(Some(&vf)).unwrap();
                enc.receive_packet().unwrap()
            })
            .collect()
    }

    #[test]
    fn test_未打开时报错() {
        let mut dec = H264Decoder::new();
        assert!(dec.send_packet(&Packet::from_data(vec![0, 0, 1, 0x65])).is_err());
    }

    #[test]
    fn test_解码类型与时间戳() {
        let packets = encode_gray(32, 16, 3);
        let mut dec = H264Decoder::new();
        dec.open(&CodecParameters::video(CodecId::H264, 0, 0, PixelFormat::None))
            .unwrap();
        let mut types = Vec::new();
        for pkt in &packets {
            dec.send_packet(pkt).unwrap();
            let frame = dec.receive_frame().unwrap();
            assert_eq!((frame.width, frame.height), (32, 16));
            assert_eq!(frame.pts, pkt.pts);
            assert_eq!(frame.pixel_format, PixelFormat::Yuv420p);
            types.push(frame.picture_type);
        }
        assert_eq!(types, [PictureType::I, PictureType::P, PictureType::P]);
        dec.send_packet(&Packet::empty()).unwrap();
        assert!(matches!(dec.receive_frame(), Err(TaoError::Eof)));
    }

    #[test]
    fn test_rgb24_输出() {
        let packets = encode_gray(16, 16, 1);
        let mut dec = H264Decoder::new();
        let params = CodecParameters::video(CodecId::H264, 16, 16, PixelFormat::None)
            .with_option("outcolour", "rgb24");
        dec.open(&params).unwrap();
        dec.send_packet(&packets[0]).unwrap();
        let frame = dec.receive_frame().unwrap();
        assert_eq!(frame.pixel_format, PixelFormat::Rgb24);
        assert_eq!(frame.data[0].len(), 16 * 16 * 3);
    }
}
