//! 子命令实现.

use std::fs;
use std::path::Path;

use anyhow::Context;
use log::{info, warn};
use serde::Serialize;
use tao_codec::h264::colour::{Bt601Converter, ColourConverter};
use tao_codec::h264::{H264Config, PictureEncoder, YuvPicture};
use tao_codec::parsers::h264::{NalUnitType, parse_pps, parse_sps, split_annex_b};
use tao_codec::{CodecId, CodecParameters, CodecRegistry, Packet, VideoFrame};
use tao_core::{PixelFormat, TaoError};

use crate::{DecodeArgs, EncodeArgs, InfoArgs};

// ============================================================
// 统计报告
// ============================================================

/// 单幅编码图像的统计
#[derive(Debug, Serialize)]
struct EncodedFrameStats {
    index: usize,
    picture_type: String,
    frame_num: u32,
    bits: usize,
    qp_min: Option<u8>,
    qp_max: Option<u8>,
    null_mbs: usize,
    skipped_mbs: usize,
    intra_mbs: usize,
    truncated: bool,
}

#[derive(Debug, Default, Serialize)]
struct EncodeReport {
    frames: usize,
    total_bits: usize,
    bit_budget: usize,
    /// 预算无法满足而丢弃的输入帧序号
    dropped: Vec<usize>,
    pictures: Vec<EncodedFrameStats>,
}

#[derive(Debug, Serialize)]
struct DecodedFrameStats {
    index: usize,
    picture_type: String,
    keyframe: bool,
    bytes: usize,
}

#[derive(Debug, Default, Serialize)]
struct DecodeReport {
    frames: usize,
    pictures: Vec<DecodedFrameStats>,
}

fn write_report<T: Serialize>(path: &Path, report: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json).with_context(|| format!("写入统计文件 {} 失败", path.display()))
}

fn options_iter(options: &[(String, String)]) -> impl Iterator<Item = (&str, &str)> {
    options.iter().map(|(k, v)| (k.as_str(), v.as_str()))
}

// ============================================================
// encode
// ============================================================

/// 原始帧数据转换为 YUV 图像
fn load_picture(chunk: &[u8], width: u32, height: u32, format: PixelFormat) -> anyhow::Result<YuvPicture> {
    let mut frame = VideoFrame::new(width, height, format);
    let mut offset = 0;
    for plane in frame.data.iter_mut() {
        let n = plane.len();
        let src = chunk
            .get(offset..offset + n)
            .context("输入帧数据不足")?;
        plane.copy_from_slice(src);
        offset += n;
    }
    let frame = match format {
        PixelFormat::Rgb24 => Bt601Converter.rgb_to_yuv420(&frame)?,
        _ => frame,
    };
    Ok(YuvPicture::from_video_frame(&frame)?)
}

pub fn encode(args: &EncodeArgs) -> anyhow::Result<()> {
    let raw = fs::read(&args.input)
        .with_context(|| format!("读取输入文件 {} 失败", args.input.display()))?;
    let (width, height) = args.size;
    let mut config = H264Config {
        width,
        height,
        in_colour: args.pix_fmt,
        ..H264Config::default()
    };
    config.apply_options(options_iter(&args.options))?;

    let frame_bytes = config
        .in_colour
        .frame_size(width, height)
        .with_context(|| format!("无法计算 {} 的帧大小", config.in_colour))?;
    if raw.len() % frame_bytes != 0 {
        warn!(
            "输入大小 {} 不是帧大小 {frame_bytes} 的整数倍, 忽略末尾 {} 字节",
            raw.len(),
            raw.len() % frame_bytes
        );
    }

    let (num, den) = args.rate;
    let budget = if config.bit_budget > 0 {
        config.bit_budget
    } else {
        (args.bit_rate * u64::from(den) / u64::from(num)) as usize
    };
    let mut encoder = PictureEncoder::new(config.clone())?;
    let mut output = Vec::new();
    let mut report = EncodeReport {
        bit_budget: budget,
        ..EncodeReport::default()
    };

    let limit = args.frames.unwrap_or(usize::MAX);
    for (index, chunk) in raw.chunks_exact(frame_bytes).take(limit).enumerate() {
        let picture = load_picture(chunk, width, height, config.in_colour)?;
        match encoder.encode(&picture, budget) {
            Ok(pic) => {
                info!(
                    "帧 {index}: {} {} 比特, QP {:?}",
                    pic.picture_type, pic.bit_len, pic.qp_range
                );
                output.extend_from_slice(&pic.data);
                report.total_bits += pic.bit_len;
                report.pictures.push(EncodedFrameStats {
                    index,
                    picture_type: pic.picture_type.to_string(),
                    frame_num: pic.frame_num,
                    bits: pic.bit_len,
                    qp_min: pic.qp_range.map(|r| r.0),
                    qp_max: pic.qp_range.map(|r| r.1),
                    null_mbs: pic.null_mbs,
                    skipped_mbs: pic.skipped_mbs,
                    intra_mbs: pic.intra_mbs,
                    truncated: pic.truncated,
                });
            }
            Err(TaoError::BudgetUnsatisfiable { required, available }) => {
                warn!("帧 {index} 最少需要 {required} 比特, 超出预算 {available}, 丢弃");
                report.dropped.push(index);
            }
            Err(e) => return Err(e).with_context(|| format!("编码帧 {index} 失败")),
        }
    }
    report.frames = report.pictures.len();

    fs::write(&args.output, &output)
        .with_context(|| format!("写入输出文件 {} 失败", args.output.display()))?;
    eprintln!(
        "编码 {} 帧 (丢弃 {}), 共 {} 字节",
        report.frames,
        report.dropped.len(),
        output.len()
    );
    if let Some(path) = &args.stats {
        write_report(path, &report)?;
    }
    Ok(())
}

// ============================================================
// decode
// ============================================================

/// 按 VCL NAL 切分访问单元, 参数集归入其后的图像
fn split_access_units(data: &[u8]) -> Vec<Vec<u8>> {
    let mut units = Vec::new();
    let mut current = Vec::new();
    for nal in split_annex_b(data) {
        current.extend_from_slice(&[0, 0, 0, 1]);
        current.extend_from_slice(&nal.data);
        if nal.nal_type.is_vcl() {
            units.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        units.push(current);
    }
    units
}

pub fn decode(args: &DecodeArgs) -> anyhow::Result<()> {
    let data = fs::read(&args.input)
        .with_context(|| format!("读取输入文件 {} 失败", args.input.display()))?;

    let mut registry = CodecRegistry::new();
    tao_codec::register_all(&mut registry);
    let mut decoder = registry.create_decoder(CodecId::H264)?;
    let mut params = CodecParameters::video(CodecId::H264, 0, 0, PixelFormat::None);
    params.options = args.options.clone();
    decoder.open(&params)?;

    let mut output = Vec::new();
    let mut report = DecodeReport::default();
    for (index, unit) in split_access_units(&data).into_iter().enumerate() {
        let mut pkt = Packet::from_data(unit);
        pkt.pts = index as i64;
        decoder
            .send_packet(&pkt)
            .with_context(|| format!("解码访问单元 {index} 失败"))?;
        match decoder.receive_frame() {
            Ok(frame) => {
                let start = output.len();
                for plane in &frame.data {
                    output.extend_from_slice(plane);
                }
                report.pictures.push(DecodedFrameStats {
                    index: report.pictures.len(),
                    picture_type: format!("{:?}", frame.picture_type),
                    keyframe: frame.is_keyframe,
                    bytes: output.len() - start,
                });
            }
            Err(TaoError::NeedMoreData) => {}
            Err(e) => return Err(e.into()),
        }
    }
    report.frames = report.pictures.len();

    fs::write(&args.output, &output)
        .with_context(|| format!("写入输出文件 {} 失败", args.output.display()))?;
    eprintln!("解码 {} 帧, 共 {} 字节", report.frames, output.len());
    if let Some(path) = &args.stats {
        write_report(path, &report)?;
    }
    Ok(())
}

// ============================================================
// info
// ============================================================

pub fn info(args: &InfoArgs) -> anyhow::Result<()> {
    let data = fs::read(&args.input)
        .with_context(|| format!("读取输入文件 {} 失败", args.input.display()))?;
    let nals = split_annex_b(&data);
    let mut slices = 0;
    for nal in &nals {
        match nal.nal_type {
            NalUnitType::Sps => {
                let sps = parse_sps(&nal.rbsp())?;
                println!(
                    "SPS id={} profile={} level={} {}x{} max_frame_num={}",
                    sps.sps_id,
                    sps.profile_idc,
                    sps.level_idc,
                    sps.width(),
                    sps.height(),
                    sps.max_frame_num()
                );
            }
            NalUnitType::Pps => {
                let pps = parse_pps(&nal.rbsp())?;
                println!(
                    "PPS id={} sps={} init_qp={} chroma_qp_offset={}",
                    pps.pps_id, pps.sps_id, pps.pic_init_qp, pps.chroma_qp_index_offset
                );
            }
            other => {
                if other.is_vcl() {
                    slices += 1;
                }
                println!("{other} ref_idc={} {} 字节", nal.ref_idc, nal.data.len());
            }
        }
    }
    println!("共 {} 个 NAL 单元, {slices} 个 slice", nals.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_访问单元切分() {
        let data = [
            0, 0, 0, 1, 0x67, 0xAA, // SPS
            0, 0, 0, 1, 0x68, 0xBB, // PPS
            0, 0, 0, 1, 0x65, 0x88, // IDR
            0, 0, 1, 0x41, 0x9A, // P
        ];
        let units = split_access_units(&data);
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].len(), 18);
        assert_eq!(units[1], [0, 0, 0, 1, 0x41, 0x9A]);
    }
}
