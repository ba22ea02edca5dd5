//! H.264 码流级场景测试.
//!
//! 直接解析编码器输出的 slice 数据, 检查宏块语法是否符合预期.

use tao_avc::codec::h264::config::{H264Config, ModeOfOperation, PictureCodingType};
use tao_avc::codec::h264::macroblock::{Intra16x16Mode, MacroblockGrid, MbKind};
use tao_avc::codec::h264::slice_data::{mark_skip, read_macroblock, read_skip_run};
use tao_avc::codec::h264::{PictureDecoder, PictureEncoder, YuvPicture};
use tao_avc::codec::parsers::h264::{
    NalUnit, NalUnitType, Pps, SliceHeader, SliceType, Sps, parse_pps, parse_slice_header,
    parse_sps, split_annex_b,
};
use tao_avc::core::BitReader;

/// 拆出访问单元中的参数集与唯一的 slice
fn split_picture(data: &[u8], sps: &mut Option<Sps>, pps: &mut Option<Pps>) -> NalUnit {
    let mut slice = None;
    for nal in split_annex_b(data) {
        match nal.nal_type {
            NalUnitType::Sps => *sps = Some(parse_sps(&nal.rbsp()).unwrap()),
            NalUnitType::Pps => *pps = Some(parse_pps(&nal.rbsp()).unwrap()),
            _ => slice = Some(nal),
        }
    }
    slice.expect("访问单元中没有 slice")
}

/// 解析 slice 头, 返回 (头, slice QP, RBSP, 有效位数)
fn open_slice(nal: &NalUnit, sps: &Sps, pps: &Pps) -> (SliceHeader, u8, Vec<u8>, usize) {
    let (rbsp, bits) = nal.rbsp_with_payload_bits().unwrap();
    let mut br = BitReader::with_bit_len(&rbsp, bits);
    let (header, _, _) =
        parse_slice_header(&mut br, nal.nal_type, nal.ref_idc, |_| Ok((sps, pps))).unwrap();
    let qp = header.slice_qp(pps) as u8;
    let consumed = br.bits_read();
    (header, qp, rbsp, consumed)
}

fn textured(w: u32, h: u32) -> YuvPicture {
    let mut pic = YuvPicture::new(w, h).unwrap();
    for plane in 0..3 {
        let p = pic.plane_mut(plane);
        for y in 0..p.height() {
            for x in 0..p.width() {
                let v = (x * 13 + y * 7 + (x * y) % 23) % 200 + 20;
                p.set(x, y, v as u8);
            }
        }
    }
    pic
}

#[test]
fn test_单宏块全零帧_qp26() {
    let config = H264Config {
        width: 16,
        height: 16,
        quality: 26,
        mode: ModeOfOperation::FixedQp,
        ..H264Config::default()
    };
    let mut encoder = PictureEncoder::new(config).unwrap();
    let source = YuvPicture::new(16, 16).unwrap();
    let encoded = encoder.encode(&source, 0).unwrap();
    assert_eq!(encoded.picture_type, PictureCodingType::Intra);

    let (mut sps, mut pps) = (None, None);
    let nal = split_picture(&encoded.data, &mut sps, &mut pps);
    let (sps, pps) = (sps.unwrap(), pps.unwrap());
    assert_eq!(nal.nal_type, NalUnitType::SliceIdr);
    let (header, qp, rbsp, consumed) = open_slice(&nal, &sps, &pps);
    assert_eq!(header.slice_type, SliceType::I);
    assert_eq!(qp, 26);

    let (_, bits) = nal.rbsp_with_payload_bits().unwrap();
    let mut br = BitReader::with_bit_len(&rbsp, bits);
    br.skip_bits(consumed).unwrap();
    let mut grid = MacroblockGrid::new(1, 1);
    read_macroblock(&mut br, &mut grid, 0, SliceType::I, qp).unwrap();
    let mb = grid.get(0);
    assert_eq!(mb.kind, MbKind::Intra16x16);
    assert_eq!(mb.luma_mode, Intra16x16Mode::Dc);
    assert_eq!(mb.cbp_luma, 0);
    assert_eq!(mb.committed_qp, 26);
    assert_eq!(br.bits_left(), 0);

    let decoded = PictureDecoder::new()
        .decode(&encoded.data)
        .unwrap()
        .unwrap();
    assert_eq!(decoded.picture, source);
}

#[test]
fn test_跳过游程_编码与解码() {
    let (w, h) = (64, 16);
    let mut encoder = PictureEncoder::new(H264Config {
        width: w,
        height: h,
        ..H264Config::default()
    })
    .unwrap();
    let first = encoder.encode(&textured(w, h), 0).unwrap();

    // 第二幅: 宏块 1, 2 与参考完全相同, 宏块 0, 3 换成参考中不存在的棋盘格
    let mut source = encoder.reference().unwrap().clone();
    for mb_x in [0usize, 3] {
        let luma = source.plane_mut(0);
        for y in 0..16 {
            for x in 0..16 {
                let v = if (x / 2 + y / 2) % 2 == 0 { 250 } else { 5 };
                luma.set(mb_x * 16 + x, y, v);
            }
        }
    }
    let second = encoder.encode(&source, 0).unwrap();
    assert_eq!(second.picture_type, PictureCodingType::Inter);
    assert_eq!(second.skipped_mbs, 2);

    let (mut sps, mut pps) = (None, None);
    split_picture(&first.data, &mut sps, &mut pps);
    let (sps, pps) = (sps.unwrap(), pps.unwrap());
    let nal = split_picture(&second.data, &mut None, &mut None);
    let (header, qp, rbsp, consumed) = open_slice(&nal, &sps, &pps);
    assert_eq!(header.slice_type, SliceType::P);

    let (_, bits) = nal.rbsp_with_payload_bits().unwrap();
    let mut br = BitReader::with_bit_len(&rbsp, bits);
    br.skip_bits(consumed).unwrap();
    let mut grid = MacroblockGrid::new(4, 1);
    let mut runs = Vec::new();
    let mut idx = 0;
    while idx < grid.len() {
        let run = read_skip_run(&mut br, grid.len() - idx).unwrap();
        runs.push(run);
        for _ in 0..run {
            let prev = grid.prev_qp(idx, qp);
            mark_skip(&mut grid, idx, prev);
            idx += 1;
        }
        if idx == grid.len() {
            break;
        }
        let prev = grid.prev_qp(idx, qp);
        read_macroblock(&mut br, &mut grid, idx, SliceType::P, prev).unwrap();
        idx += 1;
    }
    assert_eq!(runs, [0, 2]);
    assert_eq!(br.bits_left(), 0);
    let skipped: Vec<bool> = grid.iter().map(|mb| mb.kind == MbKind::Skip).collect();
    assert_eq!(skipped, [false, true, true, false]);

    // 完整解码与编码端重建一致
    let mut decoder = PictureDecoder::new();
    decoder.decode(&first.data).unwrap();
    let decoded = decoder.decode(&second.data).unwrap().unwrap();
    assert_eq!(Some(&decoded.picture), encoder.reference());
}
