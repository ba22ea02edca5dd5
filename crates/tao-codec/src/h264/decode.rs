//! 图像解码流程.
//!
//! 每个数据包可以带任意个 SPS/PPS, 以及至多一个覆盖整幅图像的 slice.
//! 宏块按光栅顺序解析后立即重建, 整幅完成后去块滤波并作为下一幅的参考.

use std::collections::HashMap;

use log::{debug, warn};
use tao_core::{BitReader, TaoError, TaoResult};

use super::deblock::{DeblockParams, deblock_picture};
use super::intra::{ChromaEdges, LumaEdges, predict_mb};
use super::macroblock::{MacroblockGrid, MbKind};
use super::motion::{MotionCompensator, QpelCompensator};
use super::picture::{MbSamples, YuvPicture};
use super::residual::reconstruct;
use super::slice_data::{mark_skip, read_macroblock, read_skip_run};
use crate::parsers::h264::{
    NalUnit, NalUnitType, Pps, SliceHeader, SliceType, Sps, parse_pps, parse_slice_header,
    parse_sps, split_annex_b,
};

/// 一幅解码图像
#[derive(Debug, Clone)]
pub struct DecodedPicture {
    pub picture: YuvPicture,
    pub slice_type: SliceType,
    pub frame_num: u32,
    pub is_idr: bool,
}

/// H.264 baseline 图像解码器
pub struct PictureDecoder {
    sps: HashMap<u32, Sps>,
    pps: HashMap<u32, Pps>,
    compensator: Box<dyn MotionCompensator>,
    reference: Option<YuvPicture>,
}

impl Default for PictureDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl PictureDecoder {
    pub fn new() -> Self {
        Self {
            sps: HashMap::new(),
            pps: HashMap::new(),
            compensator: Box::new(QpelCompensator),
            reference: None,
        }
    }

    /// 替换运动补偿 (需与编码端一致)
    pub fn with_compensator(mut self, compensator: Box<dyn MotionCompensator>) -> Self {
        self.compensator = compensator;
        self
    }

    pub fn reference(&self) -> Option<&YuvPicture> {
        self.reference.as_ref()
    }

    /// 丢弃参考图像, 保留参数集
    pub fn reset(&mut self) {
        self.reference = None;
    }

    /// 解码一段 Annex B 字节流
    ///
    /// 只含参数集时返回 `None`.
    pub fn decode(&mut self, data: &[u8]) -> TaoResult<Option<DecodedPicture>> {
        let mut decoded = None;
        for nal in split_annex_b(data) {
            match nal.nal_type {
                NalUnitType::Sps => {
                    let sps = parse_sps(&nal.rbsp())?;
                    debug!("SPS {}: {}x{}", sps.sps_id, sps.width(), sps.height());
                    self.sps.insert(sps.sps_id, sps);
                }
                NalUnitType::Pps => {
                    let pps = parse_pps(&nal.rbsp())?;
                    debug!("PPS {} -> SPS {}", pps.pps_id, pps.sps_id);
                    self.pps.insert(pps.pps_id, pps);
                }
                NalUnitType::Slice | NalUnitType::SliceIdr => {
                    if decoded.is_some() {
                        return Err(TaoError::Unsupported(
                            "H.264: 不支持一幅图像多个 slice".into(),
                        ));
                    }
                    decoded = Some(self.decode_slice(&nal)?);
                }
                other if other.is_vcl() => {
                    return Err(TaoError::Unsupported(format!("H.264: 不支持 {other}")));
                }
                other => debug!("忽略 NAL 单元: {other}"),
            }
        }
        Ok(decoded)
    }

    fn decode_slice(&mut self, nal: &NalUnit) -> TaoResult<DecodedPicture> {
        let (rbsp, payload_bits) = nal.rbsp_with_payload_bits()?;
        let mut br = BitReader::with_bit_len(&rbsp, payload_bits);

        let (sps_map, pps_map) = (&self.sps, &self.pps);
        let (header, sps, pps) = parse_slice_header(&mut br, nal.nal_type, nal.ref_idc, |id| {
            let pps = pps_map
                .get(&id)
                .ok_or_else(|| TaoError::InvalidData(format!("H.264: 未知 PPS {id}")))?;
            let sps = sps_map.get(&pps.sps_id).ok_or_else(|| {
                TaoError::InvalidData(format!("H.264: 未知 SPS {}", pps.sps_id))
            })?;
            Ok((sps, pps))
        })?;
        let (sps, pps) = (sps.clone(), pps.clone());

        if header.first_mb != 0 {
            return Err(TaoError::Unsupported(format!(
                "H.264: 不支持从宏块 {} 开始的 slice",
                header.first_mb
            )));
        }
        if header.slice_type == SliceType::P && self.reference.is_none() {
            return Err(TaoError::InvalidData("H.264: P slice 缺少参考图像".into()));
        }

        let picture = self.decode_slice_data(&mut br, &header, &sps, &pps)?;
        if br.bits_left() > 0 {
            warn!("slice 数据结束后剩余 {} 比特", br.bits_left());
        }
        debug!(
            "解码 {:?} slice: frame_num={}, QP={}",
            header.slice_type,
            header.frame_num,
            header.slice_qp(&pps)
        );

        self.reference = Some(picture.clone());
        Ok(DecodedPicture {
            picture,
            slice_type: header.slice_type,
            frame_num: header.frame_num,
            is_idr: nal.nal_type.is_idr(),
        })
    }

    fn decode_slice_data(
        &self,
        br: &mut BitReader,
        header: &SliceHeader,
        sps: &Sps,
        pps: &Pps,
    ) -> TaoResult<YuvPicture> {
        let mut recon = YuvPicture::new(sps.width(), sps.height())?;
        let mut grid = MacroblockGrid::new(recon.mb_width(), recon.mb_height());
        let slice_qp = u8::try_from(header.slice_qp(pps))
            .map_err(|_| TaoError::InvalidData("H.264: slice QP 越界".into()))?;
        let offset = pps.chroma_qp_index_offset;
        let n = grid.len();

        let mut idx = 0;
        while idx < n {
            if header.slice_type == SliceType::P {
                let run = read_skip_run(br, n - idx)?;
                for _ in 0..run {
                    let prev_qp = grid.prev_qp(idx, slice_qp);
                    mark_skip(&mut grid, idx, prev_qp);
                    let (mb_x, mb_y) = grid.position(idx);
                    let pred = self.inter_prediction(mb_x, mb_y, &grid, idx)?;
                    recon.store_mb(mb_x, mb_y, &pred);
                    idx += 1;
                }
                if idx == n {
                    break;
                }
            }

            let prev_qp = grid.prev_qp(idx, slice_qp);
            read_macroblock(br, &mut grid, idx, header.slice_type, prev_qp)?;
            let (mb_x, mb_y) = grid.position(idx);
            let pred = match grid.get(idx).kind {
                MbKind::Intra16x16 => {
                    let avail = grid.neighbours(idx).availability();
                    let luma = LumaEdges::from_picture(&recon, mb_x, mb_y, avail);
                    let chroma = [
                        ChromaEdges::from_picture(&recon, 0, mb_x, mb_y, avail),
                        ChromaEdges::from_picture(&recon, 1, mb_x, mb_y, avail),
                    ];
                    let mb = grid.get(idx);
                    predict_mb(mb.luma_mode, mb.chroma_mode, &luma, &chroma).ok_or_else(|| {
                        TaoError::InvalidData(format!(
                            "H.264: 宏块 {idx} 的帧内预测模式缺少相邻样本"
                        ))
                    })?
                }
                _ => self.inter_prediction(mb_x, mb_y, &grid, idx)?,
            };
            let out = reconstruct(grid.get(idx), &pred, offset);
            recon.store_mb(mb_x, mb_y, &out);
            idx += 1;
        }

        deblock_picture(&mut recon, &grid, &DeblockParams::from_slice(header, pps));
        Ok(recon)
    }

    fn inter_prediction(
        &self,
        mb_x: usize,
        mb_y: usize,
        grid: &MacroblockGrid,
        idx: usize,
    ) -> TaoResult<MbSamples> {
        let reference = self
            .reference
            .as_ref()
            .ok_or_else(|| TaoError::InvalidData("H.264: P slice 缺少参考图像".into()))?;
        let mut pred = MbSamples::default();
        self.compensator
            .compensate(reference, mb_x * 16, mb_y * 16, grid.get(idx).mv, &mut pred);
        Ok(pred)
    }
}
