//! 宏块残差的变换量化与重建.
//!
//! [`quantize_residual`] 只在编码端使用; [`reconstruct`] 由编码端的
//! 探测/写出与解码端共用, 两端的重建结果逐样本一致.

use super::macroblock::{Macroblock, MbKind};
use super::picture::MbSamples;
use super::transform::{
    chroma_qp, forward_chroma_dc, forward_core_4x4, forward_luma_dc, inverse_4x4,
    inverse_chroma_dc, inverse_luma_dc, quantize_4x4,
};

/// 取出 `stride` 宽平面中 (x0, y0) 处 4x4 块的残差
fn residual_4x4(src: &[u8], pred: &[u8], stride: usize, x0: usize, y0: usize) -> [i32; 16] {
    let mut out = [0i32; 16];
    for y in 0..4 {
        for x in 0..4 {
            let i = (y0 + y) * stride + x0 + x;
            out[y * 4 + x] = i32::from(src[i]) - i32::from(pred[i]);
        }
    }
    out
}

fn add_4x4(dst: &mut [u8], stride: usize, x0: usize, y0: usize, res: &[i32; 16]) {
    for y in 0..4 {
        for x in 0..4 {
            let i = (y0 + y) * stride + x0 + x;
            dst[i] = (i32::from(dst[i]) + res[y * 4 + x]).clamp(0, 255) as u8;
        }
    }
}

/// 对 `src - pred` 做变换量化, 结果写入宏块的系数块并推导 CBP
///
/// 宏块的 `kind` 需已确定; 帧内宏块使用 Intra16x16 的亮度 DC 路径.
pub fn quantize_residual(
    mb: &mut Macroblock,
    src: &MbSamples,
    pred: &MbSamples,
    qp: u8,
    chroma_qp_offset: i32,
) {
    mb.clear_blocks();
    let intra = mb.kind.is_intra();

    let mut dc_terms = [0i32; 16];
    for raster in 0..16 {
        let (x0, y0) = ((raster % 4) * 4, (raster / 4) * 4);
        let core = forward_core_4x4(&residual_4x4(&src.luma, &pred.luma, 16, x0, y0));
        dc_terms[raster] = core[0];
        mb.luma[raster].coeffs = quantize_4x4(&core, qp, intra, intra);
    }
    if intra {
        mb.luma_dc.coeffs = forward_luma_dc(&dc_terms, qp, true);
    }

    let qpc = chroma_qp(qp, chroma_qp_offset);
    for plane in 0..2 {
        let mut dc = [0i32; 4];
        for (blk, d) in dc.iter_mut().enumerate() {
            let (x0, y0) = ((blk % 2) * 4, (blk / 2) * 4);
            let core = forward_core_4x4(&residual_4x4(
                src.chroma(plane),
                pred.chroma(plane),
                8,
                x0,
                y0,
            ));
            *d = core[0];
            mb.chroma_ac[plane][blk].coeffs = quantize_4x4(&core, qpc, intra, true);
        }
        mb.chroma_dc[plane].coeffs = forward_chroma_dc(&dc, qpc, intra);
    }

    mb.probe_qp = qp;
    mb.derive_cbp();
}

/// 以宏块的 `committed_qp` 反量化系数并叠加到预测上
pub fn reconstruct(mb: &Macroblock, pred: &MbSamples, chroma_qp_offset: i32) -> MbSamples {
    let mut out = *pred;
    if mb.kind == MbKind::Skip || (mb.kind == MbKind::Inter && mb.cbp() == 0) {
        return out;
    }
    let qp = mb.committed_qp;

    let dc = (mb.kind == MbKind::Intra16x16).then(|| inverse_luma_dc(&mb.luma_dc.coeffs, qp));
    for raster in 0..16 {
        let res = inverse_4x4(&mb.luma[raster].coeffs, qp, dc.map(|d| d[raster]));
        add_4x4(&mut out.luma, 16, (raster % 4) * 4, (raster / 4) * 4, &res);
    }

    let qpc = chroma_qp(qp, chroma_qp_offset);
    for plane in 0..2 {
        let dcs = inverse_chroma_dc(&mb.chroma_dc[plane].coeffs, qpc);
        for (blk, &d) in dcs.iter().enumerate() {
            let res = inverse_4x4(&mb.chroma_ac[plane][blk].coeffs, qpc, Some(d));
            add_4x4(out.chroma_mut(plane), 8, (blk % 2) * 4, (blk / 2) * 4, &res);
        }
    }
    out
}
