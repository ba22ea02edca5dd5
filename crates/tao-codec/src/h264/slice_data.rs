//! slice_data / macroblock_layer 语法 (CAVLC).
//!
//! 编码端的探测与最终写出, 以及解码端的读取共用这里的函数,
//! 保证两端对 nC、CBP、mb_qp_delta 的推导完全一致.

use tao_core::{BitReader, BitWriter, TaoError, TaoResult};

use super::cavlc::{NC_CHROMA_DC_420, decode_block, encode_block};
use super::cavlc::{read_cbp, write_cbp};
use super::macroblock::{
    IntraChromaMode, LUMA_CODING_ORDER, MacroblockGrid, Macroblock, MbKind, MbType,
    apply_qp_delta,
};
use super::motion::MotionVector;
use super::transform::{raster_to_scan, scan_to_raster};
use crate::parsers::h264::SliceType;
use crate::parsers::h264::exp_golomb::{read_se, read_ue_max, ue_len, write_se, write_ue};

/// 光栅下标所在的 8x8 块序号 (coded_block_pattern 的位)
fn block8x8_of(raster: usize) -> usize {
    (raster / 8) * 2 + (raster % 4) / 2
}

// ============================================================
// mb_skip_run
// ============================================================

/// 写入 mb_skip_run
pub fn write_skip_run(bw: &mut BitWriter, run: u32) -> TaoResult<()> {
    write_ue(bw, run)
}

/// 读取 mb_skip_run, `remaining` 为 slice 中剩余的宏块数
pub fn read_skip_run(br: &mut BitReader, remaining: usize) -> TaoResult<usize> {
    let run = read_ue_max(br, remaining as u32, "mb_skip_run")?;
    Ok(run as usize)
}

/// mb_skip_run 的码长
pub fn skip_run_bits(run: u32) -> usize {
    ue_len(run) as usize
}

/// 把宏块置为 P_Skip: 运动矢量取跳过预测值, QP 沿用前一宏块
pub fn mark_skip(grid: &mut MacroblockGrid, idx: usize, prev_qp: u8) {
    let mv = grid.skip_mv(idx);
    *grid.get_mut(idx) = Macroblock {
        kind: MbKind::Skip,
        probe_qp: prev_qp,
        committed_qp: prev_qp,
        mv,
        mvp: mv,
        ..Macroblock::default()
    };
}

// ============================================================
// 写出
// ============================================================

/// 写出一个非跳过宏块的 macroblock_layer
///
/// 宏块的类别、模式、QP、运动矢量与系数由调用方准备好;
/// 写出过程中按编码顺序回填各块的 `total_coeff` 与 `coded`,
/// 同时刷新 `mvp`.
pub fn write_macroblock(
    bw: &mut BitWriter,
    grid: &mut MacroblockGrid,
    idx: usize,
    slice_type: SliceType,
) -> TaoResult<()> {
    let mvp = grid.predict_mv(idx);
    let mb = grid.get_mut(idx);
    mb.mvp = mvp;
    let mb_type = mb
        .mb_type()
        .ok_or_else(|| TaoError::Internal("P_Skip 宏块没有 macroblock_layer".into()))?;
    if slice_type.is_intra() && !mb.kind.is_intra() {
        return Err(TaoError::Internal(format!("I slice 中出现帧间宏块, mb={idx}")));
    }

    write_ue(bw, mb_type.to_code(slice_type))?;
    match mb_type {
        MbType::I16x16 { .. } => write_ue(bw, mb.chroma_mode as u32)?,
        MbType::PL016x16 => {
            // num_ref_idx_l0_active == 1, ref_idx_l0 不出现
            let (dx, dy) = mb.mv.diff(mvp);
            write_se(bw, dx)?;
            write_se(bw, dy)?;
            write_cbp(bw, mb.cbp(), false)?;
        }
    }
    if mb.has_qp_delta() {
        write_se(bw, mb.qp_delta)?;
    }
    write_residual(bw, grid, idx)
}

fn write_residual(bw: &mut BitWriter, grid: &mut MacroblockGrid, idx: usize) -> TaoResult<()> {
    let (intra16, cbp_luma, cbp_chroma) = {
        let mb = grid.get(idx);
        (mb.kind == MbKind::Intra16x16, mb.cbp_luma, mb.cbp_chroma)
    };

    if intra16 {
        let nc = grid.luma_nc(idx, 0);
        let scan = raster_to_scan(&grid.get(idx).luma_dc.coeffs);
        let stats = encode_block(bw, &scan, nc, false)?;
        let dc = &mut grid.get_mut(idx).luma_dc;
        dc.total_coeff = stats.total_coeff;
        dc.coded = true;
    }

    for &raster in &LUMA_CODING_ORDER {
        if cbp_luma & (1 << block8x8_of(raster)) == 0 {
            let blk = &mut grid.get_mut(idx).luma[raster];
            blk.total_coeff = 0;
            blk.coded = false;
            continue;
        }
        let nc = grid.luma_nc(idx, raster);
        let scan = raster_to_scan(&grid.get(idx).luma[raster].coeffs);
        let stats = encode_block(bw, &scan, nc, intra16)?;
        let blk = &mut grid.get_mut(idx).luma[raster];
        blk.total_coeff = stats.total_coeff;
        blk.coded = true;
    }

    for plane in 0..2 {
        let blk = &mut grid.get_mut(idx).chroma_dc[plane];
        if cbp_chroma == 0 {
            blk.total_coeff = 0;
            blk.coded = false;
            continue;
        }
        let coeffs = blk.coeffs;
        let stats = encode_block(bw, &coeffs, NC_CHROMA_DC_420, false)?;
        blk.total_coeff = stats.total_coeff;
        blk.coded = true;
    }

    for plane in 0..2 {
        for b in 0..4 {
            if cbp_chroma < 2 {
                let blk = &mut grid.get_mut(idx).chroma_ac[plane][b];
                blk.total_coeff = 0;
                blk.coded = false;
                continue;
            }
            let nc = grid.chroma_nc(idx, plane, b);
            let scan = raster_to_scan(&grid.get(idx).chroma_ac[plane][b].coeffs);
            let stats = encode_block(bw, &scan, nc, true)?;
            let blk = &mut grid.get_mut(idx).chroma_ac[plane][b];
            blk.total_coeff = stats.total_coeff;
            blk.coded = true;
        }
    }
    Ok(())
}

// ============================================================
// 读取
// ============================================================

/// 读取一个非跳过宏块的 macroblock_layer, 结果写入 `grid[idx]`
///
/// `prev_qp` 为前一宏块的 QP_Y (第一个宏块为 slice QP).
pub fn read_macroblock(
    br: &mut BitReader,
    grid: &mut MacroblockGrid,
    idx: usize,
    slice_type: SliceType,
    prev_qp: u8,
) -> TaoResult<()> {
    let max_code = if slice_type.is_intra() { 25 } else { 30 };
    let code = read_ue_max(br, max_code, "mb_type")?;
    let mb_type = MbType::from_code(code, slice_type)?;

    let mvp = grid.predict_mv(idx);
    let mut mb = Macroblock {
        mvp,
        ..Macroblock::default()
    };
    match mb_type {
        MbType::I16x16 {
            mode,
            cbp_chroma,
            ac_coded,
        } => {
            mb.kind = MbKind::Intra16x16;
            mb.luma_mode = mode;
            mb.cbp_luma = if ac_coded { 15 } else { 0 };
            mb.cbp_chroma = cbp_chroma;
            let chroma = read_ue_max(br, 3, "intra_chroma_pred_mode")?;
            mb.chroma_mode = IntraChromaMode::from_u8(chroma as u8)?;
        }
        MbType::PL016x16 => {
            mb.kind = MbKind::Inter;
            let dx = read_se(br)?;
            let dy = read_se(br)?;
            mb.mv = offset_mv(mvp, dx, dy)?;
            let cbp = read_cbp(br, false)?;
            mb.set_cbp(cbp);
        }
    }

    if mb.has_qp_delta() {
        let delta = read_se(br)?;
        mb.committed_qp = apply_qp_delta(prev_qp, delta)?;
        mb.qp_delta = delta;
    } else {
        mb.committed_qp = prev_qp;
    }
    mb.probe_qp = mb.committed_qp;
    *grid.get_mut(idx) = mb;

    read_residual(br, grid, idx)
}

fn offset_mv(mvp: MotionVector, dx: i32, dy: i32) -> TaoResult<MotionVector> {
    let x = i32::from(mvp.x) + dx;
    let y = i32::from(mvp.y) + dy;
    match (i16::try_from(x), i16::try_from(y)) {
        (Ok(x), Ok(y)) => Ok(MotionVector::new(x, y)),
        _ => Err(TaoError::InvalidData(format!("运动矢量越界: ({x}, {y})"))),
    }
}

fn read_residual(br: &mut BitReader, grid: &mut MacroblockGrid, idx: usize) -> TaoResult<()> {
    let (intra16, cbp_luma, cbp_chroma) = {
        let mb = grid.get(idx);
        (mb.kind == MbKind::Intra16x16, mb.cbp_luma, mb.cbp_chroma)
    };

    if intra16 {
        let nc = grid.luma_nc(idx, 0);
        let mut scan = [0i32; 16];
        let stats = decode_block(br, &mut scan, nc, false)?;
        let dc = &mut grid.get_mut(idx).luma_dc;
        dc.coeffs = scan_to_raster(&scan);
        dc.total_coeff = stats.total_coeff;
        dc.coded = true;
    }

    for &raster in &LUMA_CODING_ORDER {
        if cbp_luma & (1 << block8x8_of(raster)) == 0 {
            continue;
        }
        let nc = grid.luma_nc(idx, raster);
        let mut scan = [0i32; 16];
        let stats = decode_block(br, &mut scan, nc, intra16)?;
        let blk = &mut grid.get_mut(idx).luma[raster];
        blk.coeffs = scan_to_raster(&scan);
        blk.total_coeff = stats.total_coeff;
        blk.coded = true;
    }

    if cbp_chroma > 0 {
        for plane in 0..2 {
            let mut coeffs = [0i32; 4];
            let stats = decode_block(br, &mut coeffs, NC_CHROMA_DC_420, false)?;
            let blk = &mut grid.get_mut(idx).chroma_dc[plane];
            blk.coeffs = coeffs;
            blk.total_coeff = stats.total_coeff;
            blk.coded = true;
        }
    }

    if cbp_chroma == 2 {
        for plane in 0..2 {
            for b in 0..4 {
                let nc = grid.chroma_nc(idx, plane, b);
                let mut scan = [0i32; 16];
                let stats = decode_block(br, &mut scan, nc, true)?;
                let blk = &mut grid.get_mut(idx).chroma_ac[plane][b];
                blk.coeffs = scan_to_raster(&scan);
                blk.total_coeff = stats.total_coeff;
                blk.coded = true;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::h264::macroblock::Intra16x16Mode;

    fn intra_mb(qp: u8) -> Macroblock {
        let mut mb = Macroblock {
            kind: MbKind::Intra16x16,
            luma_mode: Intra16x16Mode::Dc,
            chroma_mode: IntraChromaMode::Dc,
            probe_qp: qp,
            committed_qp: qp,
            ..Macroblock::default()
        };
        mb.luma_dc.coeffs[0] = 12;
        mb.luma_dc.coeffs[5] = -3;
        mb.luma[6].coeffs[1] = 2;
        mb.luma[6].coeffs[4] = -1;
        mb.chroma_dc[1].coeffs = [4, 0, -1, 0];
        mb.chroma_ac[0][3].coeffs[2] = 1;
        mb.derive_cbp();
        mb
    }

    fn assert_same_coeffs(a: &Macroblock, b: &Macroblock) {
        assert_eq!(a.kind, b.kind);
        assert_eq!(a.cbp(), b.cbp());
        assert_eq!(a.committed_qp, b.committed_qp);
        assert_eq!(a.mv, b.mv);
        assert_eq!(a.luma_dc.coeffs, b.luma_dc.coeffs);
        for i in 0..16 {
            assert_eq!(a.luma[i].coeffs, b.luma[i].coeffs, "luma[{i}]");
            assert_eq!(a.luma[i].total_coeff, b.luma[i].total_coeff, "luma[{i}] total");
        }
        assert_eq!(a.chroma_dc, b.chroma_dc);
        assert_eq!(a.chroma_ac, b.chroma_ac);
    }

    #[test]
    fn test_帧内宏块写读一致() {
        let mut enc = MacroblockGrid::new(2, 1);
        *enc.get_mut(0) = intra_mb(26);
        let mut mb1 = intra_mb(30);
        mb1.qp_delta = 4;
        mb1.luma_mode = Intra16x16Mode::Horizontal;
        *enc.get_mut(1) = mb1;

        let mut bw = BitWriter::new();
        write_macroblock(&mut bw, &mut enc, 0, SliceType::I).unwrap();
        write_macroblock(&mut bw, &mut enc, 1, SliceType::I).unwrap();
        let bits = bw.bits_written();
        let data = bw.finish();

        let mut dec = MacroblockGrid::new(2, 1);
        let mut br = BitReader::with_bit_len(&data, bits);
        read_macroblock(&mut br, &mut dec, 0, SliceType::I, 26).unwrap();
        read_macroblock(&mut br, &mut dec, 1, SliceType::I, 26).unwrap();
        assert_eq!(br.bits_left(), 0);

        assert_same_coeffs(enc.get(0), dec.get(0));
        assert_same_coeffs(enc.get(1), dec.get(1));
        assert_eq!(dec.get(1).luma_mode, Intra16x16Mode::Horizontal);
        assert_eq!(dec.get(1).committed_qp, 30);
    }

    #[test]
    fn test_计数模式与写出模式位数相同() {
        let mut grid = MacroblockGrid::new(1, 1);
        *grid.get_mut(0) = intra_mb(20);
        let mut counter = BitWriter::counter();
        write_macroblock(&mut counter, &mut grid, 0, SliceType::I).unwrap();
        let mut writer = BitWriter::new();
        write_macroblock(&mut writer, &mut grid, 0, SliceType::I).unwrap();
        assert_eq!(counter.bits_written(), writer.bits_written());
    }

    #[test]
    fn test_帧间宏块与跳过游程() {
        let mut enc = MacroblockGrid::new(4, 1);
        let mut dec = MacroblockGrid::new(4, 1);
        let qp = 28;

        // [coded, skip, skip, coded]
        let mut bw = BitWriter::new();
        let mut first = Macroblock {
            kind: MbKind::Inter,
            mv: MotionVector::new(8, -4),
            probe_qp: qp,
            committed_qp: qp,
            ..Macroblock::default()
        };
        first.luma[9].coeffs[0] = 3;
        first.derive_cbp();
        *enc.get_mut(0) = first;
        write_skip_run(&mut bw, 0).unwrap();
        write_macroblock(&mut bw, &mut enc, 0, SliceType::P).unwrap();
        mark_skip(&mut enc, 1, qp);
        mark_skip(&mut enc, 2, qp);
        assert_eq!(enc.skip_run_before(3), 2);
        write_skip_run(&mut bw, enc.skip_run_before(3)).unwrap();
        *enc.get_mut(3) = Macroblock {
            kind: MbKind::Inter,
            mv: MotionVector::new(0, 4),
            probe_qp: qp,
            committed_qp: qp,
            ..Macroblock::default()
        };
        write_macroblock(&mut bw, &mut enc, 3, SliceType::P).unwrap();
        let bits = bw.bits_written();
        let data = bw.finish();

        let mut br = BitReader::with_bit_len(&data, bits);
        let mut idx = 0;
        let mut runs = Vec::new();
        while idx < 4 {
            let run = read_skip_run(&mut br, 4 - idx).unwrap();
            runs.push(run);
            for _ in 0..run {
                mark_skip(&mut dec, idx, qp);
                idx += 1;
            }
            if idx == 4 {
                break;
            }
            read_macroblock(&mut br, &mut dec, idx, SliceType::P, qp).unwrap();
            idx += 1;
        }
        assert_eq!(runs, vec![0, 2]);
        let kinds: Vec<MbKind> = dec.iter().map(|mb| mb.kind).collect();
        assert_eq!(kinds, [MbKind::Inter, MbKind::Skip, MbKind::Skip, MbKind::Inter]);
        assert_same_coeffs(enc.get(0), dec.get(0));
        assert_same_coeffs(enc.get(3), dec.get(3));
        assert_eq!(dec.get(1).mv, enc.get(1).mv);
    }

    #[test]
    fn test_截断码流报告比特耗尽() {
        let mut grid = MacroblockGrid::new(1, 1);
        *grid.get_mut(0) = intra_mb(26);
        let mut bw = BitWriter::new();
        write_macroblock(&mut bw, &mut grid, 0, SliceType::I).unwrap();
        let bits = bw.bits_written();
        let data = bw.finish();

        let mut dec = MacroblockGrid::new(1, 1);
        let mut br = BitReader::with_bit_len(&data, bits - 3);
        let err = read_macroblock(&mut br, &mut dec, 0, SliceType::I, 26).unwrap_err();
        assert!(err.is_bit_exhausted(), "{err:?}");
    }

    #[test]
    fn test_帧间宏块不允许出现在i_slice() {
        let mut grid = MacroblockGrid::new(1, 1);
        grid.get_mut(0).kind = MbKind::Inter;
        let mut bw = BitWriter::counter();
        assert!(write_macroblock(&mut bw, &mut grid, 0, SliceType::I).is_err());
    }
}
