//! CAVLC 残差熵编解码.
//!
//! 对 4x4 (含去掉 DC 的 15 系数 AC 块) 和色度 DC 块进行
//! coeff_token / 拖尾 ±1 符号 / level / total_zeros / run_before 编解码,
//! 以及 coded_block_pattern 的 me(v) 映射.
//!
//! 系数统一以扫描顺序 (zigzag 或色度 DC 光栅) 传入传出.

mod tables;

use log::trace;
use tao_core::{BitReader, BitWriter, TaoError, TaoResult};

use crate::parsers::h264::exp_golomb::{read_ue_max, ue_len, write_ue};

use tables::{
    CBP_INTER_TO_CODE, CBP_INTRA_TO_CODE, COEFF_TOKEN_CHROMA_DC, COEFF_TOKEN_CHROMA_DC422,
    COEFF_TOKEN_NC0, COEFF_TOKEN_NC2, COEFF_TOKEN_NC4, RUN_BEFORE, TOTAL_ZEROS_2X2,
    TOTAL_ZEROS_2X4, TOTAL_ZEROS_4X4,
};

/// 色度 DC 2x2 (4:2:0) 的 nC 哨兵值
pub const NC_CHROMA_DC_420: i32 = -1;
/// 色度 DC 2x4 (4:2:2) 的 nC 哨兵值
pub const NC_CHROMA_DC_422: i32 = -2;

/// level_prefix 的上限, 超过即视为失步
const MAX_LEVEL_PREFIX: u32 = 28;

/// 一个块的编解码统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CavlcStats {
    /// 非零系数个数 (coeff_token 中的 TotalCoeff)
    pub total_coeff: u8,
    /// 本块消耗的比特数
    pub bits: usize,
}

// ============================================================
// nC 计算
// ============================================================

/// 由左/上邻块的非零系数个数计算 nC
///
/// 两者都可用时取 `(a + b + 1) >> 1`, 只有一个时取该值, 都不可用时为 0.
pub fn predict_nc(left: Option<u8>, above: Option<u8>) -> i32 {
    match (left, above) {
        (Some(a), Some(b)) => (i32::from(a) + i32::from(b) + 1) >> 1,
        (Some(a), None) => i32::from(a),
        (None, Some(b)) => i32::from(b),
        (None, None) => 0,
    }
}

// ============================================================
// coeff_token
// ============================================================

enum TokenTable {
    Vlc(&'static [[(u8, u16); 17]; 4]),
    ChromaDc,
    ChromaDc422,
    Flc,
}

fn token_table(nc: i32) -> TaoResult<TokenTable> {
    Ok(match nc {
        NC_CHROMA_DC_422 => TokenTable::ChromaDc422,
        NC_CHROMA_DC_420 => TokenTable::ChromaDc,
        0 | 1 => TokenTable::Vlc(&COEFF_TOKEN_NC0),
        2 | 3 => TokenTable::Vlc(&COEFF_TOKEN_NC2),
        4..=7 => TokenTable::Vlc(&COEFF_TOKEN_NC4),
        8..=16 => TokenTable::Flc,
        _ => {
            return Err(TaoError::InvalidArgument(format!("CAVLC: 非法 nC={nc}")));
        }
    })
}

fn token_entry(table: &TokenTable, trailing_ones: usize, total_coeff: usize) -> (u8, u16) {
    match table {
        TokenTable::Vlc(t) => t[trailing_ones][total_coeff],
        TokenTable::ChromaDc => COEFF_TOKEN_CHROMA_DC[trailing_ones][total_coeff],
        TokenTable::ChromaDc422 => COEFF_TOKEN_CHROMA_DC422[trailing_ones][total_coeff],
        TokenTable::Flc => {
            if total_coeff == 0 {
                (6, 0b000011)
            } else {
                (6, (((total_coeff - 1) << 2) | trailing_ones) as u16)
            }
        }
    }
}

fn write_coeff_token(
    bw: &mut BitWriter,
    table: &TokenTable,
    trailing_ones: usize,
    total_coeff: usize,
) -> TaoResult<()> {
    let (len, code) = token_entry(table, trailing_ones, total_coeff);
    if len == 0 {
        return Err(TaoError::Internal(format!(
            "coeff_token 组合不存在: t1={trailing_ones}, tc={total_coeff}"
        )));
    }
    bw.write_bits(u32::from(code), u32::from(len))
}

fn read_coeff_token(br: &mut BitReader, table: &TokenTable) -> TaoResult<(usize, usize)> {
    if let TokenTable::Flc = table {
        let v = br.read_bits(6)? as usize;
        if v == 0b000011 {
            return Ok((0, 0));
        }
        let total_coeff = (v >> 2) + 1;
        let trailing_ones = v & 3;
        if trailing_ones > total_coeff {
            return Err(TaoError::VlcSyncLoss(format!("coeff_token FLC 非法: {v:06b}")));
        }
        return Ok((trailing_ones, total_coeff));
    }
    let max_tc = match table {
        TokenTable::ChromaDc => 4,
        TokenTable::ChromaDc422 => 8,
        _ => 16,
    };
    let mut code = 0u32;
    for len in 1..=16u8 {
        code = (code << 1) | br.read_bit()?;
        for t1 in 0..4 {
            for tc in t1..=max_tc {
                let (l, c) = token_entry(table, t1, tc);
                if l == len && u32::from(c) == code {
                    return Ok((t1, tc));
                }
            }
        }
    }
    Err(TaoError::VlcSyncLoss(format!("coeff_token 无匹配码字: {code:016b}")))
}

// ============================================================
// level
// ============================================================

fn write_level(bw: &mut BitWriter, level_code: i64, suffix_len: u32) -> TaoResult<()> {
    let (prefix, suffix, suffix_size) = if suffix_len == 0 && level_code < 14 {
        (level_code as u32, 0u64, 0u32)
    } else if suffix_len == 0 && level_code < 30 {
        (14, (level_code - 14) as u64, 4)
    } else if suffix_len > 0 && level_code < (15i64 << suffix_len) {
        (
            (level_code >> suffix_len) as u32,
            (level_code & ((1i64 << suffix_len) - 1)) as u64,
            suffix_len,
        )
    } else {
        let escape = level_code - (15i64 << suffix_len) - if suffix_len == 0 { 15 } else { 0 };
        if escape < 4096 {
            (15, escape as u64, 12)
        } else {
            let mut prefix = 16u32;
            loop {
                let offset = (1i64 << (prefix - 3)) - 4096;
                if escape < offset + (1i64 << (prefix - 3)) {
                    break (prefix, (escape - offset) as u64, prefix - 3);
                }
                prefix += 1;
                if prefix > MAX_LEVEL_PREFIX {
                    return Err(TaoError::InvalidArgument(format!(
                        "CAVLC: level 超出可编码范围, level_code={level_code}"
                    )));
                }
            }
        }
    };

    let needed = (prefix + 1 + suffix_size) as usize;
    if let Some(remaining) = bw.remaining_bits() {
        if needed > remaining {
            return Err(TaoError::BitExhausted {
                needed,
                available: remaining,
            });
        }
    }
    bw.write_zeros_then_one(prefix)?;
    if suffix_size > 0 {
        bw.write_bits_u64(suffix, suffix_size)?;
    }
    Ok(())
}

fn read_level(br: &mut BitReader, suffix_len: u32) -> TaoResult<i64> {
    let mut prefix = 0u32;
    while br.read_bit()? == 0 {
        prefix += 1;
        if prefix > MAX_LEVEL_PREFIX {
            return Err(TaoError::VlcSyncLoss(format!("level_prefix 过长: {prefix}")));
        }
    }
    let suffix_size = if prefix == 14 && suffix_len == 0 {
        4
    } else if prefix >= 15 {
        prefix - 3
    } else {
        suffix_len
    };
    let suffix = if suffix_size > 0 {
        br.read_bits_u64(suffix_size)? as i64
    } else {
        0
    };
    let mut level_code = (i64::from(prefix.min(15)) << suffix_len) + suffix;
    if prefix >= 15 && suffix_len == 0 {
        level_code += 15;
    }
    if prefix >= 16 {
        level_code += (1i64 << (prefix - 3)) - 4096;
    }
    Ok(level_code)
}

// ============================================================
// total_zeros / run_before
// ============================================================

fn total_zeros_entry(max_coeff: usize, total_coeff: usize, total_zeros: usize) -> (u8, u8) {
    match max_coeff {
        4 => TOTAL_ZEROS_2X2[total_coeff - 1]
            .get(total_zeros)
            .copied()
            .unwrap_or((0, 0)),
        8 => TOTAL_ZEROS_2X4[total_coeff - 1]
            .get(total_zeros)
            .copied()
            .unwrap_or((0, 0)),
        _ => TOTAL_ZEROS_4X4[total_coeff - 1]
            .get(total_zeros)
            .copied()
            .unwrap_or((0, 0)),
    }
}

fn read_total_zeros(br: &mut BitReader, max_coeff: usize, total_coeff: usize) -> TaoResult<usize> {
    let limit = max_coeff - total_coeff;
    let mut code = 0u32;
    for len in 1..=9u8 {
        code = (code << 1) | br.read_bit()?;
        for tz in 0..=limit {
            let (l, c) = total_zeros_entry(max_coeff, total_coeff, tz);
            if l == len && u32::from(c) == code {
                return Ok(tz);
            }
        }
    }
    Err(TaoError::VlcSyncLoss(format!(
        "total_zeros 无匹配码字: tc={total_coeff}, code={code:b}"
    )))
}

fn read_run_before(br: &mut BitReader, zeros_left: usize) -> TaoResult<usize> {
    let row = &RUN_BEFORE[zeros_left.min(7) - 1];
    let mut code = 0u32;
    for len in 1..=11u8 {
        code = (code << 1) | br.read_bit()?;
        for (run, &(l, c)) in row.iter().enumerate() {
            if l == len && u32::from(c) == code {
                if run > zeros_left {
                    return Err(TaoError::VlcSyncLoss(format!(
                        "run_before={run} 超过剩余零个数 {zeros_left}"
                    )));
                }
                return Ok(run);
            }
        }
    }
    Err(TaoError::VlcSyncLoss(format!("run_before 无匹配码字: {code:b}")))
}

fn check_block_shape(len: usize, nc: i32) -> TaoResult<()> {
    let ok = match nc {
        NC_CHROMA_DC_420 => len == 4,
        NC_CHROMA_DC_422 => len == 8,
        _ => len == 15 || len == 16,
    };
    if ok {
        Ok(())
    } else {
        Err(TaoError::InvalidArgument(format!(
            "CAVLC: 系数个数 {len} 与 nC={nc} 不匹配"
        )))
    }
}

// ============================================================
// 块编解码
// ============================================================

/// 编码一个残差块
///
/// `scan` 为扫描顺序的系数. `dc_skip` 为真时跳过 `scan[0]`
/// (Intra16x16 与色度的 AC 块, DC 已单独编码), 此时最大系数数为 15.
pub fn encode_block(
    bw: &mut BitWriter,
    scan: &[i32],
    nc: i32,
    dc_skip: bool,
) -> TaoResult<CavlcStats> {
    let coeffs = if dc_skip { scan.get(1..).unwrap_or(&[]) } else { scan };
    let max_coeff = coeffs.len();
    check_block_shape(max_coeff, nc)?;
    let table = token_table(nc)?;
    let start = bw.bits_written();

    // 从高频到低频收集非零系数及其前面的零游程
    let mut levels = [0i32; 16];
    let mut runs = [0usize; 16];
    let mut total = 0usize;
    let mut last_pos: Option<usize> = None;
    for pos in (0..max_coeff).rev() {
        let c = coeffs[pos];
        if c == 0 {
            continue;
        }
        if total > 0 {
            if let Some(prev) = last_pos {
                runs[total - 1] = prev - pos - 1;
            }
        }
        levels[total] = c;
        last_pos = Some(pos);
        total += 1;
    }
    if let Some(lowest) = last_pos {
        runs[total - 1] = lowest;
    }

    let mut trailing_ones = 0usize;
    while trailing_ones < total.min(3) && levels[trailing_ones].abs() == 1 {
        trailing_ones += 1;
    }

    write_coeff_token(bw, &table, trailing_ones, total)?;
    if total == 0 {
        return Ok(CavlcStats {
            total_coeff: 0,
            bits: bw.bits_written() - start,
        });
    }

    for &level in &levels[..trailing_ones] {
        bw.write_flag(level < 0)?;
    }

    let mut suffix_len = if total > 10 && trailing_ones < 3 { 1 } else { 0 };
    for (i, &level) in levels.iter().enumerate().take(total).skip(trailing_ones) {
        let mut level_code = if level > 0 {
            2 * i64::from(level) - 2
        } else {
            -2 * i64::from(level) - 1
        };
        if i == trailing_ones && trailing_ones < 3 {
            level_code -= 2;
        }
        write_level(bw, level_code, suffix_len)?;
        if suffix_len == 0 {
            suffix_len = 1;
        }
        if i64::from(level).abs() > (3i64 << (suffix_len - 1)) && suffix_len < 6 {
            suffix_len += 1;
        }
    }

    let total_zeros: usize = runs[..total].iter().sum();
    if total < max_coeff {
        let (len, code) = total_zeros_entry(max_coeff, total, total_zeros);
        bw.write_bits(u32::from(code), u32::from(len))?;
    }

    let mut zeros_left = total_zeros;
    for &run in runs.iter().take(total - 1) {
        if zeros_left == 0 {
            break;
        }
        let (len, code) = RUN_BEFORE[zeros_left.min(7) - 1][run];
        bw.write_bits(u32::from(code), u32::from(len))?;
        zeros_left -= run;
    }

    let bits = bw.bits_written() - start;
    trace!("CAVLC 编码: nC={nc}, tc={total}, t1={trailing_ones}, tz={total_zeros}, bits={bits}");
    Ok(CavlcStats {
        total_coeff: total as u8,
        bits,
    })
}

/// 解码一个残差块
///
/// 结果以扫描顺序写入 `scan`. `dc_skip` 为真时不触碰 `scan[0]`.
pub fn decode_block(
    br: &mut BitReader,
    scan: &mut [i32],
    nc: i32,
    dc_skip: bool,
) -> TaoResult<CavlcStats> {
    let offset = usize::from(dc_skip);
    let max_coeff = scan.len().saturating_sub(offset);
    check_block_shape(max_coeff, nc)?;
    let table = token_table(nc)?;
    let start = br.bits_read();

    for c in scan[offset..].iter_mut() {
        *c = 0;
    }

    let (trailing_ones, total) = read_coeff_token(br, &table)?;
    if total > max_coeff {
        return Err(TaoError::VlcSyncLoss(format!(
            "TotalCoeff={total} 超过块容量 {max_coeff}"
        )));
    }
    if total == 0 {
        return Ok(CavlcStats {
            total_coeff: 0,
            bits: br.bits_read() - start,
        });
    }

    let mut levels = [0i64; 16];
    for level in levels.iter_mut().take(trailing_ones) {
        *level = if br.read_flag()? { -1 } else { 1 };
    }

    let mut suffix_len = if total > 10 && trailing_ones < 3 { 1 } else { 0 };
    for i in trailing_ones..total {
        let mut level_code = read_level(br, suffix_len)?;
        if i == trailing_ones && trailing_ones < 3 {
            level_code += 2;
        }
        let level = if level_code % 2 == 0 {
            (level_code + 2) >> 1
        } else {
            -((level_code + 1) >> 1)
        };
        levels[i] = level;
        if suffix_len == 0 {
            suffix_len = 1;
        }
        if level.abs() > (3i64 << (suffix_len - 1)) && suffix_len < 6 {
            suffix_len += 1;
        }
    }

    let total_zeros = if total < max_coeff {
        read_total_zeros(br, max_coeff, total)?
    } else {
        0
    };

    let mut runs = [0usize; 16];
    let mut zeros_left = total_zeros;
    for run in runs.iter_mut().take(total - 1) {
        if zeros_left == 0 {
            break;
        }
        *run = read_run_before(br, zeros_left)?;
        zeros_left -= *run;
    }
    runs[total - 1] = zeros_left;

    let mut pos: isize = -1;
    for k in (0..total).rev() {
        pos += runs[k] as isize + 1;
        let level = i32::try_from(levels[k])
            .map_err(|_| TaoError::VlcSyncLoss(format!("level 超出范围: {}", levels[k])))?;
        scan[offset + pos as usize] = level;
    }

    Ok(CavlcStats {
        total_coeff: total as u8,
        bits: br.bits_read() - start,
    })
}

// ============================================================
// coded_block_pattern me(v)
// ============================================================

/// 写入 coded_block_pattern (me(v))
pub fn write_cbp(bw: &mut BitWriter, cbp: u8, intra: bool) -> TaoResult<()> {
    let table = if intra {
        &CBP_INTRA_TO_CODE
    } else {
        &CBP_INTER_TO_CODE
    };
    let code = table.get(usize::from(cbp)).ok_or_else(|| {
        TaoError::InvalidArgument(format!("coded_block_pattern 越界: {cbp}"))
    })?;
    write_ue(bw, u32::from(*code))
}

/// 读取 coded_block_pattern (me(v))
pub fn read_cbp(br: &mut BitReader, intra: bool) -> TaoResult<u8> {
    let code = read_ue_max(br, 47, "coded_block_pattern")?;
    let table = if intra {
        &CBP_INTRA_TO_CODE
    } else {
        &CBP_INTER_TO_CODE
    };
    table
        .iter()
        .position(|&c| u32::from(c) == code)
        .map(|cbp| cbp as u8)
        .ok_or_else(|| TaoError::VlcSyncLoss(format!("coded_block_pattern 码号无映射: {code}")))
}

/// coded_block_pattern 的码长
pub fn cbp_len(cbp: u8, intra: bool) -> u32 {
    let table = if intra {
        &CBP_INTRA_TO_CODE
    } else {
        &CBP_INTER_TO_CODE
    };
    let code = table.get(usize::from(cbp)).copied().unwrap_or(0);
    ue_len(u32::from(code))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(scan: &[i32], nc: i32, dc_skip: bool) {
        let mut bw = BitWriter::new();
        let enc = encode_block(&mut bw, scan, nc, dc_skip).expect("编码失败");
        assert_eq!(enc.bits, bw.bits_written(), "统计位数应等于写入位数");
        let bits = bw.bits_written();
        let data = bw.finish();

        let mut out = vec![0i32; scan.len()];
        if dc_skip {
            out[0] = scan[0];
        }
        let mut br = BitReader::with_bit_len(&data, bits);
        let dec = decode_block(&mut br, &mut out, nc, dc_skip).expect("解码失败");
        assert_eq!(out, scan, "nC={nc} 系数往返不一致");
        assert_eq!(dec, enc, "编解码统计不一致");
        assert_eq!(br.bits_read(), bits);
    }

    #[test]
    fn test_全零块只编码_coeff_token() {
        let mut bw = BitWriter::new();
        let stats = encode_block(&mut bw, &[0; 16], 0, false).unwrap();
        assert_eq!(stats.total_coeff, 0);
        assert_eq!(stats.bits, 1, "nC=0 时全零块为 1 位码字");
        round_trip(&[0; 16], 5, false);
        round_trip(&[0; 16], 9, false);
    }

    #[test]
    fn test_标准示例块编码() {
        let scan = [0, 3, -1, 0, 0, -1, 1, 0, 1, 0, 0, 0, 0, 0, 0, 0];
        let mut bw = BitWriter::new();
        let stats = encode_block(&mut bw, &scan, 0, false).unwrap();
        assert_eq!(stats.total_coeff, 5);
        let bits = bw.bits_written();
        let data = bw.finish();
        let mut br = BitReader::with_bit_len(&data, bits);
        // coeff_token | 符号 | level -1, 3 | total_zeros=4 | run_before 1,0,2,0
        // 0000100 001 01 0010 110 10 11 01 1
        assert_eq!(bits, 26);
        assert_eq!(br.read_bits(26).unwrap(), 0b00001000010100101101011011);
    }

    #[test]
    fn test_各种_nc_与块形状往返() {
        let patterns: [[i32; 16]; 5] = [
            [1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
            [7, -3, 2, 1, -1, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0],
            [-20, 15, 0, 9, 0, 0, -4, 3, 0, 1, 1, 0, 0, 0, 0, -1],
            [2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2],
            [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1],
        ];
        for nc in [0, 1, 2, 3, 4, 6, 8, 12, 16] {
            for p in &patterns {
                round_trip(p, nc, false);
                round_trip(p, nc, true);
            }
        }
    }

    #[test]
    fn test_大幅值_level_转义() {
        let scan = [
            3000, -5000, 40, 16, 15, 14, 13, -30, 100_000, 0, 1, -1, 1, 0, 0, 0,
        ];
        for nc in [0, 2, 4, 8] {
            round_trip(&scan, nc, false);
        }
        let mut single = [0i32; 16];
        single[0] = -70_000;
        round_trip(&single, 0, false);
    }

    #[test]
    fn test_色度_dc_往返() {
        for dc in [[0, 0, 0, 0], [1, 0, 0, 0], [0, 0, 0, -1], [5, -2, 1, 1], [-9, 0, 3, 0]] {
            round_trip(&dc, NC_CHROMA_DC_420, false);
        }
        for dc in [[1, 0, 0, 0, 0, 0, 0, 0], [0, 3, 0, -1, 0, 0, 1, 1], [4; 8]] {
            round_trip(&dc, NC_CHROMA_DC_422, false);
        }
    }

    #[test]
    fn test_只计数模式与写入模式位数一致() {
        let scan = [9, -3, 0, 2, 1, 0, -1, 0, 0, 1, 0, 0, 0, 0, 0, 0];
        let mut w = BitWriter::new();
        let mut c = BitWriter::counter();
        let a = encode_block(&mut w, &scan, 3, false).unwrap();
        let b = encode_block(&mut c, &scan, 3, false).unwrap();
        assert_eq!(a, b);
        assert_eq!(w.bits_written(), c.bits_written());
    }

    #[test]
    fn test_写入上限触发比特不足() {
        let scan = [9, -3, 0, 2, 1, 0, -1, 0, 0, 1, 0, 0, 0, 0, 0, 0];
        let mut bw = BitWriter::counter().with_limit(6);
        let err = encode_block(&mut bw, &scan, 0, false).unwrap_err();
        assert!(err.is_bit_exhausted(), "应报告比特不足: {err}");
    }

    #[test]
    fn test_垃圾数据报告失步或比特不足() {
        // 16 个 0 无法匹配任何 coeff_token
        let data = [0u8, 0, 0];
        let mut out = [0i32; 16];
        let mut br = BitReader::new(&data);
        let err = decode_block(&mut br, &mut out, 0, false).unwrap_err();
        assert!(matches!(err, TaoError::VlcSyncLoss(_)), "{err}");

        // 码流在 level 中途截断
        let scan = [40, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        let mut bw = BitWriter::new();
        encode_block(&mut bw, &scan, 0, false).unwrap();
        let bits = bw.bits_written();
        let data = bw.finish();
        let mut br = BitReader::with_bit_len(&data, bits - 3);
        let err = decode_block(&mut br, &mut out, 0, false).unwrap_err();
        assert!(err.is_bit_exhausted(), "{err}");
    }

    #[test]
    fn test_非法块形状被拒绝() {
        let mut bw = BitWriter::new();
        assert!(encode_block(&mut bw, &[0; 4], 0, false).is_err());
        assert!(encode_block(&mut bw, &[0; 16], NC_CHROMA_DC_420, false).is_err());
        assert!(encode_block(&mut bw, &[0; 16], 17, false).is_err());
    }

    #[test]
    fn test_cbp_映射可逆() {
        for intra in [true, false] {
            for cbp in 0..48u8 {
                let mut bw = BitWriter::new();
                write_cbp(&mut bw, cbp, intra).unwrap();
                assert_eq!(bw.bits_written() as u32, cbp_len(cbp, intra));
                let bits = bw.bits_written();
                let data = bw.finish();
                let mut br = BitReader::with_bit_len(&data, bits);
                assert_eq!(read_cbp(&mut br, intra).unwrap(), cbp);
            }
        }
    }

    #[test]
    fn test_nc_邻居平均() {
        assert_eq!(predict_nc(None, None), 0);
        assert_eq!(predict_nc(Some(3), None), 3);
        assert_eq!(predict_nc(None, Some(7)), 7);
        assert_eq!(predict_nc(Some(3), Some(4)), 4);
        assert_eq!(predict_nc(Some(16), Some(16)), 16);
    }
}
