//! 4x4 整数变换与标量量化.
//!
//! 全部为纯整数运算, QP 由调用方逐次传入, 不保存任何模式状态.
//! 系数块统一按光栅顺序 (`row * 4 + col`) 存放.
//!
//! - AC 路径把核心变换与量化分开, 以便先取出 DC 项交给 DC 块;
//! - DC 路径 (Intra16x16 亮度 4x4 DC, 色度 2x2 DC) 的 Hadamard 与量化一次完成.

/// 4x4 zigzag 扫描: 扫描位置 → 光栅下标
pub const ZIGZAG_4X4: [usize; 16] = [0, 1, 4, 8, 5, 2, 3, 6, 9, 12, 13, 10, 7, 11, 14, 15];

/// QP 最大值
pub const MAX_QP: u8 = 51;

// ============================================================
// 量化参数表
// ============================================================

/// 正向量化乘数 MF: [qp % 6][位置类别]
const QUANT_MF: [[i64; 3]; 6] = [
    [13107, 8066, 5243],
    [11916, 7490, 4660],
    [10082, 6554, 4194],
    [9362, 5825, 3647],
    [8192, 5243, 3355],
    [7282, 4559, 2893],
];

/// LevelScale 表: [qp % 6][位置类别]
const LEVEL_SCALE: [[i32; 3]; 6] = [
    [10, 13, 16],
    [11, 14, 18],
    [13, 16, 20],
    [14, 18, 23],
    [16, 20, 25],
    [18, 23, 29],
];

#[rustfmt::skip]
const CHROMA_QP_TABLE: [u8; 52] = [
     0,  1,  2,  3,  4,  5,  6,  7,  8,  9, 10, 11, 12, 13, 14, 15,
    16, 17, 18, 19, 20, 21, 22, 23, 24, 25, 26, 27, 28, 29, 29, 30,
    31, 32, 32, 33, 34, 34, 35, 35, 36, 36, 37, 37, 37, 38, 38, 38,
    39, 39, 39, 39,
];

/// 位置类别: 0 = 偶行偶列, 1 = 奇偶混合, 2 = 奇行奇列
fn position_class(idx: usize) -> usize {
    let r = (idx / 4) & 1;
    let c = idx & 1;
    match (r, c) {
        (0, 0) => 0,
        (1, 1) => 2,
        _ => 1,
    }
}

/// 亮度 QP 映射到色度 QP
pub fn chroma_qp(qp: u8, offset: i32) -> u8 {
    let qpc = (i32::from(qp) + offset).clamp(0, i32::from(MAX_QP));
    CHROMA_QP_TABLE[qpc as usize]
}

fn quant_params(qp: u8, intra: bool) -> (u32, i64) {
    let qbits = 15 + u32::from(qp / 6);
    let f = (1i64 << qbits) / if intra { 3 } else { 6 };
    (qbits, f)
}

fn quantize_one(w: i32, mf: i64, f: i64, qbits: u32) -> i32 {
    let level = ((i64::from(w).abs() * mf + f) >> qbits) as i32;
    if w < 0 { -level } else { level }
}

// ============================================================
// 扫描顺序转换
// ============================================================

/// 光栅顺序 → zigzag 扫描顺序
pub fn raster_to_scan(raster: &[i32; 16]) -> [i32; 16] {
    let mut scan = [0i32; 16];
    for (s, &r) in ZIGZAG_4X4.iter().enumerate() {
        scan[s] = raster[r];
    }
    scan
}

/// zigzag 扫描顺序 → 光栅顺序
pub fn scan_to_raster(scan: &[i32; 16]) -> [i32; 16] {
    let mut raster = [0i32; 16];
    for (s, &r) in ZIGZAG_4X4.iter().enumerate() {
        raster[r] = scan[s];
    }
    raster
}

// ============================================================
// 4x4 AC 路径
// ============================================================

/// 4x4 正向核心变换 (不含缩放)
pub fn forward_core_4x4(residual: &[i32; 16]) -> [i32; 16] {
    let mut temp = [0i32; 16];
    for i in 0..4 {
        let s = i * 4;
        let s03 = residual[s] + residual[s + 3];
        let d03 = residual[s] - residual[s + 3];
        let s12 = residual[s + 1] + residual[s + 2];
        let d12 = residual[s + 1] - residual[s + 2];
        temp[s] = s03 + s12;
        temp[s + 1] = 2 * d03 + d12;
        temp[s + 2] = s03 - s12;
        temp[s + 3] = d03 - 2 * d12;
    }

    let mut out = [0i32; 16];
    for j in 0..4 {
        let s03 = temp[j] + temp[12 + j];
        let d03 = temp[j] - temp[12 + j];
        let s12 = temp[4 + j] + temp[8 + j];
        let d12 = temp[4 + j] - temp[8 + j];
        out[j] = s03 + s12;
        out[4 + j] = 2 * d03 + d12;
        out[8 + j] = s03 - s12;
        out[12 + j] = d03 - 2 * d12;
    }
    out
}

/// 量化核心变换系数
///
/// `skip_dc` 为真时位置 0 输出 0 (DC 已交给 DC 块).
pub fn quantize_4x4(coeffs: &[i32; 16], qp: u8, intra: bool, skip_dc: bool) -> [i32; 16] {
    let (qbits, f) = quant_params(qp, intra);
    let row = &QUANT_MF[usize::from(qp % 6)];
    let mut out = [0i32; 16];
    for (i, (&w, o)) in coeffs.iter().zip(out.iter_mut()).enumerate() {
        if skip_dc && i == 0 {
            continue;
        }
        *o = quantize_one(w, row[position_class(i)], f, qbits);
    }
    out
}

/// 正向变换 + 量化
pub fn forward_4x4(residual: &[i32; 16], qp: u8, intra: bool) -> [i32; 16] {
    quantize_4x4(&forward_core_4x4(residual), qp, intra, false)
}

/// 反量化 4x4 系数 (位置 0 一并处理)
pub fn dequantize_4x4(levels: &[i32; 16], qp: u8) -> [i32; 16] {
    let qp_per = u32::from(qp / 6);
    let row = &LEVEL_SCALE[usize::from(qp % 6)];
    let mut out = [0i32; 16];
    for (i, (&c, o)) in levels.iter().zip(out.iter_mut()).enumerate() {
        if c != 0 {
            *o = (c * row[position_class(i)]) << qp_per;
        }
    }
    out
}

/// 4x4 反变换, 输出 `(x + 32) >> 6`
pub fn inverse_core_4x4(coeffs: &[i32; 16]) -> [i32; 16] {
    let mut temp = [0i32; 16];
    for i in 0..4 {
        let s = i * 4;
        let e0 = coeffs[s] + coeffs[s + 2];
        let e1 = coeffs[s] - coeffs[s + 2];
        let e2 = (coeffs[s + 1] >> 1) - coeffs[s + 3];
        let e3 = coeffs[s + 1] + (coeffs[s + 3] >> 1);
        temp[s] = e0 + e3;
        temp[s + 1] = e1 + e2;
        temp[s + 2] = e1 - e2;
        temp[s + 3] = e0 - e3;
    }

    let mut out = [0i32; 16];
    for j in 0..4 {
        let e0 = temp[j] + temp[8 + j];
        let e1 = temp[j] - temp[8 + j];
        let e2 = (temp[4 + j] >> 1) - temp[12 + j];
        let e3 = temp[4 + j] + (temp[12 + j] >> 1);
        out[j] = (e0 + e3 + 32) >> 6;
        out[4 + j] = (e1 + e2 + 32) >> 6;
        out[8 + j] = (e1 - e2 + 32) >> 6;
        out[12 + j] = (e0 - e3 + 32) >> 6;
    }
    out
}

/// 反量化 + 反变换
///
/// `dc` 为已经单独反量化的 DC 值 (Intra16x16 与色度), 为 `None` 时按普通 4x4 处理.
pub fn inverse_4x4(levels: &[i32; 16], qp: u8, dc: Option<i32>) -> [i32; 16] {
    let mut coeffs = dequantize_4x4(levels, qp);
    if let Some(dc) = dc {
        coeffs[0] = dc;
    }
    if coeffs.iter().all(|&c| c == 0) {
        return [0; 16];
    }
    inverse_core_4x4(&coeffs)
}

// ============================================================
// DC 路径
// ============================================================

fn hadamard_4x4(block: &[i32; 16]) -> [i32; 16] {
    let mut temp = [0i32; 16];
    for i in 0..4 {
        let s = i * 4;
        let a = block[s] + block[s + 2];
        let b = block[s] - block[s + 2];
        let c = block[s + 1] - block[s + 3];
        let d = block[s + 1] + block[s + 3];
        temp[s] = a + d;
        temp[s + 1] = b + c;
        temp[s + 2] = b - c;
        temp[s + 3] = a - d;
    }

    let mut out = [0i32; 16];
    for j in 0..4 {
        let a = temp[j] + temp[8 + j];
        let b = temp[j] - temp[8 + j];
        let c = temp[4 + j] - temp[12 + j];
        let d = temp[4 + j] + temp[12 + j];
        out[j] = a + d;
        out[4 + j] = b + c;
        out[8 + j] = b - c;
        out[12 + j] = a - d;
    }
    out
}

fn hadamard_2x2(block: &[i32; 4]) -> [i32; 4] {
    let a = block[0] + block[1];
    let b = block[0] - block[1];
    let c = block[2] + block[3];
    let d = block[2] - block[3];
    [a + c, b + d, a - c, b - d]
}

/// Intra16x16 亮度 DC: Hadamard 后右移 1 位, 再以 `2f` / `qbits + 1` 量化
///
/// `dc` 为 16 个 4x4 块核心变换后的 DC 项, 按块的光栅位置排列.
pub fn forward_luma_dc(dc: &[i32; 16], qp: u8, intra: bool) -> [i32; 16] {
    let (qbits, f) = quant_params(qp, intra);
    let mf = QUANT_MF[usize::from(qp % 6)][0];
    let mut out = hadamard_4x4(dc);
    for v in out.iter_mut() {
        *v = quantize_one(*v >> 1, mf, 2 * f, qbits + 1);
    }
    out
}

/// Intra16x16 亮度 DC 反变换 + 反量化
pub fn inverse_luma_dc(levels: &[i32; 16], qp: u8) -> [i32; 16] {
    if levels.iter().all(|&c| c == 0) {
        return [0; 16];
    }
    let qp_per = i32::from(qp / 6);
    let scale = LEVEL_SCALE[usize::from(qp % 6)][0];
    let mut out = hadamard_4x4(levels);
    for c in out.iter_mut() {
        if qp_per >= 2 {
            *c = (*c * scale) << (qp_per - 2);
        } else {
            *c = (*c * scale + (1 << (1 - qp_per))) >> (2 - qp_per);
        }
    }
    out
}

/// 色度 2x2 DC: Hadamard + 量化
pub fn forward_chroma_dc(dc: &[i32; 4], qp: u8, intra: bool) -> [i32; 4] {
    let (qbits, f) = quant_params(qp, intra);
    let mf = QUANT_MF[usize::from(qp % 6)][0];
    let mut out = hadamard_2x2(dc);
    for v in out.iter_mut() {
        *v = quantize_one(*v, mf, 2 * f, qbits + 1);
    }
    out
}

/// 色度 2x2 DC 反变换 + 反量化
pub fn inverse_chroma_dc(levels: &[i32; 4], qp: u8) -> [i32; 4] {
    let qp_per = i32::from(qp / 6);
    let scale = LEVEL_SCALE[usize::from(qp % 6)][0];
    let mut out = hadamard_2x2(levels);
    for c in out.iter_mut() {
        *c = ((*c * scale) << qp_per) >> 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn max_abs_diff(a: &[i32], b: &[i32]) -> i32 {
        a.iter().zip(b).map(|(x, y)| (x - y).abs()).max().unwrap_or(0)
    }

    #[test]
    fn test_零残差变换为零() {
        let zero = [0i32; 16];
        assert_eq!(forward_4x4(&zero, 26, true), zero);
        assert_eq!(inverse_4x4(&zero, 26, None), zero);
        assert_eq!(forward_luma_dc(&zero, 26, true), zero);
        assert_eq!(inverse_chroma_dc(&[0; 4], 30), [0; 4]);
    }

    #[test]
    fn test_扫描顺序互逆() {
        let raster: [i32; 16] = std::array::from_fn(|i| i as i32 * 3 - 7);
        assert_eq!(scan_to_raster(&raster_to_scan(&raster)), raster);
        assert_eq!(raster_to_scan(&raster)[2], raster[4]);
    }

    #[test]
    fn test_4x4_往返均方误差受量化步长约束() {
        let residual: [i32; 16] = [
            12, -7, 3, 0, 25, 18, -30, 4, -2, 9, 14, -11, 6, -5, 1, 20,
        ];
        for qp in [0u8, 6, 12, 18, 24, 30] {
            for intra in [true, false] {
                let rec = inverse_4x4(&forward_4x4(&residual, qp, intra), qp, None);
                let mse = rec
                    .iter()
                    .zip(&residual)
                    .map(|(a, b)| f64::from((a - b) * (a - b)))
                    .sum::<f64>()
                    / 16.0;
                // 量化步长 Qstep(qp) ≈ 0.625 * 2^(qp/6)
                let qstep = 0.625 * 2f64.powf(f64::from(qp) / 6.0);
                assert!(mse <= qstep * qstep + 1.0, "qp={qp} 均方误差 {mse} 过大");
            }
        }
    }

    #[test]
    fn test_低_qp_近似无损() {
        let residual: [i32; 16] = std::array::from_fn(|i| (i as i32 * 37 % 61) - 30);
        let rec = inverse_4x4(&forward_4x4(&residual, 0, false), 0, None);
        assert!(max_abs_diff(&rec, &residual) <= 1);
    }

    #[test]
    fn test_亮度_dc_路径往返() {
        // 16 个 4x4 块的平坦残差, DC 经核心变换放大 16 倍
        let flat: [i32; 16] = std::array::from_fn(|i| (i as i32 % 5) * 6 - 12);
        for qp in [10u8, 22, 28, 36, 45] {
            let mut dc = [0i32; 16];
            for (k, d) in dc.iter_mut().enumerate() {
                *d = forward_core_4x4(&[flat[k]; 16])[0];
            }
            let levels = forward_luma_dc(&dc, qp, true);
            let dc_rec = inverse_luma_dc(&levels, qp);
            for k in 0..16 {
                let block = inverse_4x4(&[0; 16], qp, Some(dc_rec[k]));
                let step = (0.625 * 2f64.powf(f64::from(qp) / 6.0)).ceil() as i32;
                assert!(
                    (block[0] - flat[k]).abs() <= step + 1,
                    "qp={qp} 块 {k}: {} vs {}",
                    block[0],
                    flat[k]
                );
            }
        }
    }

    #[test]
    fn test_色度_dc_路径往返() {
        let values = [20, -8, 0, 13];
        for qp in [12u8, 24, 30, 39] {
            let dc: [i32; 4] = std::array::from_fn(|k| forward_core_4x4(&[values[k]; 16])[0]);
            let levels = forward_chroma_dc(&dc, qp, true);
            let dc_rec = inverse_chroma_dc(&levels, qp);
            let step = (0.625 * 2f64.powf(f64::from(qp) / 6.0)).ceil() as i32;
            for k in 0..4 {
                let block = inverse_4x4(&[0; 16], qp, Some(dc_rec[k]));
                assert!((block[5] - values[k]).abs() <= step + 1, "qp={qp} 块 {k}");
            }
        }
    }

    #[test]
    fn test_帧内量化舍入大于帧间() {
        // 同一系数, 帧内 f = 2^qbits/3 更容易保留
        let coeffs = forward_core_4x4(&[3; 16]);
        let intra = quantize_4x4(&coeffs, 28, true, false);
        let inter = quantize_4x4(&coeffs, 28, false, false);
        assert!(intra[0].abs() >= inter[0].abs());
        assert_eq!(quantize_4x4(&coeffs, 0, true, true)[0], 0, "skip_dc 时位置 0 应为 0");
    }

    #[test]
    fn test_色度_qp_映射() {
        assert_eq!(chroma_qp(20, 0), 20);
        assert_eq!(chroma_qp(30, 0), 29);
        assert_eq!(chroma_qp(51, 0), 39);
        assert_eq!(chroma_qp(51, 12), 39);
        assert_eq!(chroma_qp(0, -12), 0);
    }
}
