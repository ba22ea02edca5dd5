//! 环路去块滤波.
//!
//! 整幅图像重建完成后按宏块光栅顺序处理: 每个宏块先滤亮度垂直边界
//! (从左到右), 再滤水平边界 (从上到下), 色度同理. 帧内预测使用的是
//! 滤波前的样本, 因此滤波只作用于参考图像.
//!
//! 边界强度 (bS):
//! - 4: 宏块边界且任一侧为帧内宏块;
//! - 3: 帧内宏块内部边界;
//! - 2: 任一侧 4x4 亮度块含非零系数;
//! - 1: 两侧运动矢量任一分量相差不小于 4 (1/4 像素单位);
//! - 0: 不滤波.

use super::macroblock::MacroblockGrid;
use super::picture::{Plane, YuvPicture};
use super::transform::chroma_qp;
use crate::parsers::h264::{Pps, SliceHeader};

/// 去块滤波参数 (来自 slice 头与 PPS)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeblockParams {
    /// disable_deblocking_filter_idc
    pub disable_idc: u32,
    /// FilterOffsetA (= slice_alpha_c0_offset_div2 * 2)
    pub offset_a: i32,
    /// FilterOffsetB (= slice_beta_offset_div2 * 2)
    pub offset_b: i32,
    /// chroma_qp_index_offset
    pub chroma_qp_offset: i32,
}

impl DeblockParams {
    pub fn from_slice(header: &SliceHeader, pps: &Pps) -> Self {
        Self {
            disable_idc: header.disable_deblocking_filter_idc,
            offset_a: header.alpha_offset_div2 * 2,
            offset_b: header.beta_offset_div2 * 2,
            chroma_qp_offset: pps.chroma_qp_index_offset,
        }
    }

    pub fn enabled(&self) -> bool {
        self.disable_idc != 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EdgeDir {
    /// 垂直边界 (左右相邻)
    Vertical,
    /// 水平边界 (上下相邻)
    Horizontal,
}

/// 对整幅重建图像执行去块滤波
pub fn deblock_picture(pic: &mut YuvPicture, grid: &MacroblockGrid, params: &DeblockParams) {
    if !params.enabled() {
        return;
    }
    for idx in 0..grid.len() {
        for dir in [EdgeDir::Vertical, EdgeDir::Horizontal] {
            filter_mb_luma(pic.plane_mut(0), grid, idx, dir, params);
        }
        for plane in 1..3 {
            for dir in [EdgeDir::Vertical, EdgeDir::Horizontal] {
                filter_mb_chroma(pic.plane_mut(plane), grid, idx, dir, params);
            }
        }
    }
}

// ============================================================
// 边界强度
// ============================================================

/// 第 `edge` 条边界 (0..4) 上第 `k` 个 4x4 块处的边界强度
fn boundary_strength(grid: &MacroblockGrid, idx: usize, dir: EdgeDir, edge: usize, k: usize) -> u8 {
    let n = grid.neighbours(idx);
    let (q_raster, p_mb, p_raster) = match dir {
        EdgeDir::Vertical => {
            let q = k * 4 + edge;
            if edge == 0 {
                (q, n.left, k * 4 + 3)
            } else {
                (q, Some(idx), q - 1)
            }
        }
        EdgeDir::Horizontal => {
            let q = edge * 4 + k;
            if edge == 0 {
                (q, n.above, 12 + k)
            } else {
                (q, Some(idx), q - 4)
            }
        }
    };
    let Some(p_mb) = p_mb else {
        return 0;
    };

    let (p, q) = (grid.get(p_mb), grid.get(idx));
    if p.kind.is_intra() || q.kind.is_intra() {
        return if edge == 0 { 4 } else { 3 };
    }
    if p.luma_block_has_coeffs(p_raster) || q.luma_block_has_coeffs(q_raster) {
        return 2;
    }
    let dx = (i32::from(p.mv.x) - i32::from(q.mv.x)).abs();
    let dy = (i32::from(p.mv.y) - i32::from(q.mv.y)).abs();
    u8::from(dx >= 4 || dy >= 4)
}

// ============================================================
// 阈值
// ============================================================

#[derive(Debug, Clone, Copy)]
struct Thresholds {
    alpha: i32,
    beta: i32,
    index_a: usize,
}

impl Thresholds {
    fn new(qp_av: i32, params: &DeblockParams) -> Self {
        let index_a = (qp_av + params.offset_a).clamp(0, 51) as usize;
        let index_b = (qp_av + params.offset_b).clamp(0, 51) as usize;
        Self {
            alpha: i32::from(ALPHA_TABLE[index_a]),
            beta: i32::from(BETA_TABLE[index_b]),
            index_a,
        }
    }

    fn tc0(&self, bs: u8) -> i32 {
        i32::from(TC0_TABLE[self.index_a][usize::from(bs.clamp(1, 3)) - 1])
    }
}

/// 沿边界的样本坐标: `i < 0` 为 p 侧, `i >= 0` 为 q 侧
fn sample_pos(dir: EdgeDir, x0: usize, y0: usize, along: usize, i: isize) -> (usize, usize) {
    match dir {
        EdgeDir::Vertical => ((x0 as isize + i) as usize, y0 + along),
        EdgeDir::Horizontal => (x0 + along, (y0 as isize + i) as usize),
    }
}

// ============================================================
// 亮度
// ============================================================

fn filter_mb_luma(plane: &mut Plane, grid: &MacroblockGrid, idx: usize, dir: EdgeDir, params: &DeblockParams) {
    let (mb_x, mb_y) = grid.position(idx);
    let n = grid.neighbours(idx);
    let q_qp = i32::from(grid.get(idx).committed_qp);

    for edge in 0..4 {
        let p_mb = if edge > 0 {
            Some(idx)
        } else {
            match dir {
                EdgeDir::Vertical => n.left,
                EdgeDir::Horizontal => n.above,
            }
        };
        let Some(p_mb) = p_mb else {
            continue;
        };
        let p_qp = i32::from(grid.get(p_mb).committed_qp);
        let t = Thresholds::new((p_qp + q_qp + 1) >> 1, params);

        let (x0, y0) = match dir {
            EdgeDir::Vertical => (mb_x * 16 + edge * 4, mb_y * 16),
            EdgeDir::Horizontal => (mb_x * 16, mb_y * 16 + edge * 4),
        };
        for k in 0..4 {
            let bs = boundary_strength(grid, idx, dir, edge, k);
            if bs == 0 {
                continue;
            }
            for along in k * 4..k * 4 + 4 {
                let mut s = [0i32; 8];
                for (j, v) in s.iter_mut().enumerate() {
                    let (x, y) = sample_pos(dir, x0, y0, along, j as isize - 4);
                    *v = i32::from(plane.get(x, y));
                }
                if filter_luma_line(&mut s, bs, &t) {
                    for (j, &v) in s.iter().enumerate().skip(1).take(6) {
                        let (x, y) = sample_pos(dir, x0, y0, along, j as isize - 4);
                        plane.set(x, y, v as u8);
                    }
                }
            }
        }
    }
}

/// 滤波一行亮度样本 `[p3, p2, p1, p0, q0, q1, q2, q3]`, 返回是否有改动
fn filter_luma_line(s: &mut [i32; 8], bs: u8, t: &Thresholds) -> bool {
    let [p3, p2, p1, p0, q0, q1, q2, q3] = *s;
    if (p0 - q0).abs() >= t.alpha || (p1 - p0).abs() >= t.beta || (q1 - q0).abs() >= t.beta {
        return false;
    }
    let ap = (p2 - p0).abs();
    let aq = (q2 - q0).abs();

    if bs == 4 {
        let small_gap = (p0 - q0).abs() < (t.alpha >> 2) + 2;
        if ap < t.beta && small_gap {
            s[3] = (p2 + 2 * p1 + 2 * p0 + 2 * q0 + q1 + 4) >> 3;
            s[2] = (p2 + p1 + p0 + q0 + 2) >> 2;
            s[1] = (2 * p3 + 3 * p2 + p1 + p0 + q0 + 4) >> 3;
        } else {
            s[3] = (2 * p1 + p0 + q1 + 2) >> 2;
        }
        if aq < t.beta && small_gap {
            s[4] = (p1 + 2 * p0 + 2 * q0 + 2 * q1 + q2 + 4) >> 3;
            s[5] = (p0 + q0 + q1 + q2 + 2) >> 2;
            s[6] = (2 * q3 + 3 * q2 + q1 + q0 + p0 + 4) >> 3;
        } else {
            s[4] = (2 * q1 + q0 + p1 + 2) >> 2;
        }
        return true;
    }

    let tc0 = t.tc0(bs);
    let tc = tc0 + i32::from(ap < t.beta) + i32::from(aq < t.beta);
    let delta = ((((q0 - p0) << 2) + (p1 - q1) + 4) >> 3).clamp(-tc, tc);
    s[3] = (p0 + delta).clamp(0, 255);
    s[4] = (q0 - delta).clamp(0, 255);
    if ap < t.beta {
        s[2] = p1 + ((p2 + ((p0 + q0 + 1) >> 1) - (p1 << 1)) >> 1).clamp(-tc0, tc0);
    }
    if aq < t.beta {
        s[5] = q1 + ((q2 + ((p0 + q0 + 1) >> 1) - (q1 << 1)) >> 1).clamp(-tc0, tc0);
    }
    true
}

// ============================================================
// 色度
// ============================================================

fn filter_mb_chroma(plane: &mut Plane, grid: &MacroblockGrid, idx: usize, dir: EdgeDir, params: &DeblockParams) {
    let (mb_x, mb_y) = grid.position(idx);
    let n = grid.neighbours(idx);
    let q_qpc = i32::from(chroma_qp(grid.get(idx).committed_qp, params.chroma_qp_offset));

    for edge in 0..2 {
        let p_mb = if edge > 0 {
            Some(idx)
        } else {
            match dir {
                EdgeDir::Vertical => n.left,
                EdgeDir::Horizontal => n.above,
            }
        };
        let Some(p_mb) = p_mb else {
            continue;
        };
        let p_qpc = i32::from(chroma_qp(grid.get(p_mb).committed_qp, params.chroma_qp_offset));
        let t = Thresholds::new((p_qpc + q_qpc + 1) >> 1, params);

        let (x0, y0) = match dir {
            EdgeDir::Vertical => (mb_x * 8 + edge * 4, mb_y * 8),
            EdgeDir::Horizontal => (mb_x * 8, mb_y * 8 + edge * 4),
        };
        for along in 0..8 {
            // 色度边界 e 对应亮度边界 2e, 色度样本 k 对应亮度块 k/2
            let bs = boundary_strength(grid, idx, dir, edge * 2, along / 2);
            if bs == 0 {
                continue;
            }
            let mut s = [0i32; 4];
            for (j, v) in s.iter_mut().enumerate() {
                let (x, y) = sample_pos(dir, x0, y0, along, j as isize - 2);
                *v = i32::from(plane.get(x, y));
            }
            if filter_chroma_line(&mut s, bs, &t) {
                for (j, &v) in s.iter().enumerate().skip(1).take(2) {
                    let (x, y) = sample_pos(dir, x0, y0, along, j as isize - 2);
                    plane.set(x, y, v as u8);
                }
            }
        }
    }
}

/// 滤波一行色度样本 `[p1, p0, q0, q1]`
fn filter_chroma_line(s: &mut [i32; 4], bs: u8, t: &Thresholds) -> bool {
    let [p1, p0, q0, q1] = *s;
    if (p0 - q0).abs() >= t.alpha || (p1 - p0).abs() >= t.beta || (q1 - q0).abs() >= t.beta {
        return false;
    }
    if bs == 4 {
        s[1] = (2 * p1 + p0 + q1 + 2) >> 2;
        s[2] = (2 * q1 + q0 + p1 + 2) >> 2;
        return true;
    }
    let tc = t.tc0(bs) + 1;
    let delta = ((((q0 - p0) << 2) + (p1 - q1) + 4) >> 3).clamp(-tc, tc);
    s[1] = (p0 + delta).clamp(0, 255);
    s[2] = (q0 - delta).clamp(0, 255);
    true
}

#[rustfmt::skip]
const ALPHA_TABLE: [u8; 52] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    4, 4, 5, 6, 7, 8, 9, 10, 12, 13, 15, 17, 20, 22, 25, 28,
    32, 36, 40, 45, 50, 56, 63, 71, 80, 90, 101, 113, 127, 144, 162, 182,
    203, 226, 255, 255,
];

#[rustfmt::skip]
const BETA_TABLE: [u8; 52] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 6, 6, 7, 7, 8, 8,
    9, 9, 10, 10, 11, 11, 12, 12, 13, 13, 14, 14, 15, 15, 16, 16,
    17, 17, 18, 18,
];

#[rustfmt::skip]
const TC0_TABLE: [[u8; 3]; 52] = [
    [0, 0, 0], [0, 0, 0], [0, 0, 0], [0, 0, 0], [0, 0, 0], [0, 0, 0], [0, 0, 0], [0, 0, 0],
    [0, 0, 0], [0, 0, 0], [0, 0, 0], [0, 0, 0], [0, 0, 0], [0, 0, 0], [0, 0, 0], [0, 0, 0],
    [0, 0, 0], [0, 0, 1], [0, 0, 1], [0, 0, 1], [0, 0, 1], [0, 1, 1], [0, 1, 1], [1, 1, 1],
    [1, 1, 1], [1, 1, 1], [1, 1, 1], [1, 1, 2], [1, 1, 2], [1, 1, 2], [1, 1, 2], [1, 2, 3],
    [1, 2, 3], [2, 2, 3], [2, 2, 4], [2, 3, 4], [2, 3, 4], [3, 3, 5], [3, 4, 6], [3, 4, 6],
    [4, 5, 7], [4, 5, 8], [4, 6, 9], [5, 7, 10], [6, 8, 11], [6, 8, 13], [7, 10, 14], [8, 11, 16],
    [9, 12, 18], [10, 13, 20], [11, 15, 23], [13, 17, 25],
];
