//! Intra_16x16 亮度与 8x8 色度预测, 以及编码端的模式选择.
//!
//! 预测只依赖宏块上方一行和左侧一列的重建样本 (去块滤波之前),
//! 编码端与解码端调用同一套函数, 保证预测完全一致.
//!
//! 模式选择采用分层部分和: 样本按固定采样相位分成若干层, 每处理完一层
//! 比较各候选模式的累计平方误差, 最优模式与上一层相同即提前结束.

use super::macroblock::{Availability, Intra16x16Mode, IntraChromaMode};
use super::picture::{MbSamples, YuvPicture};

/// 16x16 亮度预测使用的邻边样本
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LumaEdges {
    pub above: Option<[u8; 16]>,
    pub left: Option<[u8; 16]>,
    pub above_left: Option<u8>,
}

/// 8x8 色度预测使用的邻边样本
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChromaEdges {
    pub above: Option<[u8; 8]>,
    pub left: Option<[u8; 8]>,
    pub above_left: Option<u8>,
}

/// 从重建图像中取一个宏块的邻边
fn edges<const N: usize>(
    pic: &YuvPicture,
    plane: usize,
    mb_x: usize,
    mb_y: usize,
    avail: Availability,
) -> (Option<[u8; N]>, Option<[u8; N]>, Option<u8>) {
    let p = pic.plane(plane);
    let (x0, y0) = (mb_x * N, mb_y * N);
    let above = avail.contains(Availability::ABOVE).then(|| {
        let mut row = [0u8; N];
        for (i, v) in row.iter_mut().enumerate() {
            *v = p.get(x0 + i, y0 - 1);
        }
        row
    });
    let left = avail.contains(Availability::LEFT).then(|| {
        let mut col = [0u8; N];
        for (i, v) in col.iter_mut().enumerate() {
            *v = p.get(x0 - 1, y0 + i);
        }
        col
    });
    let above_left = avail
        .contains(Availability::ABOVE_LEFT)
        .then(|| p.get(x0 - 1, y0 - 1));
    (above, left, above_left)
}

impl LumaEdges {
    pub fn from_picture(pic: &YuvPicture, mb_x: usize, mb_y: usize, avail: Availability) -> Self {
        let (above, left, above_left) = edges::<16>(pic, 0, mb_x, mb_y, avail);
        Self {
            above,
            left,
            above_left,
        }
    }

    /// 该模式所需的邻边是否齐全
    pub fn supports(&self, mode: Intra16x16Mode) -> bool {
        match mode {
            Intra16x16Mode::Vertical => self.above.is_some(),
            Intra16x16Mode::Horizontal => self.left.is_some(),
            Intra16x16Mode::Dc => true,
            Intra16x16Mode::Plane => {
                self.above.is_some() && self.left.is_some() && self.above_left.is_some()
            }
        }
    }
}

impl ChromaEdges {
    /// `plane` 为 0 (Cb) 或 1 (Cr)
    pub fn from_picture(
        pic: &YuvPicture,
        plane: usize,
        mb_x: usize,
        mb_y: usize,
        avail: Availability,
    ) -> Self {
        let (above, left, above_left) = edges::<8>(pic, plane + 1, mb_x, mb_y, avail);
        Self {
            above,
            left,
            above_left,
        }
    }

    pub fn supports(&self, mode: IntraChromaMode) -> bool {
        match mode {
            IntraChromaMode::Dc => true,
            IntraChromaMode::Horizontal => self.left.is_some(),
            IntraChromaMode::Vertical => self.above.is_some(),
            IntraChromaMode::Plane => {
                self.above.is_some() && self.left.is_some() && self.above_left.is_some()
            }
        }
    }
}

// ============================================================
// 亮度 16x16 预测
// ============================================================

/// 生成亮度预测, 邻边不足时返回 `None`
pub fn predict_luma(mode: Intra16x16Mode, e: &LumaEdges) -> Option<[u8; 256]> {
    let mut out = [0u8; 256];
    match mode {
        Intra16x16Mode::Vertical => {
            let above = e.above?;
            for row in out.chunks_exact_mut(16) {
                row.copy_from_slice(&above);
            }
        }
        Intra16x16Mode::Horizontal => {
            let left = e.left?;
            for (row, &v) in out.chunks_exact_mut(16).zip(&left) {
                row.fill(v);
            }
        }
        Intra16x16Mode::Dc => {
            let sum = |s: &[u8]| s.iter().map(|&v| u32::from(v)).sum::<u32>();
            let dc = match (&e.above, &e.left) {
                (Some(a), Some(l)) => (sum(&a[..]) + sum(&l[..]) + 16) >> 5,
                (Some(a), None) => (sum(&a[..]) + 8) >> 4,
                (None, Some(l)) => (sum(&l[..]) + 8) >> 4,
                (None, None) => 128,
            };
            out.fill(dc as u8);
        }
        Intra16x16Mode::Plane => {
            let (above, left, corner) = (e.above?, e.left?, e.above_left?);
            let top = |i: i32| i32::from(if i < 0 { corner } else { above[i as usize] });
            let side = |i: i32| i32::from(if i < 0 { corner } else { left[i as usize] });
            let mut h = 0;
            let mut v = 0;
            for i in 0..8 {
                h += (i + 1) * (top(8 + i) - top(6 - i));
                v += (i + 1) * (side(8 + i) - side(6 - i));
            }
            let a = 16 * (side(15) + top(15));
            let b = (5 * h + 32) >> 6;
            let c = (5 * v + 32) >> 6;
            for y in 0..16 {
                for x in 0..16 {
                    let val = (a + b * (x - 7) + c * (y - 7) + 16) >> 5;
                    out[(y * 16 + x) as usize] = val.clamp(0, 255) as u8;
                }
            }
        }
    }
    Some(out)
}

// ============================================================
// 色度 8x8 预测
// ============================================================

/// 单个 4x4 象限的 DC, `(qx, qy)` 为象限坐标
fn chroma_quadrant_dc(e: &ChromaEdges, qx: usize, qy: usize) -> u8 {
    let sum4 = |s: &[u8; 8], start: usize| s[start..start + 4].iter().map(|&v| u32::from(v)).sum::<u32>();
    let top = e.above.as_ref().map(|a| sum4(a, qx * 4));
    let left = e.left.as_ref().map(|l| sum4(l, qy * 4));
    let dc = match (qx, qy) {
        // 右上象限优先使用上边
        (1, 0) => match (top, left) {
            (Some(t), _) => (t + 2) >> 2,
            (None, Some(l)) => (l + 2) >> 2,
            (None, None) => 128,
        },
        // 左下象限优先使用左边
        (0, 1) => match (top, left) {
            (_, Some(l)) => (l + 2) >> 2,
            (Some(t), None) => (t + 2) >> 2,
            (None, None) => 128,
        },
        _ => match (top, left) {
            (Some(t), Some(l)) => (t + l + 4) >> 3,
            (Some(t), None) => (t + 2) >> 2,
            (None, Some(l)) => (l + 2) >> 2,
            (None, None) => 128,
        },
    };
    dc as u8
}

/// 生成一个色度平面的预测, 邻边不足时返回 `None`
pub fn predict_chroma(mode: IntraChromaMode, e: &ChromaEdges) -> Option<[u8; 64]> {
    let mut out = [0u8; 64];
    match mode {
        IntraChromaMode::Dc => {
            for qy in 0..2 {
                for qx in 0..2 {
                    let dc = chroma_quadrant_dc(e, qx, qy);
                    for y in 0..4 {
                        let row = (qy * 4 + y) * 8 + qx * 4;
                        out[row..row + 4].fill(dc);
                    }
                }
            }
        }
        IntraChromaMode::Horizontal => {
            let left = e.left?;
            for (row, &v) in out.chunks_exact_mut(8).zip(&left) {
                row.fill(v);
            }
        }
        IntraChromaMode::Vertical => {
            let above = e.above?;
            for row in out.chunks_exact_mut(8) {
                row.copy_from_slice(&above);
            }
        }
        IntraChromaMode::Plane => {
            let (above, left, corner) = (e.above?, e.left?, e.above_left?);
            let top = |i: i32| i32::from(if i < 0 { corner } else { above[i as usize] });
            let side = |i: i32| i32::from(if i < 0 { corner } else { left[i as usize] });
            let mut h = 0;
            let mut v = 0;
            for i in 0..4 {
                h += (i + 1) * (top(4 + i) - top(2 - i));
                v += (i + 1) * (side(4 + i) - side(2 - i));
            }
            let a = 16 * (side(7) + top(7));
            let b = (34 * h + 32) >> 6;
            let c = (34 * v + 32) >> 6;
            for y in 0..8 {
                for x in 0..8 {
                    let val = (a + b * (x - 3) + c * (y - 3) + 16) >> 5;
                    out[(y * 8 + x) as usize] = val.clamp(0, 255) as u8;
                }
            }
        }
    }
    Some(out)
}

// ============================================================
// 模式选择
// ============================================================

/// 每个 4x4 块内的采样相位 (x, y), 按优先级排列
const SAMPLE_PHASES: [(usize, usize); 16] = [
    (0, 0),
    (2, 2),
    (0, 2),
    (2, 0),
    (1, 1),
    (3, 3),
    (1, 3),
    (3, 1),
    (1, 0),
    (3, 2),
    (0, 1),
    (2, 3),
    (1, 2),
    (3, 0),
    (0, 3),
    (2, 1),
];

/// 亮度每层包含的相位数 (每个相位覆盖 16 个样本: 16,16,16,32,32,48,48,48)
const LUMA_TIERS: [usize; 8] = [1, 1, 1, 2, 2, 3, 3, 3];

/// 色度每层包含的相位数 (每个相位在两个平面上共覆盖 8 个样本)
const CHROMA_TIERS: [usize; 4] = [2, 2, 4, 8];

/// 帧内预测结果
#[derive(Debug, Clone)]
pub struct IntraDecision {
    pub luma_mode: Intra16x16Mode,
    pub chroma_mode: IntraChromaMode,
    /// 完整预测样本
    pub prediction: MbSamples,
    /// 预测与原图的平方误差和 (亮度 + 色度)
    pub ssd: u64,
}

/// 分层部分和搜索, 返回最优候选的下标
///
/// `preds[i]` 为第 i 个候选在各平面上的预测, 与 `src` 的平面一一对应.
fn tiered_search<const N: usize>(
    src: &[&[u8]],
    preds: &[Vec<&[u8; N]>],
    width: usize,
    tiers: &[usize],
) -> usize {
    let mut sums = vec![0u64; preds.len()];
    let mut prev_best: Option<usize> = None;
    let mut phase = 0;
    let blocks = width / 4;

    for &count in tiers {
        for &(px, py) in &SAMPLE_PHASES[phase..phase + count] {
            for by in 0..blocks {
                for bx in 0..blocks {
                    let idx = (by * 4 + py) * width + bx * 4 + px;
                    for (cand, planes) in preds.iter().enumerate() {
                        for (plane, pred) in planes.iter().enumerate() {
                            let d = i64::from(src[plane][idx]) - i64::from(pred[idx]);
                            sums[cand] += (d * d) as u64;
                        }
                    }
                }
            }
        }
        phase += count;

        let best = argmin(&sums);
        if prev_best == Some(best) {
            return best;
        }
        prev_best = Some(best);
    }
    prev_best.unwrap_or(0)
}

/// 最小值下标, 并列时取靠前者
fn argmin(values: &[u64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v < values[best] {
            best = i;
        }
    }
    best
}

/// 帧内模式选择器
#[derive(Debug, Clone, Copy, Default)]
pub struct IntraPredictor;

impl IntraPredictor {
    /// 为一个宏块选择亮度与色度预测模式
    pub fn select(
        &self,
        src: &MbSamples,
        luma: &LumaEdges,
        chroma: &[ChromaEdges; 2],
    ) -> IntraDecision {
        // 亮度候选 (DC 总是可用)
        let luma_cands: Vec<(Intra16x16Mode, [u8; 256])> = Intra16x16Mode::ALL
            .iter()
            .filter_map(|&m| predict_luma(m, luma).map(|p| (m, p)))
            .collect();
        let luma_preds: Vec<Vec<&[u8; 256]>> = luma_cands.iter().map(|(_, p)| vec![p]).collect();
        let luma_best = tiered_search(&[&src.luma[..]], &luma_preds, 16, &LUMA_TIERS);
        let (luma_mode, luma_pred) = luma_cands[luma_best];

        // 色度候选: 两个平面必须同时支持该模式
        let chroma_cands: Vec<(IntraChromaMode, [u8; 64], [u8; 64])> = IntraChromaMode::ALL
            .iter()
            .filter_map(|&m| {
                let cb = predict_chroma(m, &chroma[0])?;
                let cr = predict_chroma(m, &chroma[1])?;
                Some((m, cb, cr))
            })
            .collect();
        let chroma_preds: Vec<Vec<&[u8; 64]>> =
            chroma_cands.iter().map(|(_, cb, cr)| vec![cb, cr]).collect();
        let chroma_best = tiered_search(&[&src.cb[..], &src.cr[..]], &chroma_preds, 8, &CHROMA_TIERS);
        let (chroma_mode, cb, cr) = chroma_cands[chroma_best];

        let prediction = MbSamples {
            luma: luma_pred,
            cb,
            cr,
        };
        IntraDecision {
            luma_mode,
            chroma_mode,
            ssd: src.ssd(&prediction),
            prediction,
        }
    }
}

/// 按给定模式生成完整的宏块预测, 模式所需邻边缺失时返回 `None`
pub fn predict_mb(
    luma_mode: Intra16x16Mode,
    chroma_mode: IntraChromaMode,
    luma: &LumaEdges,
    chroma: &[ChromaEdges; 2],
) -> Option<MbSamples> {
    Some(MbSamples {
        luma: predict_luma(luma_mode, luma)?,
        cb: predict_chroma(chroma_mode, &chroma[0])?,
        cr: predict_chroma(chroma_mode, &chroma[1])?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_edges() -> LumaEdges {
        let mut above = [0u8; 16];
        let mut left = [0u8; 16];
        for i in 0..16 {
            above[i] = 10 + i as u8 * 4;
            left[i] = 20 + i as u8 * 2;
        }
        LumaEdges {
            above: Some(above),
            left: Some(left),
            above_left: Some(12),
        }
    }

    #[test]
    fn test_无邻居_dc_为128() {
        let e = LumaEdges::default();
        assert!(!e.supports(Intra16x16Mode::Vertical));
        assert!(!e.supports(Intra16x16Mode::Plane));
        assert!(predict_luma(Intra16x16Mode::Vertical, &e).is_none());
        assert_eq!(predict_luma(Intra16x16Mode::Dc, &e), Some([128u8; 256]));
        assert_eq!(predict_chroma(IntraChromaMode::Dc, &ChromaEdges::default()), Some([128u8; 64]));
    }

    #[test]
    fn test_亮度垂直水平() {
        let e = full_edges();
        let v = predict_luma(Intra16x16Mode::Vertical, &e).unwrap();
        assert_eq!(&v[240..256], &e.above.unwrap());
        let h = predict_luma(Intra16x16Mode::Horizontal, &e).unwrap();
        assert!(h[16 * 5..16 * 6].iter().all(|&x| x == e.left.unwrap()[5]));
    }

    #[test]
    fn test_亮度_dc_单边() {
        let e = LumaEdges {
            above: Some([40u8; 16]),
            ..Default::default()
        };
        assert_eq!(predict_luma(Intra16x16Mode::Dc, &e).unwrap()[77], 40);
        let e = LumaEdges {
            above: Some([40u8; 16]),
            left: Some([21u8; 16]),
            above_left: None,
        };
        // (640 + 336 + 16) >> 5 = 31
        assert_eq!(predict_luma(Intra16x16Mode::Dc, &e).unwrap()[0], 31);
    }

    #[test]
    fn test_平面预测_平坦边() {
        let e = LumaEdges {
            above: Some([90u8; 16]),
            left: Some([90u8; 16]),
            above_left: Some(90),
        };
        assert_eq!(predict_luma(Intra16x16Mode::Plane, &e), Some([90u8; 256]));
    }

    #[test]
    fn test_平面预测_线性梯度() {
        // 上边与左边都随位置线性增长, 预测应在对角方向单调
        let e = full_edges();
        let p = predict_luma(Intra16x16Mode::Plane, &e).unwrap();
        assert!(p[0] < p[15]);
        assert!(p[0] < p[240]);
        assert!(p[15] <= p[255]);
    }

    #[test]
    fn test_色度逐象限_dc() {
        let mut above = [0u8; 8];
        above[..4].fill(100);
        above[4..].fill(200);
        let mut left = [0u8; 8];
        left[..4].fill(40);
        left[4..].fill(60);
        let e = ChromaEdges {
            above: Some(above),
            left: Some(left),
            above_left: Some(0),
        };
        let p = predict_chroma(IntraChromaMode::Dc, &e).unwrap();
        // 左上: (400 + 160 + 4) >> 3 = 70
        assert_eq!(p[0], 70);
        // 右上: 只用上边 = 200
        assert_eq!(p[4], 200);
        // 左下: 只用左边 = 60
        assert_eq!(p[32], 60);
        // 右下: (800 + 240 + 4) >> 3 = 130
        assert_eq!(p[36], 130);

        let only_top = ChromaEdges {
            above: Some(above),
            ..Default::default()
        };
        let p = predict_chroma(IntraChromaMode::Dc, &only_top).unwrap();
        assert_eq!(p[32], 100);
        assert_eq!(p[36], 200);
    }

    #[test]
    fn test_模式选择_命中垂直条纹() {
        // 源图像每列取值等于上边, 垂直预测误差为 0
        let e = full_edges();
        let mut src = MbSamples::filled(128);
        for y in 0..16 {
            src.luma[y * 16..y * 16 + 16].copy_from_slice(&e.above.unwrap());
        }
        let chroma = [ChromaEdges::default(); 2];
        let d = IntraPredictor.select(&src, &e, &chroma);
        assert_eq!(d.luma_mode, Intra16x16Mode::Vertical);
        assert_eq!(d.chroma_mode, IntraChromaMode::Dc);
        assert_eq!(d.ssd, 0);
        assert_eq!(d.prediction.luma, src.luma);
    }

    #[test]
    fn test_模式选择_命中水平条纹() {
        let e = full_edges();
        let mut src = MbSamples::filled(128);
        for y in 0..16 {
            src.luma[y * 16..y * 16 + 16].fill(e.left.unwrap()[y]);
        }
        let d = IntraPredictor.select(&src, &e, &[ChromaEdges::default(); 2]);
        assert_eq!(d.luma_mode, Intra16x16Mode::Horizontal);
    }

    #[test]
    fn test_从图像取邻边() {
        let mut pic = YuvPicture::filled(32, 32, 50).unwrap();
        pic.plane_mut(0).set(16, 15, 7);
        pic.plane_mut(0).set(15, 16, 9);
        pic.plane_mut(1).set(7, 7, 3);
        let all = Availability::all();
        let e = LumaEdges::from_picture(&pic, 1, 1, all);
        assert_eq!(e.above.unwrap()[0], 7);
        assert_eq!(e.left.unwrap()[0], 9);
        assert_eq!(e.above_left, Some(50));
        let c = ChromaEdges::from_picture(&pic, 0, 1, 1, all);
        assert_eq!(c.above_left, Some(3));
        let none = LumaEdges::from_picture(&pic, 0, 0, Availability::empty());
        assert_eq!(none, LumaEdges::default());
    }
}
