//! 运动估计与运动补偿.
//!
//! - [`MotionEstimator`]: 为每个宏块给出运动矢量与预测失真, 默认实现
//!   [`FullSearchEstimator`] 按宏块行并行做整像素全搜索;
//! - [`MotionCompensator`]: 按运动矢量从参考图像生成宏块预测, 默认实现
//!   [`QpelCompensator`] 使用 6 抽头亮度 1/4 像素插值与色度 1/8 像素双线性插值.

use rayon::prelude::*;

use super::picture::{MbSamples, Plane, YuvPicture};

/// 运动矢量, 单位为 1/4 亮度像素
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct MotionVector {
    pub x: i16,
    pub y: i16,
}

impl MotionVector {
    pub const ZERO: Self = Self { x: 0, y: 0 };

    pub const fn new(x: i16, y: i16) -> Self {
        Self { x, y }
    }

    /// 由整像素位移构造
    pub fn from_full_pel(dx: i32, dy: i32) -> Self {
        Self {
            x: (dx * 4) as i16,
            y: (dy * 4) as i16,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0 && self.y == 0
    }

    /// 分量中值
    pub fn median(a: Self, b: Self, c: Self) -> Self {
        Self {
            x: median3(a.x, b.x, c.x),
            y: median3(a.y, b.y, c.y),
        }
    }

    /// 与预测矢量的差值 (mvd)
    pub fn diff(&self, pred: Self) -> (i32, i32) {
        (
            i32::from(self.x) - i32::from(pred.x),
            i32::from(self.y) - i32::from(pred.y),
        )
    }
}

fn median3(a: i16, b: i16, c: i16) -> i16 {
    a.max(b).min(a.min(b).max(c))
}

/// 一个宏块的运动估计结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MotionEstimate {
    /// 最佳运动矢量
    pub mv: MotionVector,
    /// 该矢量下预测与原图的平方误差和 (亮度 + 色度)
    pub distortion: u64,
}

/// 运动估计
pub trait MotionEstimator: Send + Sync {
    /// 为 `current` 的每个宏块 (光栅顺序) 在 `reference` 中搜索运动
    fn estimate(&self, current: &YuvPicture, reference: &YuvPicture) -> Vec<MotionEstimate>;
}

/// 运动补偿
pub trait MotionCompensator: Send + Sync {
    /// 以亮度坐标 `(origin_x, origin_y)` 为宏块左上角, 按 `mv` 生成预测写入 `out`
    fn compensate(
        &self,
        reference: &YuvPicture,
        origin_x: usize,
        origin_y: usize,
        mv: MotionVector,
        out: &mut MbSamples,
    );
}

// ============================================================
// 整像素全搜索
// ============================================================

/// 整像素全搜索运动估计 (SAD 选优, 报告 SSD)
#[derive(Debug, Clone, Copy)]
pub struct FullSearchEstimator {
    range: i32,
}

impl FullSearchEstimator {
    /// `range` 为水平/垂直方向的最大整像素搜索距离
    pub fn new(range: u32) -> Self {
        Self {
            range: range.min(64) as i32,
        }
    }

    pub fn range(&self) -> u32 {
        self.range as u32
    }

    fn search_mb(&self, current: &YuvPicture, reference: &YuvPicture, mb_x: usize, mb_y: usize) -> MotionEstimate {
        let cur = current.plane(0);
        let refp = reference.plane(0);
        let (x0, y0) = ((mb_x * 16) as i32, (mb_y * 16) as i32);

        let sad_at = |dx: i32, dy: i32, bound: u32| -> u32 {
            let mut sad = 0u32;
            for y in 0..16 {
                for x in 0..16 {
                    let c = cur.get((x0 + x) as usize, (y0 + y) as usize);
                    let r = refp.get_clamped(x0 + x + dx, y0 + y + dy);
                    sad += u32::from(c.abs_diff(r));
                }
                if sad >= bound {
                    return sad;
                }
            }
            sad
        };

        let mut best = (0i32, 0i32);
        let mut best_sad = sad_at(0, 0, u32::MAX);
        for dy in -self.range..=self.range {
            for dx in -self.range..=self.range {
                if (dx, dy) == (0, 0) {
                    continue;
                }
                let sad = sad_at(dx, dy, best_sad);
                let closer = dx.abs() + dy.abs() < best.0.abs() + best.1.abs();
                if sad < best_sad || (sad == best_sad && closer) {
                    best_sad = sad;
                    best = (dx, dy);
                }
            }
        }

        let mv = MotionVector::from_full_pel(best.0, best.1);
        let mut pred = MbSamples::default();
        QpelCompensator.compensate(reference, x0 as usize, y0 as usize, mv, &mut pred);
        let src = current.load_mb(mb_x, mb_y);
        MotionEstimate {
            mv,
            distortion: src.ssd(&pred),
        }
    }
}

impl Default for FullSearchEstimator {
    fn default() -> Self {
        Self::new(16)
    }
}

impl MotionEstimator for FullSearchEstimator {
    fn estimate(&self, current: &YuvPicture, reference: &YuvPicture) -> Vec<MotionEstimate> {
        let mb_width = current.mb_width();
        (0..current.mb_height())
            .into_par_iter()
            .flat_map_iter(|mb_y| {
                (0..mb_width).map(move |mb_x| self.search_mb(current, reference, mb_x, mb_y))
            })
            .collect()
    }
}

// ============================================================
// 1/4 像素运动补偿
// ============================================================

/// 标准 6 抽头亮度 + 双线性色度运动补偿
#[derive(Debug, Clone, Copy, Default)]
pub struct QpelCompensator;

fn tap6(get: impl Fn(i32) -> i32) -> i32 {
    get(-2) - 5 * get(-1) + 20 * get(0) + 20 * get(1) - 5 * get(2) + get(3)
}

fn clip_round5(v: i32) -> i32 {
    ((v + 16) >> 5).clamp(0, 255)
}

/// 水平半像素 b (位于 (x, y) 与 (x+1, y) 之间)
fn half_h(p: &Plane, x: i32, y: i32) -> i32 {
    clip_round5(tap6(|o| i32::from(p.get_clamped(x + o, y))))
}

/// 垂直半像素 h (位于 (x, y) 与 (x, y+1) 之间)
fn half_v(p: &Plane, x: i32, y: i32) -> i32 {
    clip_round5(tap6(|o| i32::from(p.get_clamped(x, y + o))))
}

/// 中心半像素 j, 由未截断的水平中间值再做垂直滤波
fn half_hv(p: &Plane, x: i32, y: i32) -> i32 {
    let row = |yy: i32| tap6(|o| i32::from(p.get_clamped(x + o, yy)));
    let v = tap6(|o| row(y + o));
    ((v + 512) >> 10).clamp(0, 255)
}

fn luma_sample(p: &Plane, x: i32, y: i32, fx: i32, fy: i32) -> u8 {
    let g = |ox: i32, oy: i32| i32::from(p.get_clamped(x + ox, y + oy));
    let avg = |a: i32, b: i32| (a + b + 1) >> 1;
    let v = match (fx, fy) {
        (0, 0) => g(0, 0),
        (1, 0) => avg(g(0, 0), half_h(p, x, y)),
        (2, 0) => half_h(p, x, y),
        (3, 0) => avg(half_h(p, x, y), g(1, 0)),
        (0, 1) => avg(g(0, 0), half_v(p, x, y)),
        (0, 2) => half_v(p, x, y),
        (0, 3) => avg(half_v(p, x, y), g(0, 1)),
        (1, 1) => avg(half_h(p, x, y), half_v(p, x, y)),
        (3, 1) => avg(half_h(p, x, y), half_v(p, x + 1, y)),
        (1, 3) => avg(half_v(p, x, y), half_h(p, x, y + 1)),
        (3, 3) => avg(half_v(p, x + 1, y), half_h(p, x, y + 1)),
        (2, 1) => avg(half_h(p, x, y), half_hv(p, x, y)),
        (2, 3) => avg(half_hv(p, x, y), half_h(p, x, y + 1)),
        (1, 2) => avg(half_v(p, x, y), half_hv(p, x, y)),
        (3, 2) => avg(half_hv(p, x, y), half_v(p, x + 1, y)),
        _ => half_hv(p, x, y),
    };
    v as u8
}

fn chroma_sample(p: &Plane, x: i32, y: i32, fx: i32, fy: i32) -> u8 {
    let a = i32::from(p.get_clamped(x, y));
    let b = i32::from(p.get_clamped(x + 1, y));
    let c = i32::from(p.get_clamped(x, y + 1));
    let d = i32::from(p.get_clamped(x + 1, y + 1));
    let v = (8 - fx) * (8 - fy) * a + fx * (8 - fy) * b + (8 - fx) * fy * c + fx * fy * d;
    ((v + 32) >> 6) as u8
}

impl MotionCompensator for QpelCompensator {
    fn compensate(
        &self,
        reference: &YuvPicture,
        origin_x: usize,
        origin_y: usize,
        mv: MotionVector,
        out: &mut MbSamples,
    ) {
        let (mvx, mvy) = (i32::from(mv.x), i32::from(mv.y));
        let luma = reference.plane(0);
        let (bx, by) = (origin_x as i32 + (mvx >> 2), origin_y as i32 + (mvy >> 2));
        let (fx, fy) = (mvx & 3, mvy & 3);
        for y in 0..16 {
            for x in 0..16 {
                out.luma[(y * 16 + x) as usize] = luma_sample(luma, bx + x, by + y, fx, fy);
            }
        }

        let (cbx, cby) = ((origin_x / 2) as i32 + (mvx >> 3), (origin_y / 2) as i32 + (mvy >> 3));
        let (cfx, cfy) = (mvx & 7, mvy & 7);
        for plane in 0..2 {
            let src = reference.plane(plane + 1);
            let dst = out.chroma_mut(plane);
            for y in 0..8 {
                for x in 0..8 {
                    dst[(y * 8 + x) as usize] = chroma_sample(src, cbx + x, cby + y, cfx, cfy);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_picture(w: u32, h: u32, shift_x: i32, shift_y: i32) -> YuvPicture {
        let mut pic = YuvPicture::new(w, h).unwrap();
        for plane in 0..3 {
            let p = pic.plane_mut(plane);
            let (pw, ph) = (p.width(), p.height());
            for y in 0..ph {
                for x in 0..pw {
                    let xs = x as i32 + if plane == 0 { shift_x } else { shift_x / 2 };
                    let ys = y as i32 + if plane == 0 { shift_y } else { shift_y / 2 };
                    let v = ((xs * 7 + ys * 13) ^ (xs * ys)) & 0xFF;
                    p.set(x, y, v as u8);
                }
            }
        }
        pic
    }

    #[test]
    fn test_中值() {
        let m = MotionVector::median(
            MotionVector::new(1, 9),
            MotionVector::new(5, -3),
            MotionVector::new(3, 4),
        );
        assert_eq!(m, MotionVector::new(3, 4));
        assert_eq!(MotionVector::new(5, 2).diff(MotionVector::new(1, 4)), (4, -2));
    }

    #[test]
    fn test_整像素补偿即复制() {
        let pic = gradient_picture(48, 48, 0, 0);
        let mut out = MbSamples::default();
        QpelCompensator.compensate(&pic, 16, 16, MotionVector::from_full_pel(2, -2), &mut out);
        assert_eq!(out.luma[0], pic.plane(0).get(18, 14));
        assert_eq!(out.cb[9], pic.plane(1).get(8 + 1 + 1, 8 - 1 + 1));
        QpelCompensator.compensate(&pic, 16, 16, MotionVector::ZERO, &mut out);
        assert_eq!(out, pic.load_mb(1, 1));
    }

    #[test]
    fn test_平坦区域分数像素不变() {
        let pic = YuvPicture::filled(32, 32, 77).unwrap();
        let mut out = MbSamples::default();
        for mv in [MotionVector::new(1, 3), MotionVector::new(2, 2), MotionVector::new(-3, 5)] {
            QpelCompensator.compensate(&pic, 16, 0, mv, &mut out);
            assert_eq!(out, MbSamples::filled(77), "mv={mv:?}");
        }
    }

    #[test]
    fn test_全搜索找到平移() {
        let reference = gradient_picture(64, 48, 0, 0);
        let current = gradient_picture(64, 48, 4, -2);
        let est = FullSearchEstimator::new(6).estimate(&current, &reference);
        assert_eq!(est.len(), 12);
        // 内部宏块应找到精确平移, 失真为 0
        let inner = est[5];
        assert_eq!(inner.mv, MotionVector::from_full_pel(4, -2));
        assert_eq!(inner.distortion, 0);
    }

    #[test]
    fn test_静止图像零矢量() {
        let pic = gradient_picture(32, 32, 0, 0);
        let est = FullSearchEstimator::default().estimate(&pic, &pic);
        assert!(est.iter().all(|e| e.mv.is_zero() && e.distortion == 0));
    }
}
