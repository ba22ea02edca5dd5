//! 宏块数据模型.
//!
//! 宏块以光栅顺序存放在 [`MacroblockGrid`] 中, 邻居 (左/上/左上/右上)
//! 由宏块下标和图像宽度即时计算, 不保存任何引用.

use bitflags::bitflags;
use tao_core::{TaoError, TaoResult};

use super::cavlc::predict_nc;
use super::motion::MotionVector;
use crate::parsers::h264::SliceType;

/// 一个宏块内 4x4 亮度块的编码顺序: 编码序号 → 光栅下标 (`by * 4 + bx`)
pub const LUMA_CODING_ORDER: [usize; 16] = [0, 1, 4, 5, 2, 3, 6, 7, 8, 9, 12, 13, 10, 11, 14, 15];

bitflags! {
    /// 相邻宏块可用性
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Availability: u8 {
        const LEFT = 0b0001;
        const ABOVE = 0b0010;
        const ABOVE_LEFT = 0b0100;
        const ABOVE_RIGHT = 0b1000;
    }
}

// ============================================================
// 系数块
// ============================================================

/// 变换系数块 (光栅顺序)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block<const N: usize> {
    /// 量化后的系数
    pub coeffs: [i32; N],
    /// coeff_token 中的非零系数个数
    pub total_coeff: u8,
    /// 是否写入码流
    pub coded: bool,
}

impl<const N: usize> Default for Block<N> {
    fn default() -> Self {
        Self {
            coeffs: [0; N],
            total_coeff: 0,
            coded: false,
        }
    }
}

impl<const N: usize> Block<N> {
    /// 清空为未编码的零块
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// 是否存在非零系数
    pub fn has_nonzero(&self) -> bool {
        self.coeffs.iter().any(|&c| c != 0)
    }
}

/// 4x4 系数块
pub type Block4x4 = Block<16>;
/// 2x2 色度 DC 块
pub type Block2x2 = Block<4>;

// ============================================================
// 预测模式与宏块类型
// ============================================================

/// 宏块类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MbKind {
    /// Intra_16x16
    #[default]
    Intra16x16,
    /// P_L0_16x16
    Inter,
    /// P_Skip
    Skip,
}

impl MbKind {
    /// 是否为帧内宏块
    pub fn is_intra(&self) -> bool {
        matches!(self, Self::Intra16x16)
    }
}

/// Intra_16x16 亮度预测模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Intra16x16Mode {
    Vertical = 0,
    Horizontal = 1,
    #[default]
    Dc = 2,
    Plane = 3,
}

impl Intra16x16Mode {
    /// 全部模式
    pub const ALL: [Self; 4] = [Self::Vertical, Self::Horizontal, Self::Dc, Self::Plane];

    pub fn from_u8(v: u8) -> TaoResult<Self> {
        Self::ALL
            .get(usize::from(v))
            .copied()
            .ok_or_else(|| TaoError::InvalidData(format!("Intra16x16 预测模式非法: {v}")))
    }
}

/// 色度 8x8 预测模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntraChromaMode {
    #[default]
    Dc = 0,
    Horizontal = 1,
    Vertical = 2,
    Plane = 3,
}

impl IntraChromaMode {
    /// 全部模式
    pub const ALL: [Self; 4] = [Self::Dc, Self::Horizontal, Self::Vertical, Self::Plane];

    pub fn from_u8(v: u8) -> TaoResult<Self> {
        Self::ALL
            .get(usize::from(v))
            .copied()
            .ok_or_else(|| TaoError::InvalidData(format!("色度预测模式非法: {v}")))
    }
}

/// 码流中的 mb_type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MbType {
    /// I_16x16_<mode>_<cbp_chroma>_<ac>
    I16x16 {
        mode: Intra16x16Mode,
        cbp_chroma: u8,
        ac_coded: bool,
    },
    /// P_L0_16x16
    PL016x16,
}

impl MbType {
    /// 打包为 ue(v) 码号
    pub fn to_code(&self, slice_type: SliceType) -> u32 {
        let intra_offset = if slice_type.is_intra() { 0 } else { 5 };
        match *self {
            Self::I16x16 {
                mode,
                cbp_chroma,
                ac_coded,
            } => {
                intra_offset
                    + 1
                    + mode as u32
                    + 4 * u32::from(cbp_chroma)
                    + if ac_coded { 12 } else { 0 }
            }
            Self::PL016x16 => 0,
        }
    }

    /// 从 ue(v) 码号解包
    pub fn from_code(code: u32, slice_type: SliceType) -> TaoResult<Self> {
        let intra_code = if slice_type.is_intra() {
            code
        } else {
            match code {
                0 => return Ok(Self::PL016x16),
                1..=4 => {
                    return Err(TaoError::Unsupported(format!(
                        "P 宏块分割类型 mb_type={code}"
                    )));
                }
                _ => code - 5,
            }
        };
        match intra_code {
            0 => Err(TaoError::Unsupported("I_NxN 宏块".into())),
            1..=24 => {
                let v = intra_code - 1;
                Ok(Self::I16x16 {
                    mode: Intra16x16Mode::from_u8((v % 4) as u8)?,
                    cbp_chroma: ((v / 4) % 3) as u8,
                    ac_coded: v >= 12,
                })
            }
            25 => Err(TaoError::Unsupported("I_PCM 宏块".into())),
            _ => Err(TaoError::InvalidData(format!("mb_type 越界: {code}"))),
        }
    }
}

// ============================================================
// 宏块
// ============================================================

/// 一个 16x16 宏块的编码状态
#[derive(Debug, Clone, Default)]
pub struct Macroblock {
    /// 宏块类别
    pub kind: MbKind,
    /// 亮度预测模式 (帧内)
    pub luma_mode: Intra16x16Mode,
    /// 色度预测模式 (帧内)
    pub chroma_mode: IntraChromaMode,
    /// 最近一次探测使用的 QP
    pub probe_qp: u8,
    /// 实际生效的 QP_Y (未写 mb_qp_delta 时沿用前一宏块)
    pub committed_qp: u8,
    /// mb_qp_delta, 范围 [-26, 25]
    pub qp_delta: i32,
    /// 亮度 coded_block_pattern (低 4 位)
    pub cbp_luma: u8,
    /// 色度 coded_block_pattern (0..=2)
    pub cbp_chroma: u8,
    /// 运动矢量 (1/4 像素)
    pub mv: MotionVector,
    /// 预测运动矢量
    pub mvp: MotionVector,
    /// Intra16x16 亮度 DC
    pub luma_dc: Block4x4,
    /// 16 个亮度 4x4 块, 按光栅下标存放
    pub luma: [Block4x4; 16],
    /// Cb/Cr 的 2x2 DC
    pub chroma_dc: [Block2x2; 2],
    /// Cb/Cr 各 4 个 AC 块
    pub chroma_ac: [[Block4x4; 4]; 2],
}

impl Macroblock {
    /// 合成的 coded_block_pattern
    pub fn cbp(&self) -> u8 {
        (self.cbp_chroma << 4) | self.cbp_luma
    }

    /// 从 coded_block_pattern 拆分
    pub fn set_cbp(&mut self, cbp: u8) {
        self.cbp_luma = cbp & 0x0F;
        self.cbp_chroma = cbp >> 4;
    }

    /// 清空所有系数块
    pub fn clear_blocks(&mut self) {
        self.luma_dc.clear();
        self.luma.iter_mut().for_each(Block::clear);
        self.chroma_dc.iter_mut().for_each(Block::clear);
        self.chroma_ac.iter_mut().flatten().for_each(Block::clear);
    }

    /// 由系数重新推导 coded_block_pattern
    ///
    /// Intra16x16 亮度只能是 0 或 15; 帧间按 8x8 逐位.
    /// 色度: 有 AC 为 2, 仅 DC 为 1, 否则为 0.
    pub fn derive_cbp(&mut self) {
        self.cbp_luma = match self.kind {
            MbKind::Intra16x16 => {
                if self.luma.iter().any(Block::has_nonzero) {
                    15
                } else {
                    0
                }
            }
            MbKind::Inter => {
                let mut cbp = 0u8;
                for b8 in 0..4 {
                    let (x8, y8) = ((b8 % 2) * 2, (b8 / 2) * 2);
                    let any = (0..4).any(|k| {
                        let raster = (y8 + k / 2) * 4 + x8 + k % 2;
                        self.luma[raster].has_nonzero()
                    });
                    if any {
                        cbp |= 1 << b8;
                    }
                }
                cbp
            }
            MbKind::Skip => 0,
        };
        self.cbp_chroma = if self.chroma_ac.iter().flatten().any(Block::has_nonzero) {
            2
        } else if self.chroma_dc.iter().any(Block::has_nonzero) {
            1
        } else {
            0
        };
    }

    /// 码流中的 mb_type (跳过宏块没有 mb_type)
    pub fn mb_type(&self) -> Option<MbType> {
        match self.kind {
            MbKind::Intra16x16 => Some(MbType::I16x16 {
                mode: self.luma_mode,
                cbp_chroma: self.cbp_chroma,
                ac_coded: self.cbp_luma != 0,
            }),
            MbKind::Inter => Some(MbType::PL016x16),
            MbKind::Skip => None,
        }
    }

    /// 是否写 mb_qp_delta
    pub fn has_qp_delta(&self) -> bool {
        match self.kind {
            MbKind::Intra16x16 => true,
            MbKind::Inter => self.cbp() != 0,
            MbKind::Skip => false,
        }
    }

    /// 4x4 亮度块是否含非零系数 (用于去块滤波强度)
    pub fn luma_block_has_coeffs(&self, raster: usize) -> bool {
        self.luma[raster].total_coeff > 0
    }
}

/// 按 [-26, 25] 回绕的 QP 差值
pub fn wrap_qp_delta(qp: u8, prev_qp: u8) -> i32 {
    let mut delta = i32::from(qp) - i32::from(prev_qp);
    if delta > 25 {
        delta -= 52;
    } else if delta < -26 {
        delta += 52;
    }
    delta
}

/// 解码端: 由前一 QP 与 delta 得到当前 QP (模 52)
pub fn apply_qp_delta(prev_qp: u8, delta: i32) -> TaoResult<u8> {
    if !(-26..=25).contains(&delta) {
        return Err(TaoError::InvalidData(format!("mb_qp_delta 越界: {delta}")));
    }
    Ok((i32::from(prev_qp) + delta + 52).rem_euclid(52) as u8)
}

// ============================================================
// 宏块网格
// ============================================================

/// 相邻宏块下标
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Neighbours {
    pub left: Option<usize>,
    pub above: Option<usize>,
    pub above_left: Option<usize>,
    pub above_right: Option<usize>,
}

impl Neighbours {
    /// 可用性标志
    pub fn availability(&self) -> Availability {
        let mut avail = Availability::empty();
        avail.set(Availability::LEFT, self.left.is_some());
        avail.set(Availability::ABOVE, self.above.is_some());
        avail.set(Availability::ABOVE_LEFT, self.above_left.is_some());
        avail.set(Availability::ABOVE_RIGHT, self.above_right.is_some());
        avail
    }
}

/// 运动矢量预测用的邻居信息: (是否可用, refIdx, mv)
#[derive(Debug, Clone, Copy)]
struct MvCandidate {
    available: bool,
    ref_idx: i32,
    mv: MotionVector,
}

impl MvCandidate {
    const UNAVAILABLE: Self = Self {
        available: false,
        ref_idx: -1,
        mv: MotionVector::ZERO,
    };
}

/// 一帧的宏块数组
#[derive(Debug, Clone)]
pub struct MacroblockGrid {
    mb_width: usize,
    mb_height: usize,
    mbs: Vec<Macroblock>,
}

impl MacroblockGrid {
    pub fn new(mb_width: usize, mb_height: usize) -> Self {
        Self {
            mb_width,
            mb_height,
            mbs: vec![Macroblock::default(); mb_width * mb_height],
        }
    }

    pub fn mb_width(&self) -> usize {
        self.mb_width
    }

    pub fn mb_height(&self) -> usize {
        self.mb_height
    }

    pub fn len(&self) -> usize {
        self.mbs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mbs.is_empty()
    }

    pub fn get(&self, idx: usize) -> &Macroblock {
        &self.mbs[idx]
    }

    pub fn get_mut(&mut self, idx: usize) -> &mut Macroblock {
        &mut self.mbs[idx]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Macroblock> {
        self.mbs.iter()
    }

    /// 宏块坐标 (mb_x, mb_y)
    pub fn position(&self, idx: usize) -> (usize, usize) {
        (idx % self.mb_width, idx / self.mb_width)
    }

    /// 重置为默认状态
    pub fn reset(&mut self) {
        self.mbs.iter_mut().for_each(|mb| *mb = Macroblock::default());
    }

    /// 计算相邻宏块 (单 slice, 光栅顺序之前的宏块均可用)
    pub fn neighbours(&self, idx: usize) -> Neighbours {
        let (x, y) = self.position(idx);
        let w = self.mb_width;
        Neighbours {
            left: (x > 0).then(|| idx - 1),
            above: (y > 0).then(|| idx - w),
            above_left: (x > 0 && y > 0).then(|| idx - w - 1),
            above_right: (y > 0 && x + 1 < w).then(|| idx - w + 1),
        }
    }

    /// 前一个宏块的 QP_Y, 第一个宏块使用 slice QP
    pub fn prev_qp(&self, idx: usize, slice_qp: u8) -> u8 {
        if idx == 0 {
            slice_qp
        } else {
            self.mbs[idx - 1].committed_qp
        }
    }

    /// 紧挨 idx 之前的连续跳过宏块个数
    pub fn skip_run_before(&self, idx: usize) -> u32 {
        self.mbs[..idx]
            .iter()
            .rev()
            .take_while(|mb| mb.kind == MbKind::Skip)
            .count() as u32
    }

    // ------------------------------------------------------------
    // nC
    // ------------------------------------------------------------

    fn luma_tc(&self, idx: usize, raster: usize) -> u8 {
        self.mbs[idx].luma[raster].total_coeff
    }

    /// 亮度 4x4 块 (光栅下标) 的 nC
    pub fn luma_nc(&self, idx: usize, raster: usize) -> i32 {
        let (bx, by) = (raster % 4, raster / 4);
        let n = self.neighbours(idx);
        let left = if bx > 0 {
            Some(self.luma_tc(idx, raster - 1))
        } else {
            n.left.map(|l| self.luma_tc(l, by * 4 + 3))
        };
        let above = if by > 0 {
            Some(self.luma_tc(idx, raster - 4))
        } else {
            n.above.map(|a| self.luma_tc(a, 12 + bx))
        };
        predict_nc(left, above)
    }

    fn chroma_tc(&self, idx: usize, plane: usize, blk: usize) -> u8 {
        self.mbs[idx].chroma_ac[plane][blk].total_coeff
    }

    /// 色度 AC 块的 nC, `blk` 为 2x2 排列的下标
    pub fn chroma_nc(&self, idx: usize, plane: usize, blk: usize) -> i32 {
        let (bx, by) = (blk % 2, blk / 2);
        let n = self.neighbours(idx);
        let left = if bx > 0 {
            Some(self.chroma_tc(idx, plane, blk - 1))
        } else {
            n.left.map(|l| self.chroma_tc(l, plane, by * 2 + 1))
        };
        let above = if by > 0 {
            Some(self.chroma_tc(idx, plane, blk - 2))
        } else {
            n.above.map(|a| self.chroma_tc(a, plane, 2 + bx))
        };
        predict_nc(left, above)
    }

    // ------------------------------------------------------------
    // 运动矢量预测
    // ------------------------------------------------------------

    fn mv_candidate(&self, idx: Option<usize>) -> MvCandidate {
        match idx {
            None => MvCandidate::UNAVAILABLE,
            Some(i) => {
                let mb = &self.mbs[i];
                if mb.kind.is_intra() {
                    MvCandidate {
                        available: true,
                        ref_idx: -1,
                        mv: MotionVector::ZERO,
                    }
                } else {
                    MvCandidate {
                        available: true,
                        ref_idx: 0,
                        mv: mb.mv,
                    }
                }
            }
        }
    }

    /// 16x16 分区的预测运动矢量 (中值预测)
    pub fn predict_mv(&self, idx: usize) -> MotionVector {
        let n = self.neighbours(idx);
        let a = self.mv_candidate(n.left);
        let mut b = self.mv_candidate(n.above);
        let mut c = self.mv_candidate(n.above_right);
        if !c.available {
            c = self.mv_candidate(n.above_left);
        }
        if !b.available && !c.available && a.available {
            b = a;
            c = a;
        }

        let matches = [a, b, c].iter().filter(|x| x.ref_idx == 0).count();
        if matches == 1 {
            return [a, b, c]
                .into_iter()
                .find(|x| x.ref_idx == 0)
                .map(|x| x.mv)
                .unwrap_or(MotionVector::ZERO);
        }
        MotionVector::median(a.mv, b.mv, c.mv)
    }

    /// P_Skip 的运动矢量
    ///
    /// 左或上不可用, 或其中之一为参考 0 的零矢量时取零矢量, 否则取中值预测.
    pub fn skip_mv(&self, idx: usize) -> MotionVector {
        let n = self.neighbours(idx);
        let a = self.mv_candidate(n.left);
        let b = self.mv_candidate(n.above);
        if !a.available || !b.available {
            return MotionVector::ZERO;
        }
        if (a.ref_idx == 0 && a.mv.is_zero()) || (b.ref_idx == 0 && b.mv.is_zero()) {
            return MotionVector::ZERO;
        }
        self.predict_mv(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_邻居计算() {
        let grid = MacroblockGrid::new(3, 2);
        let n0 = grid.neighbours(0);
        assert_eq!(n0.availability(), Availability::empty());
        let n4 = grid.neighbours(4);
        assert_eq!(n4.left, Some(3));
        assert_eq!(n4.above, Some(1));
        assert_eq!(n4.above_left, Some(0));
        assert_eq!(n4.above_right, Some(2));
        let n5 = grid.neighbours(5);
        assert!(!n5.availability().contains(Availability::ABOVE_RIGHT));
        assert_eq!(grid.neighbours(3).availability(), Availability::ABOVE | Availability::ABOVE_RIGHT);
    }

    #[test]
    fn test_mb_type_映射可逆() {
        for slice_type in [SliceType::I, SliceType::P] {
            for mode in Intra16x16Mode::ALL {
                for cbp_chroma in 0..3 {
                    for ac_coded in [false, true] {
                        let t = MbType::I16x16 {
                            mode,
                            cbp_chroma,
                            ac_coded,
                        };
                        let code = t.to_code(slice_type);
                        assert_eq!(MbType::from_code(code, slice_type).unwrap(), t);
                    }
                }
            }
        }
        assert_eq!(MbType::PL016x16.to_code(SliceType::P), 0);
        assert_eq!(
            MbType::from_code(0, SliceType::P).unwrap(),
            MbType::PL016x16
        );
        // I_16x16_2_0_0 (DC, 无残差)
        let dc = MbType::I16x16 {
            mode: Intra16x16Mode::Dc,
            cbp_chroma: 0,
            ac_coded: false,
        };
        assert_eq!(dc.to_code(SliceType::I), 3);
        assert_eq!(dc.to_code(SliceType::P), 8);
    }

    #[test]
    fn test_不支持的_mb_type() {
        assert!(matches!(
            MbType::from_code(0, SliceType::I),
            Err(TaoError::Unsupported(_))
        ));
        assert!(matches!(
            MbType::from_code(25, SliceType::I),
            Err(TaoError::Unsupported(_))
        ));
        assert!(matches!(
            MbType::from_code(3, SliceType::P),
            Err(TaoError::Unsupported(_))
        ));
        assert!(MbType::from_code(26, SliceType::I).is_err());
    }

    #[test]
    fn test_cbp_推导() {
        let mut mb = Macroblock {
            kind: MbKind::Inter,
            ..Default::default()
        };
        mb.luma[5].coeffs[3] = 1; // 第 0 个 8x8
        mb.luma[10].coeffs[0] = -2; // 第 3 个 8x8
        mb.chroma_dc[1].coeffs[2] = 4;
        mb.derive_cbp();
        assert_eq!(mb.cbp_luma, 0b1001);
        assert_eq!(mb.cbp_chroma, 1);
        mb.chroma_ac[0][3].coeffs[7] = 1;
        mb.derive_cbp();
        assert_eq!(mb.cbp_chroma, 2);
        assert_eq!(mb.cbp(), 0b10_1001);

        mb.kind = MbKind::Intra16x16;
        mb.derive_cbp();
        assert_eq!(mb.cbp_luma, 15);
    }

    #[test]
    fn test_qp_差值回绕() {
        assert_eq!(wrap_qp_delta(30, 26), 4);
        assert_eq!(wrap_qp_delta(0, 51), 1);
        assert_eq!(wrap_qp_delta(51, 0), -1);
        assert_eq!(wrap_qp_delta(10, 40), 22);
        for prev in 0..52u8 {
            for qp in 0..52u8 {
                let d = wrap_qp_delta(qp, prev);
                assert!((-26..=25).contains(&d));
                assert_eq!(apply_qp_delta(prev, d).unwrap(), qp);
            }
        }
        assert!(apply_qp_delta(0, 26).is_err());
    }

    #[test]
    fn test_nc_使用相邻块() {
        let mut grid = MacroblockGrid::new(2, 2);
        grid.get_mut(0).luma[3].total_coeff = 4; // 右上角块
        grid.get_mut(0).luma[15].total_coeff = 6;
        grid.get_mut(1).luma[12].total_coeff = 2;
        // 宏块 1 的块 0: 左为宏块 0 的块 3
        assert_eq!(grid.luma_nc(1, 0), 4);
        // 宏块 3 的块 0: 左为宏块 2 的块 3 (0), 上为宏块 1 的块 12 (2)
        assert_eq!(grid.luma_nc(3, 0), 1);
        // 宏块 2 的块 3: 左为本宏块块 2 (0), 上为宏块 0 的块 15 (6)
        assert_eq!(grid.luma_nc(2, 3), 3);
        // 宏块 2 的块 12: 左邻不可用, 只取上方本宏块块 8
        grid.get_mut(2).luma[8].total_coeff = 7;
        assert_eq!(grid.luma_nc(2, 12), 7);
        grid.get_mut(3).chroma_ac[1][0].total_coeff = 5;
        assert_eq!(grid.chroma_nc(3, 1, 1), 3);
        assert_eq!(grid.chroma_nc(0, 0, 0), 0);
    }

    #[test]
    fn test_运动矢量预测() {
        let mut grid = MacroblockGrid::new(3, 2);
        for i in 0..3 {
            grid.get_mut(i).kind = MbKind::Inter;
        }
        grid.get_mut(0).mv = MotionVector::new(4, 0);
        grid.get_mut(1).mv = MotionVector::new(8, -4);
        grid.get_mut(2).mv = MotionVector::new(12, 4);
        grid.get_mut(3).kind = MbKind::Intra16x16;
        // 宏块 4: 左为帧内, 上为 (8,-4), 右上为 (12,4) → 中值 (8,0)
        assert_eq!(grid.predict_mv(4), MotionVector::new(8, 0));
        // 宏块 1 (第一行): 只有左可用 → 取左
        assert_eq!(grid.predict_mv(1), MotionVector::new(4, 0));
        // 第一行的跳过矢量为零
        assert_eq!(grid.skip_mv(1), MotionVector::ZERO);
        // 宏块 4 的左邻为帧内 (refIdx -1), 上邻非零 → 跳过矢量取预测值
        assert_eq!(grid.skip_mv(4), MotionVector::new(8, 0));
        grid.get_mut(1).mv = MotionVector::ZERO;
        assert_eq!(grid.skip_mv(4), MotionVector::ZERO);
    }

    #[test]
    fn test_跳过游程统计() {
        let mut grid = MacroblockGrid::new(4, 1);
        grid.get_mut(0).kind = MbKind::Inter;
        grid.get_mut(1).kind = MbKind::Skip;
        grid.get_mut(2).kind = MbKind::Skip;
        grid.get_mut(3).kind = MbKind::Inter;
        assert_eq!(grid.skip_run_before(3), 2);
        assert_eq!(grid.skip_run_before(1), 0);
        assert_eq!(grid.skip_run_before(0), 0);
    }
}
