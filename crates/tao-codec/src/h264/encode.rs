//! 图像编码流程.
//!
//! 每幅图像: (可选) SPS/PPS → slice 头 → 宏块数据 (P slice 中跳过宏块按游程编码)
//! → rbsp_trailing_bits → 防竞争字节 → 重建图像去块滤波后成为下一幅的参考.
//!
//! 宏块的 QP 由 [`rdo`](super::rdo) 在比特预算内搜索; 搜索阶段只计数,
//! 确定 QP 后再按光栅顺序真正写出一遍, 写出与重建的结果和探测时完全一致.

use log::{debug, trace, warn};
use tao_core::{BitWriter, TaoError, TaoResult};

use super::config::{H264Config, ModeOfOperation, PictureCodingType};
use super::deblock::{DeblockParams, deblock_picture};
use super::intra::{ChromaEdges, IntraPredictor, LumaEdges, predict_mb};
use super::macroblock::{
    Intra16x16Mode, IntraChromaMode, Macroblock, MacroblockGrid, MbKind, wrap_qp_delta,
};
use super::motion::{
    FullSearchEstimator, MotionCompensator, MotionEstimator, MotionVector, QpelCompensator,
};
use super::picture::{MbSamples, YuvPicture};
use super::rdo::{self, MacroblockProbe, QpChoice, QpPlan, RdPoint, RdoTuning};
use super::residual::{quantize_residual, reconstruct};
use super::slice_data::{mark_skip, skip_run_bits, write_macroblock, write_skip_run};
use crate::parsers::h264::nal::{NalUnitType, write_nal_unit, write_rbsp_trailing_bits};
use crate::parsers::h264::{Pps, SliceHeader, SliceType, Sps};

/// 预算为 0 (不限) 时使用的上限
const UNLIMITED_BUDGET: usize = usize::MAX / 8;
/// 防竞争字节导致超预算时的最多编码次数
const MAX_EPB_ATTEMPTS: usize = 4;
/// 起始码 (4 字节) + NAL 头 (1 字节)
const NAL_OVERHEAD_BITS: usize = 40;
/// rbsp_trailing_bits 的最大长度
const TRAILING_BITS_MAX: usize = 8;
/// I slice 空编码宏块的比特上界: mb_type 5 + 色度模式 1 + mb_qp_delta 1 + 亮度 DC coeff_token 6
const NULL_INTRA_MB_BITS: usize = 13;

/// P 图像中宏块的预测方式 (预编码阶段决定, QP 搜索期间不变)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MbDecision {
    Intra,
    Inter(MotionVector),
}

/// 一幅编码后的图像
#[derive(Debug, Clone)]
pub struct EncodedPicture {
    /// Annex B 字节流 (可能带前置 SPS/PPS)
    pub data: Vec<u8>,
    /// 有效位长度
    pub bit_len: usize,
    pub picture_type: PictureCodingType,
    pub frame_num: u32,
    /// 是否携带参数集
    pub has_param_sets: bool,
    /// 正常编码宏块的 QP 范围
    pub qp_range: Option<(u8, u8)>,
    /// 空编码宏块数
    pub null_mbs: usize,
    /// P_Skip 宏块数
    pub skipped_mbs: usize,
    /// 帧内宏块数
    pub intra_mbs: usize,
    /// QP 搜索是否进入截断
    pub truncated: bool,
    /// 宏块最大失真
    pub max_distortion: u64,
}

// ============================================================
// 单个 slice 的宏块编码
// ============================================================

/// 一次 slice 编码尝试的工作状态
struct SliceCoder<'a> {
    source: &'a YuvPicture,
    reference: Option<&'a YuvPicture>,
    compensator: &'a dyn MotionCompensator,
    decisions: &'a [MbDecision],
    grid: MacroblockGrid,
    /// 去块滤波前的重建图像
    recon: YuvPicture,
    slice_type: SliceType,
    slice_qp: u8,
    chroma_qp_offset: i32,
    /// 单个宏块的比特上限
    bit_limit: usize,
}

impl SliceCoder<'_> {
    fn decision(&self, idx: usize) -> MbDecision {
        match self.slice_type {
            SliceType::I => MbDecision::Intra,
            SliceType::P => self.decisions.get(idx).copied().unwrap_or(MbDecision::Intra),
        }
    }

    fn intra_edges(&self, idx: usize) -> (LumaEdges, [ChromaEdges; 2]) {
        let (mb_x, mb_y) = self.grid.position(idx);
        let avail = self.grid.neighbours(idx).availability();
        (
            LumaEdges::from_picture(&self.recon, mb_x, mb_y, avail),
            [
                ChromaEdges::from_picture(&self.recon, 0, mb_x, mb_y, avail),
                ChromaEdges::from_picture(&self.recon, 1, mb_x, mb_y, avail),
            ],
        )
    }

    fn inter_prediction(&self, mb_x: usize, mb_y: usize, mv: MotionVector) -> TaoResult<MbSamples> {
        let reference = self
            .reference
            .ok_or_else(|| TaoError::Internal("P slice 缺少参考图像".into()))?;
        let mut pred = MbSamples::default();
        self.compensator
            .compensate(reference, mb_x * 16, mb_y * 16, mv, &mut pred);
        Ok(pred)
    }

    /// 按 `choice` 编码第 `idx` 个宏块, 写入 `bw` 并更新网格与重建图像
    fn code_mb(&mut self, idx: usize, choice: QpChoice, bw: &mut BitWriter) -> TaoResult<RdPoint> {
        let start = bw.bits_written();
        let (mb_x, mb_y) = self.grid.position(idx);
        let src = self.source.load_mb(mb_x, mb_y);
        let prev_qp = self.grid.prev_qp(idx, self.slice_qp);
        let inter_slice = self.slice_type == SliceType::P;

        let recon = match choice {
            QpChoice::Null if inter_slice => {
                mark_skip(&mut self.grid, idx, prev_qp);
                self.inter_prediction(mb_x, mb_y, self.grid.get(idx).mv)?
            }
            QpChoice::Null => {
                let (luma, chroma) = self.intra_edges(idx);
                let pred = predict_mb(Intra16x16Mode::Dc, IntraChromaMode::Dc, &luma, &chroma)
                    .ok_or_else(|| TaoError::Internal("DC 预测不可用".into()))?;
                *self.grid.get_mut(idx) = Macroblock {
                    kind: MbKind::Intra16x16,
                    luma_mode: Intra16x16Mode::Dc,
                    chroma_mode: IntraChromaMode::Dc,
                    probe_qp: prev_qp,
                    committed_qp: prev_qp,
                    ..Macroblock::default()
                };
                write_macroblock(bw, &mut self.grid, idx, self.slice_type)?;
                pred
            }
            QpChoice::Full(qp) => {
                let (mut mb, pred) = match self.decision(idx) {
                    MbDecision::Intra => {
                        let (luma, chroma) = self.intra_edges(idx);
                        let d = IntraPredictor.select(&src, &luma, &chroma);
                        let mb = Macroblock {
                            kind: MbKind::Intra16x16,
                            luma_mode: d.luma_mode,
                            chroma_mode: d.chroma_mode,
                            ..Macroblock::default()
                        };
                        (mb, d.prediction)
                    }
                    MbDecision::Inter(mv) => {
                        let mb = Macroblock {
                            kind: MbKind::Inter,
                            mv,
                            ..Macroblock::default()
                        };
                        (mb, self.inter_prediction(mb_x, mb_y, mv)?)
                    }
                };
                quantize_residual(&mut mb, &src, &pred, qp, self.chroma_qp_offset);

                if mb.kind == MbKind::Inter
                    && mb.cbp() == 0
                    && mb.mv.is_zero()
                    && self.grid.skip_mv(idx).is_zero()
                {
                    mark_skip(&mut self.grid, idx, prev_qp);
                    pred
                } else {
                    if mb.has_qp_delta() {
                        mb.committed_qp = qp;
                        mb.qp_delta = wrap_qp_delta(qp, prev_qp);
                    } else {
                        mb.committed_qp = prev_qp;
                    }
                    *self.grid.get_mut(idx) = mb;
                    if inter_slice {
                        write_skip_run(bw, self.grid.skip_run_before(idx))?;
                    }
                    write_macroblock(bw, &mut self.grid, idx, self.slice_type)?;
                    reconstruct(self.grid.get(idx), &pred, self.chroma_qp_offset)
                }
            }
        };

        self.recon.store_mb(mb_x, mb_y, &recon);
        Ok(RdPoint {
            rate: bw.bits_written() - start,
            distortion: src.ssd(&recon),
        })
    }

    /// 按最终选择写出整个 slice_data
    fn write_slice_data(&mut self, bw: &mut BitWriter, choices: &[QpChoice]) -> TaoResult<()> {
        for (idx, &choice) in choices.iter().enumerate() {
            let p = self.code_mb(idx, choice, bw)?;
            trace!(
                "mb {idx}: {:?} {:?} qp={} bits={}",
                choice,
                self.grid.get(idx).kind,
                self.grid.get(idx).committed_qp,
                p.rate
            );
        }
        if self.slice_type == SliceType::P {
            let run = self.grid.skip_run_before(self.grid.len());
            if run > 0 {
                write_skip_run(bw, run)?;
            }
        }
        Ok(())
    }
}

impl MacroblockProbe for SliceCoder<'_> {
    fn mb_count(&self) -> usize {
        self.grid.len()
    }

    fn probe(&mut self, idx: usize, choice: QpChoice) -> TaoResult<RdPoint> {
        let mut bw = BitWriter::counter();
        if matches!(choice, QpChoice::Full(_)) {
            bw.set_limit(Some(self.bit_limit));
        }
        self.code_mb(idx, choice, &mut bw)
    }

    fn null_cost(&self, from: usize) -> usize {
        let n = self.grid.len();
        let remaining = n.saturating_sub(from);
        match self.slice_type {
            SliceType::I => NULL_INTRA_MB_BITS * remaining,
            SliceType::P => {
                let run = self.grid.skip_run_before(from.min(n)) as usize + remaining;
                if run == 0 {
                    0
                } else {
                    skip_run_bits(run as u32)
                }
            }
        }
    }
}

/// 一次 slice 编码尝试的结果
struct SliceOutput {
    nal: Vec<u8>,
    /// 去块滤波后的重建图像
    recon: YuvPicture,
    grid: MacroblockGrid,
    plan: QpPlan,
}

// ============================================================
// 图像编码器
// ============================================================

/// H.264 baseline 图像编码器
///
/// 持有参数集、参考图像与 GOP 状态; 每次 [`encode`](Self::encode) 产出一个访问单元.
pub struct PictureEncoder {
    config: H264Config,
    sps: Sps,
    pps: Pps,
    estimator: Box<dyn MotionEstimator>,
    compensator: Box<dyn MotionCompensator>,
    tuning: RdoTuning,
    /// 上一幅图像去块滤波后的重建
    reference: Option<YuvPicture>,
    frame_num: u32,
    idr_pic_id: u32,
    /// 距上一幅 I 图像的图像数
    since_intra: u32,
    /// 打开后尚未输出过参数集
    param_sets_pending: bool,
}

impl PictureEncoder {
    pub fn new(config: H264Config) -> TaoResult<Self> {
        let sps = Sps::baseline(config.width, config.height, config.seq_param_set)?;
        let pps = Pps::baseline(
            config.pic_param_set,
            config.seq_param_set,
            i32::from(config.quality),
        )?;
        debug!(
            "打开 H.264 编码器: {}x{}, quality={}, mode={:?}",
            config.width, config.height, config.quality, config.mode
        );
        Ok(Self {
            estimator: Box::new(FullSearchEstimator::new(config.motion_search_range)),
            compensator: Box::new(QpelCompensator),
            tuning: RdoTuning::default(),
            config,
            sps,
            pps,
            reference: None,
            frame_num: 0,
            idr_pic_id: 0,
            since_intra: 0,
            param_sets_pending: true,
        })
    }

    /// 替换运动估计与运动补偿
    pub fn with_motion(
        mut self,
        estimator: Box<dyn MotionEstimator>,
        compensator: Box<dyn MotionCompensator>,
    ) -> Self {
        self.estimator = estimator;
        self.compensator = compensator;
        self
    }

    /// 替换 QP 搜索参数
    pub fn with_tuning(mut self, tuning: RdoTuning) -> Self {
        self.tuning = tuning;
        self
    }

    pub fn config(&self) -> &H264Config {
        &self.config
    }

    pub fn sps(&self) -> &Sps {
        &self.sps
    }

    pub fn pps(&self) -> &Pps {
        &self.pps
    }

    /// 最近一幅图像的重建 (去块滤波后), 与解码端输出一致
    pub fn reference(&self) -> Option<&YuvPicture> {
        self.reference.as_ref()
    }

    /// 修改参数; 尺寸与参数集 ID 在打开后不可修改
    pub fn set_parameter(&mut self, key: &str, value: &str) -> TaoResult<()> {
        let mut config = self.config.clone();
        config.set_parameter(key, value)?;
        if config.width != self.config.width
            || config.height != self.config.height
            || config.seq_param_set != self.config.seq_param_set
            || config.pic_param_set != self.config.pic_param_set
        {
            return Err(TaoError::InvalidArgument(format!(
                "编码器打开后不能修改参数 \"{key}\""
            )));
        }
        if config.motion_search_range != self.config.motion_search_range {
            self.estimator = Box::new(FullSearchEstimator::new(config.motion_search_range));
        }
        self.config = config;
        Ok(())
    }

    pub fn get_parameter(&self, key: &str) -> TaoResult<String> {
        self.config.get_parameter(key)
    }

    /// SPS + PPS 的 Annex B 字节流
    pub fn param_sets(&self) -> TaoResult<Vec<u8>> {
        let mut out = Vec::new();
        let epb = self.config.emulation_prevention;
        write_nal_unit(&mut out, 3, NalUnitType::Sps, &self.sps.to_rbsp()?, epb);
        write_nal_unit(&mut out, 3, NalUnitType::Pps, &self.pps.to_rbsp()?, epb);
        Ok(out)
    }

    /// 丢弃参考图像, 下一幅从 IDR 开始
    pub fn reset(&mut self) {
        self.reference = None;
        self.frame_num = 0;
        self.since_intra = 0;
        self.param_sets_pending = true;
    }

    fn next_picture_type(&self) -> PictureCodingType {
        if self.reference.is_none() || self.config.picture_coding_type == PictureCodingType::Intra
        {
            return PictureCodingType::Intra;
        }
        let period = self.config.intra_period;
        if self.config.auto_i_picture && period > 0 && self.since_intra >= period {
            return PictureCodingType::Intra;
        }
        PictureCodingType::Inter
    }

    /// P 图像的预编码: 运动估计失真不大于帧内失真的宏块走帧间
    fn decide_modes(&self, source: &YuvPicture, reference: &YuvPicture) -> Vec<MbDecision> {
        let estimates = self.estimator.estimate(source, reference);
        let layout = MacroblockGrid::new(source.mb_width(), source.mb_height());
        (0..layout.len())
            .map(|idx| {
                let (mb_x, mb_y) = layout.position(idx);
                let avail = layout.neighbours(idx).availability();
                let src = source.load_mb(mb_x, mb_y);
                let luma = LumaEdges::from_picture(source, mb_x, mb_y, avail);
                let chroma = [
                    ChromaEdges::from_picture(source, 0, mb_x, mb_y, avail),
                    ChromaEdges::from_picture(source, 1, mb_x, mb_y, avail),
                ];
                let intra_ssd = IntraPredictor.select(&src, &luma, &chroma).ssd;
                match estimates.get(idx) {
                    Some(e) if e.distortion <= intra_ssd => MbDecision::Inter(e.mv),
                    _ => MbDecision::Intra,
                }
            })
            .collect()
    }

    fn slice_header(&self, picture_type: PictureCodingType, frame_num: u32) -> SliceHeader {
        let slice_type = match picture_type {
            PictureCodingType::Intra => SliceType::I,
            PictureCodingType::Inter => SliceType::P,
        };
        let mut header = SliceHeader::new(slice_type, self.pps.pps_id, frame_num);
        if picture_type == PictureCodingType::Intra {
            header.idr_pic_id = Some(self.idr_pic_id);
        }
        header.slice_qp_delta = i32::from(self.config.quality) - self.pps.pic_init_qp;
        header.disable_deblocking_filter_idc = if self.config.loop_filter { 0 } else { 1 };
        header
    }

    /// 编码一个 slice NAL, `allowed_total` 为整个访问单元的比特上限
    fn encode_slice(
        &self,
        source: &YuvPicture,
        header: &SliceHeader,
        decisions: &[MbDecision],
        allowed_total: usize,
        param_bits: usize,
    ) -> TaoResult<SliceOutput> {
        let (nal_type, ref_idc) = match header.slice_type {
            SliceType::I => (NalUnitType::SliceIdr, 3),
            SliceType::P => (NalUnitType::Slice, 2),
        };

        let mut counter = BitWriter::counter();
        header.write(&mut counter, &self.sps, &self.pps, nal_type, ref_idc)?;
        let fixed = param_bits + NAL_OVERHEAD_BITS + counter.bits_written() + TRAILING_BITS_MAX;
        let allowed = allowed_total
            .checked_sub(fixed)
            .ok_or(TaoError::BudgetUnsatisfiable {
                required: fixed,
                available: allowed_total,
            })?;

        let slice_qp = u8::try_from(header.slice_qp(&self.pps))
            .map_err(|_| TaoError::Internal("slice QP 越界".into()))?;
        let mut coder = SliceCoder {
            source,
            reference: self.reference.as_ref(),
            compensator: self.compensator.as_ref(),
            decisions,
            grid: MacroblockGrid::new(source.mb_width(), source.mb_height()),
            recon: YuvPicture::new(source.width(), source.height())?,
            slice_type: header.slice_type,
            slice_qp,
            chroma_qp_offset: self.pps.chroma_qp_index_offset,
            bit_limit: allowed,
        };

        let quality = self.config.quality;
        let plan = match self.config.mode {
            ModeOfOperation::FixedQp => match rdo::fixed_qp(&mut coder, allowed, quality)? {
                Some(plan) => plan,
                None => {
                    debug!("固定 QP {quality} 超出预算, 改用自适应搜索");
                    rdo::search(&mut coder, allowed, quality, &self.tuning)?
                }
            },
            ModeOfOperation::MinMaxAdaptive => {
                rdo::search(&mut coder, allowed, quality, &self.tuning)?
            }
        };

        let mut bw = BitWriter::new();
        header.write(&mut bw, &self.sps, &self.pps, nal_type, ref_idc)?;
        coder.write_slice_data(&mut bw, &plan.choices)?;
        write_rbsp_trailing_bits(&mut bw)?;
        let rbsp = bw.finish();
        let mut nal = Vec::with_capacity(rbsp.len() + 8);
        write_nal_unit(
            &mut nal,
            ref_idc,
            nal_type,
            &rbsp,
            self.config.emulation_prevention,
        );

        let SliceCoder {
            mut recon, grid, ..
        } = coder;
        deblock_picture(&mut recon, &grid, &DeblockParams::from_slice(header, &self.pps));
        Ok(SliceOutput {
            nal,
            recon,
            grid,
            plan,
        })
    }

    /// 编码一幅图像
    ///
    /// `bit_budget` 为整个访问单元 (含参数集) 的比特上限, 0 表示不限;
    /// I 图像的预算先按 `ipicturemultiplier` / `ipicturefraction` 放大.
    /// 返回 `BudgetUnsatisfiable` 时编码器状态不变, 调用方可丢弃该图像后继续.
    pub fn encode(&mut self, picture: &YuvPicture, bit_budget: usize) -> TaoResult<EncodedPicture> {
        if picture.width() != self.config.width || picture.height() != self.config.height {
            return Err(TaoError::InvalidArgument(format!(
                "图像尺寸 {}x{} 与编码器 {}x{} 不一致",
                picture.width(),
                picture.height(),
                self.config.width,
                self.config.height
            )));
        }

        let picture_type = self.next_picture_type();
        let budget = match (bit_budget, picture_type) {
            (0, _) => UNLIMITED_BUDGET,
            (b, PictureCodingType::Intra) => self.config.i_picture_budget(b),
            (b, PictureCodingType::Inter) => b,
        };
        let has_param_sets = (picture_type == PictureCodingType::Intra
            && self.config.prepend_param_sets)
            || (self.param_sets_pending && self.config.gen_param_set_on_open);
        let param_sets = if has_param_sets {
            self.param_sets()?
        } else {
            Vec::new()
        };

        let frame_num = match picture_type {
            PictureCodingType::Intra => 0,
            PictureCodingType::Inter => (self.frame_num + 1) % self.sps.max_frame_num(),
        };
        let decisions = match (picture_type, self.reference.as_ref()) {
            (PictureCodingType::Inter, Some(reference)) => self.decide_modes(picture, reference),
            _ => Vec::new(),
        };
        let header = self.slice_header(picture_type, frame_num);

        let mut allowed_total = budget;
        let mut last_total = 0;
        for attempt in 1..=MAX_EPB_ATTEMPTS {
            let out = self.encode_slice(
                picture,
                &header,
                &decisions,
                allowed_total,
                param_sets.len() * 8,
            )?;
            let total_bits = (param_sets.len() + out.nal.len()) * 8;
            if total_bits <= budget {
                return Ok(self.commit(picture_type, frame_num, param_sets, out));
            }
            let overshoot = total_bits - budget;
            warn!("防竞争字节使输出超出预算 {overshoot} 比特, 第 {attempt} 次重新编码");
            allowed_total = allowed_total.saturating_sub(overshoot);
            last_total = total_bits;
        }
        Err(TaoError::BudgetUnsatisfiable {
            required: last_total,
            available: budget,
        })
    }

    /// 编码成功后更新 GOP 状态与参考图像
    fn commit(
        &mut self,
        picture_type: PictureCodingType,
        frame_num: u32,
        param_sets: Vec<u8>,
        out: SliceOutput,
    ) -> EncodedPicture {
        let has_param_sets = !param_sets.is_empty();
        let mut data = param_sets;
        data.extend_from_slice(&out.nal);
        let bit_len = data.len() * 8;

        let skipped_mbs = out.grid.iter().filter(|mb| mb.kind == MbKind::Skip).count();
        let intra_mbs = out.grid.iter().filter(|mb| mb.kind.is_intra()).count();
        debug!(
            "编码 {picture_type} 图像: frame_num={frame_num}, {bit_len} 比特, QP {:?}, 跳过 {skipped_mbs}, 空编码 {}",
            out.plan.qp_range(),
            out.plan.null_count()
        );

        self.reference = Some(out.recon);
        self.frame_num = frame_num;
        self.param_sets_pending = false;
        match picture_type {
            PictureCodingType::Intra => {
                self.idr_pic_id ^= 1;
                self.since_intra = 1;
                if self.config.auto_i_picture {
                    self.config.picture_coding_type = PictureCodingType::Inter;
                }
            }
            PictureCodingType::Inter => self.since_intra += 1,
        }
        self.config.last_pic_coding_type = picture_type;

        EncodedPicture {
            data,
            bit_len,
            picture_type,
            frame_num,
            has_param_sets,
            qp_range: out.plan.qp_range(),
            null_mbs: out.plan.null_count(),
            skipped_mbs,
            intra_mbs,
            truncated: out.plan.truncated,
            max_distortion: out.plan.max_distortion,
        }
    }
}
