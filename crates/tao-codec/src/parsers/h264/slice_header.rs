//! H.264 slice 头的生成与解析.
//!
//! 只覆盖 baseline 单参考帧场景: I/P slice, 不做参考列表重排,
//! 解码参考标记只接受滑动窗口.

use tao_core::{BitReader, BitWriter, TaoError, TaoResult};

use super::exp_golomb::{read_se, read_ue, read_ue_max, write_se, write_ue};
use super::nal::NalUnitType;
use super::pps::Pps;
use super::sps::Sps;

/// slice 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceType {
    /// P slice
    P,
    /// I slice
    I,
}

impl SliceType {
    /// 从 slice_type 语法值解析 (接受 +5 的"全图同类型"写法)
    pub fn from_raw(raw: u32) -> TaoResult<Self> {
        match raw % 5 {
            0 => Ok(Self::P),
            2 => Ok(Self::I),
            1 => Err(TaoError::Unsupported("H.264: 不支持 B slice".into())),
            _ => Err(TaoError::Unsupported(format!(
                "H.264: 不支持 SP/SI slice, slice_type={raw}"
            ))),
        }
    }

    /// 写出时使用的语法值
    pub fn raw(&self) -> u32 {
        match self {
            Self::P => 5,
            Self::I => 7,
        }
    }

    /// 是否为帧内 slice
    pub fn is_intra(&self) -> bool {
        matches!(self, Self::I)
    }
}

/// slice 头
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceHeader {
    /// first_mb_in_slice
    pub first_mb: u32,
    /// slice 类型
    pub slice_type: SliceType,
    /// 引用的 PPS
    pub pps_id: u32,
    /// frame_num
    pub frame_num: u32,
    /// idr_pic_id (仅 IDR)
    pub idr_pic_id: Option<u32>,
    /// pic_order_cnt_lsb (仅 poc_type==0)
    pub poc_lsb: u32,
    /// 生效的 L0 参考数
    pub num_ref_idx_l0_active: u32,
    /// no_output_of_prior_pics_flag (仅 IDR)
    pub no_output_of_prior_pics: bool,
    /// long_term_reference_flag (仅 IDR)
    pub long_term_reference: bool,
    /// slice_qp_delta
    pub slice_qp_delta: i32,
    /// disable_deblocking_filter_idc (0=开, 1=关, 2=不跨 slice 边界)
    pub disable_deblocking_filter_idc: u32,
    /// slice_alpha_c0_offset_div2
    pub alpha_offset_div2: i32,
    /// slice_beta_offset_div2
    pub beta_offset_div2: i32,
}

impl SliceHeader {
    /// 创建单 slice 图像的 slice 头
    pub fn new(slice_type: SliceType, pps_id: u32, frame_num: u32) -> Self {
        Self {
            first_mb: 0,
            slice_type,
            pps_id,
            frame_num,
            idr_pic_id: None,
            poc_lsb: 0,
            num_ref_idx_l0_active: 1,
            no_output_of_prior_pics: false,
            long_term_reference: false,
            slice_qp_delta: 0,
            disable_deblocking_filter_idc: 0,
            alpha_offset_div2: 0,
            beta_offset_div2: 0,
        }
    }

    /// slice 的起始 QP
    pub fn slice_qp(&self, pps: &Pps) -> i32 {
        pps.pic_init_qp + self.slice_qp_delta
    }

    /// 写出 slice 头
    pub fn write(
        &self,
        bw: &mut BitWriter,
        sps: &Sps,
        pps: &Pps,
        nal_type: NalUnitType,
        ref_idc: u8,
    ) -> TaoResult<()> {
        write_ue(bw, self.first_mb)?;
        write_ue(bw, self.slice_type.raw())?;
        write_ue(bw, self.pps_id)?;
        bw.write_bits(self.frame_num % sps.max_frame_num(), sps.log2_max_frame_num)?;
        if nal_type.is_idr() {
            write_ue(bw, self.idr_pic_id.unwrap_or(0))?;
        }
        if sps.poc_type == 0 {
            bw.write_bits(self.poc_lsb, sps.log2_max_poc_lsb)?;
        }
        if self.slice_type == SliceType::P {
            let override_flag = self.num_ref_idx_l0_active != pps.num_ref_idx_l0_default_active;
            bw.write_flag(override_flag)?;
            if override_flag {
                write_ue(bw, self.num_ref_idx_l0_active - 1)?;
            }
            bw.write_bit(0)?; // ref_pic_list_modification_flag_l0
        }
        if ref_idc != 0 {
            if nal_type.is_idr() {
                bw.write_flag(self.no_output_of_prior_pics)?;
                bw.write_flag(self.long_term_reference)?;
            } else {
                bw.write_bit(0)?; // adaptive_ref_pic_marking_mode_flag
            }
        }
        write_se(bw, self.slice_qp_delta)?;
        if pps.deblocking_filter_control_present {
            write_ue(bw, self.disable_deblocking_filter_idc)?;
            if self.disable_deblocking_filter_idc != 1 {
                write_se(bw, self.alpha_offset_div2)?;
                write_se(bw, self.beta_offset_div2)?;
            }
        }
        Ok(())
    }
}

/// 解析 slice 头
///
/// `lookup` 按 pps_id 返回生效的参数集.
pub fn parse_slice_header<'a, F>(
    br: &mut BitReader,
    nal_type: NalUnitType,
    ref_idc: u8,
    lookup: F,
) -> TaoResult<(SliceHeader, &'a Sps, &'a Pps)>
where
    F: FnOnce(u32) -> TaoResult<(&'a Sps, &'a Pps)>,
{
    let first_mb = read_ue(br)?;
    let slice_type = SliceType::from_raw(read_ue_max(br, 9, "slice_type")?)?;
    if nal_type.is_idr() && slice_type != SliceType::I {
        return Err(TaoError::InvalidData("H.264: IDR 图像必须为 I slice".into()));
    }
    let pps_id = read_ue_max(br, 255, "pps_id")?;
    let (sps, pps) = lookup(pps_id)?;

    let frame_num = br.read_bits(sps.log2_max_frame_num)?;
    if !sps.frame_mbs_only && br.read_flag()? {
        return Err(TaoError::Unsupported("H.264: 不支持场编码".into()));
    }
    let idr_pic_id = if nal_type.is_idr() {
        Some(read_ue_max(br, 65535, "idr_pic_id")?)
    } else {
        None
    };
    let mut poc_lsb = 0;
    if sps.poc_type == 0 {
        poc_lsb = br.read_bits(sps.log2_max_poc_lsb)?;
        if pps.bottom_field_pic_order_present {
            read_se(br)?; // delta_pic_order_cnt_bottom
        }
    }
    if sps.poc_type == 1 && !sps.delta_pic_order_always_zero {
        read_se(br)?;
        if pps.bottom_field_pic_order_present {
            read_se(br)?;
        }
    }
    if pps.redundant_pic_cnt_present && read_ue(br)? != 0 {
        return Err(TaoError::Unsupported("H.264: 不支持冗余图像".into()));
    }

    let mut num_ref_idx_l0_active = pps.num_ref_idx_l0_default_active;
    if slice_type == SliceType::P {
        if br.read_flag()? {
            num_ref_idx_l0_active = read_ue_max(br, 31, "num_ref_idx_l0_active_minus1")? + 1;
        }
        if br.read_flag()? {
            return Err(TaoError::Unsupported("H.264: 不支持参考列表重排".into()));
        }
        if pps.weighted_pred {
            return Err(TaoError::Unsupported("H.264: 不支持加权预测".into()));
        }
    }

    let mut no_output_of_prior_pics = false;
    let mut long_term_reference = false;
    if ref_idc != 0 {
        if nal_type.is_idr() {
            no_output_of_prior_pics = br.read_flag()?;
            long_term_reference = br.read_flag()?;
        } else if br.read_flag()? {
            // 单参考帧下 MMCO 不改变预测来源, 解析后忽略
            loop {
                let op = read_ue_max(br, 6, "memory_management_control_operation")?;
                match op {
                    0 => break,
                    1 | 3 => {
                        read_ue(br)?;
                        if op == 3 {
                            read_ue(br)?;
                        }
                    }
                    2 | 6 => {
                        read_ue(br)?;
                    }
                    4 => {
                        read_ue(br)?;
                    }
                    _ => {}
                }
            }
        }
    }

    if pps.entropy_coding_mode {
        return Err(TaoError::Unsupported("H.264: 不支持 CABAC".into()));
    }
    let slice_qp_delta = read_se(br)?;
    let qp = pps.pic_init_qp + slice_qp_delta;
    if !(0..=51).contains(&qp) {
        return Err(TaoError::InvalidData(format!(
            "H.264: slice QP 超出范围, qp={qp}"
        )));
    }

    let mut disable_deblocking_filter_idc = 0;
    let mut alpha_offset_div2 = 0;
    let mut beta_offset_div2 = 0;
    if pps.deblocking_filter_control_present {
        disable_deblocking_filter_idc = read_ue_max(br, 2, "disable_deblocking_filter_idc")?;
        if disable_deblocking_filter_idc != 1 {
            alpha_offset_div2 = read_se(br)?;
            beta_offset_div2 = read_se(br)?;
            if !(-6..=6).contains(&alpha_offset_div2) || !(-6..=6).contains(&beta_offset_div2) {
                return Err(TaoError::InvalidData(format!(
                    "H.264: 去块滤波偏移非法, alpha={alpha_offset_div2}, beta={beta_offset_div2}"
                )));
            }
        }
    }

    Ok((
        SliceHeader {
            first_mb,
            slice_type,
            pps_id,
            frame_num,
            idr_pic_id,
            poc_lsb,
            num_ref_idx_l0_active,
            no_output_of_prior_pics,
            long_term_reference,
            slice_qp_delta,
            disable_deblocking_filter_idc,
            alpha_offset_div2,
            beta_offset_div2,
        },
        sps,
        pps,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param_sets() -> (Sps, Pps) {
        (
            Sps::baseline(64, 48, 0).unwrap(),
            Pps::baseline(0, 0, 26).unwrap(),
        )
    }

    fn roundtrip(header: &SliceHeader, nal_type: NalUnitType) -> SliceHeader {
        let (sps, pps) = param_sets();
        let mut bw = BitWriter::new();
        header.write(&mut bw, &sps, &pps, nal_type, 3).unwrap();
        let bits = bw.bits_written();
        let data = bw.finish();
        let mut br = BitReader::with_bit_len(&data, bits);
        let (parsed, _, _) = parse_slice_header(&mut br, nal_type, 3, |id| {
            assert_eq!(id, 0);
            Ok((&sps, &pps))
        })
        .unwrap();
        assert_eq!(br.bits_read(), bits);
        parsed
    }

    #[test]
    fn test_idr_slice_头往返() {
        let mut header = SliceHeader::new(SliceType::I, 0, 0);
        header.idr_pic_id = Some(1);
        header.slice_qp_delta = -4;
        assert_eq!(roundtrip(&header, NalUnitType::SliceIdr), header);
    }

    #[test]
    fn test_p_slice_头往返() {
        let mut header = SliceHeader::new(SliceType::P, 0, 17);
        header.slice_qp_delta = 7;
        header.disable_deblocking_filter_idc = 1;
        assert_eq!(roundtrip(&header, NalUnitType::Slice), header);
    }

    #[test]
    fn test_slice_type_语法值() {
        assert_eq!(SliceType::from_raw(7).unwrap(), SliceType::I);
        assert_eq!(SliceType::from_raw(0).unwrap(), SliceType::P);
        assert!(matches!(SliceType::from_raw(6), Err(TaoError::Unsupported(_))));
        assert!(matches!(SliceType::from_raw(3), Err(TaoError::Unsupported(_))));
    }
}
