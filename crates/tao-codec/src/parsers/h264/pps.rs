//! H.264 PPS (Picture Parameter Set) 的生成与解析.

use tao_core::{BitReader, BitWriter, TaoError, TaoResult};

use super::exp_golomb::{read_se, read_ue_max, write_se, write_ue};
use super::nal::{rbsp_payload_bits, write_rbsp_trailing_bits};

/// PPS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pps {
    /// pic_parameter_set_id
    pub pps_id: u32,
    /// 引用的 SPS
    pub sps_id: u32,
    /// 熵编码模式 (true=CABAC)
    pub entropy_coding_mode: bool,
    /// bottom_field_pic_order_in_frame_present_flag
    pub bottom_field_pic_order_present: bool,
    /// slice group 数量
    pub num_slice_groups: u32,
    /// 默认 L0 参考数
    pub num_ref_idx_l0_default_active: u32,
    /// 默认 L1 参考数
    pub num_ref_idx_l1_default_active: u32,
    /// 加权预测
    pub weighted_pred: bool,
    /// 双向加权预测模式
    pub weighted_bipred_idc: u32,
    /// 初始 QP (26 + pic_init_qp_minus26)
    pub pic_init_qp: i32,
    /// 初始 QS
    pub pic_init_qs: i32,
    /// 色度 QP 偏移
    pub chroma_qp_index_offset: i32,
    /// slice 头中是否带去块滤波控制
    pub deblocking_filter_control_present: bool,
    /// constrained_intra_pred_flag
    pub constrained_intra_pred: bool,
    /// redundant_pic_cnt_present_flag
    pub redundant_pic_cnt_present: bool,
    /// 是否带有 transform_8x8_mode_flag 等扩展字段
    pub has_extension: bool,
}

impl Pps {
    /// 生成 baseline PPS
    pub fn baseline(pps_id: u32, sps_id: u32, pic_init_qp: i32) -> TaoResult<Self> {
        if pps_id > 255 {
            return Err(TaoError::InvalidArgument(format!(
                "H.264: pps_id 超出范围, pps_id={}",
                pps_id
            )));
        }
        if !(0..=51).contains(&pic_init_qp) {
            return Err(TaoError::InvalidArgument(format!(
                "H.264: pic_init_qp 超出范围, value={}",
                pic_init_qp
            )));
        }
        Ok(Self {
            pps_id,
            sps_id,
            entropy_coding_mode: false,
            bottom_field_pic_order_present: false,
            num_slice_groups: 1,
            num_ref_idx_l0_default_active: 1,
            num_ref_idx_l1_default_active: 1,
            weighted_pred: false,
            weighted_bipred_idc: 0,
            pic_init_qp,
            pic_init_qs: 26,
            chroma_qp_index_offset: 0,
            deblocking_filter_control_present: true,
            constrained_intra_pred: false,
            redundant_pic_cnt_present: false,
            has_extension: false,
        })
    }

    /// 写出 RBSP (含 trailing bits)
    pub fn write_rbsp(&self, bw: &mut BitWriter) -> TaoResult<()> {
        if self.entropy_coding_mode || self.num_slice_groups != 1 {
            return Err(TaoError::Unsupported(
                "H.264: 只生成 CAVLC 单 slice group 的 PPS".into(),
            ));
        }
        write_ue(bw, self.pps_id)?;
        write_ue(bw, self.sps_id)?;
        bw.write_flag(self.entropy_coding_mode)?;
        bw.write_flag(self.bottom_field_pic_order_present)?;
        write_ue(bw, self.num_slice_groups - 1)?;
        write_ue(bw, self.num_ref_idx_l0_default_active - 1)?;
        write_ue(bw, self.num_ref_idx_l1_default_active - 1)?;
        bw.write_flag(self.weighted_pred)?;
        bw.write_bits(self.weighted_bipred_idc, 2)?;
        write_se(bw, self.pic_init_qp - 26)?;
        write_se(bw, self.pic_init_qs - 26)?;
        write_se(bw, self.chroma_qp_index_offset)?;
        bw.write_flag(self.deblocking_filter_control_present)?;
        bw.write_flag(self.constrained_intra_pred)?;
        bw.write_flag(self.redundant_pic_cnt_present)?;
        write_rbsp_trailing_bits(bw)
    }

    /// 生成 RBSP 字节
    pub fn to_rbsp(&self) -> TaoResult<Vec<u8>> {
        let mut bw = BitWriter::new();
        self.write_rbsp(&mut bw)?;
        Ok(bw.finish())
    }
}

/// 从 RBSP 数据解析 PPS
///
/// slice group 映射的细节不解析, 数量大于 1 时直接报告不支持.
pub fn parse_pps(rbsp: &[u8]) -> TaoResult<Pps> {
    let payload_bits = rbsp_payload_bits(rbsp)
        .ok_or_else(|| TaoError::InvalidData("H.264: PPS 缺少 rbsp_stop_one_bit".into()))?;
    let mut br = BitReader::with_bit_len(rbsp, payload_bits);

    let pps_id = read_ue_max(&mut br, 255, "pps_id")?;
    let sps_id = read_ue_max(&mut br, 31, "sps_id")?;
    let entropy_coding_mode = br.read_flag()?;
    let bottom_field_pic_order_present = br.read_flag()?;
    let num_slice_groups = read_ue_max(&mut br, 7, "num_slice_groups_minus1")? + 1;
    if num_slice_groups > 1 {
        return Err(TaoError::Unsupported(format!(
            "H.264: 不支持 slice group, num_slice_groups={}",
            num_slice_groups
        )));
    }
    let num_ref_idx_l0_default_active = read_ue_max(&mut br, 31, "num_ref_idx_l0_default")? + 1;
    let num_ref_idx_l1_default_active = read_ue_max(&mut br, 31, "num_ref_idx_l1_default")? + 1;
    let weighted_pred = br.read_flag()?;
    let weighted_bipred_idc = br.read_bits(2)?;
    let pic_init_qp = 26 + read_se(&mut br)?;
    let pic_init_qs = 26 + read_se(&mut br)?;
    let chroma_qp_index_offset = read_se(&mut br)?;
    if !(0..=51).contains(&pic_init_qp) || !(-12..=12).contains(&chroma_qp_index_offset) {
        return Err(TaoError::InvalidData(format!(
            "H.264: PPS QP 参数非法, pic_init_qp={}, chroma_qp_index_offset={}",
            pic_init_qp, chroma_qp_index_offset
        )));
    }
    let deblocking_filter_control_present = br.read_flag()?;
    let constrained_intra_pred = br.read_flag()?;
    let redundant_pic_cnt_present = br.read_flag()?;
    let has_extension = !br.is_eof();

    Ok(Pps {
        pps_id,
        sps_id,
        entropy_coding_mode,
        bottom_field_pic_order_present,
        num_slice_groups,
        num_ref_idx_l0_default_active,
        num_ref_idx_l1_default_active,
        weighted_pred,
        weighted_bipred_idc,
        pic_init_qp,
        pic_init_qs,
        chroma_qp_index_offset,
        deblocking_filter_control_present,
        constrained_intra_pred,
        redundant_pic_cnt_present,
        has_extension,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline_pps_往返() {
        let pps = Pps::baseline(2, 1, 30).unwrap();
        let parsed = parse_pps(&pps.to_rbsp().unwrap()).unwrap();
        assert_eq!(parsed, pps);
        assert!(!parsed.has_extension);
    }

    #[test]
    fn test_cabac_pps_可以解析() {
        let mut bw = BitWriter::new();
        write_ue(&mut bw, 0).unwrap();
        write_ue(&mut bw, 0).unwrap();
        bw.write_flag(true).unwrap(); // CABAC
        bw.write_flag(false).unwrap();
        write_ue(&mut bw, 0).unwrap();
        write_ue(&mut bw, 0).unwrap();
        write_ue(&mut bw, 0).unwrap();
        bw.write_flag(false).unwrap();
        bw.write_bits(0, 2).unwrap();
        write_se(&mut bw, 0).unwrap();
        write_se(&mut bw, 0).unwrap();
        write_se(&mut bw, 0).unwrap();
        bw.write_bits(0b100, 3).unwrap();
        write_rbsp_trailing_bits(&mut bw).unwrap();

        let parsed = parse_pps(&bw.finish()).unwrap();
        assert!(parsed.entropy_coding_mode);
        assert!(parsed.deblocking_filter_control_present);
    }

    #[test]
    fn test_slice_group_报告不支持() {
        let mut bw = BitWriter::new();
        write_ue(&mut bw, 0).unwrap();
        write_ue(&mut bw, 0).unwrap();
        bw.write_bits(0, 2).unwrap();
        write_ue(&mut bw, 1).unwrap();
        bw.write_bits(0, 16).unwrap();
        write_rbsp_trailing_bits(&mut bw).unwrap();
        assert!(matches!(
            parse_pps(&bw.finish()),
            Err(TaoError::Unsupported(_))
        ));
    }
}
