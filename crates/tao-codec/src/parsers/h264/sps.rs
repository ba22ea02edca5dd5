//! H.264 SPS (Sequence Parameter Set) 的生成与解析.
//!
//! 编码端只生成 baseline profile 的 SPS:
//! - profile_idc = 66, constraint_set0/1 置位
//! - pic_order_cnt_type = 2 (输出顺序即解码顺序)
//! - 单参考帧, 仅帧编码, 按需裁剪到非 16 整数倍的尺寸
//!
//! 解析端接受任意 profile 的语法, 由解码器再检查是否处于支持范围.

use tao_core::{BitReader, BitWriter, TaoError, TaoResult};

use super::exp_golomb::{read_se, read_ue, read_ue_max, write_ue};
use super::nal::write_rbsp_trailing_bits;

/// baseline profile
pub const PROFILE_BASELINE: u8 = 66;

/// SPS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sps {
    /// profile_idc (66=Baseline, 77=Main, 100=High)
    pub profile_idc: u8,
    /// constraint_set 标志位
    pub constraint_set_flags: u8,
    /// level_idc (如 30=3.0)
    pub level_idc: u8,
    /// seq_parameter_set_id
    pub sps_id: u32,
    /// 色度格式 (1=4:2:0)
    pub chroma_format_idc: u32,
    /// 亮度位深
    pub bit_depth_luma: u32,
    /// 色度位深
    pub bit_depth_chroma: u32,
    /// log2(MaxFrameNum)
    pub log2_max_frame_num: u32,
    /// 图像顺序计数类型 (0, 1, 2)
    pub poc_type: u32,
    /// log2(MaxPicOrderCntLsb), 仅 poc_type==0
    pub log2_max_poc_lsb: u32,
    /// poc_type==1 时的 delta_pic_order_always_zero_flag
    pub delta_pic_order_always_zero: bool,
    /// 最大参考帧数
    pub max_num_ref_frames: u32,
    /// gaps_in_frame_num_value_allowed_flag
    pub gaps_in_frame_num_allowed: bool,
    /// 宽度 (宏块)
    pub pic_width_in_mbs: u32,
    /// 高度 (map unit)
    pub pic_height_in_map_units: u32,
    /// 是否仅帧编码
    pub frame_mbs_only: bool,
    /// direct_8x8_inference_flag
    pub direct_8x8_inference: bool,
    /// 裁剪偏移 (左, 右, 上, 下), 以色度采样为单位
    pub crop: (u32, u32, u32, u32),
    /// 是否带 VUI (内容不解析)
    pub vui_present: bool,
}

/// (最大帧宏块数, level_idc)
const LEVEL_LIMITS: [(u32, u8); 10] = [
    (99, 10),
    (396, 20),
    (792, 21),
    (1620, 30),
    (3600, 31),
    (5120, 32),
    (8192, 40),
    (8704, 42),
    (22080, 50),
    (36864, 51),
];

impl Sps {
    /// 按图像尺寸生成 baseline SPS
    pub fn baseline(width: u32, height: u32, sps_id: u32) -> TaoResult<Self> {
        if width == 0 || height == 0 || width % 2 != 0 || height % 2 != 0 {
            return Err(TaoError::InvalidArgument(format!(
                "H.264: 图像尺寸必须为非零偶数, {}x{}",
                width, height
            )));
        }
        if sps_id > 31 {
            return Err(TaoError::InvalidArgument(format!(
                "H.264: sps_id 超出范围, sps_id={}",
                sps_id
            )));
        }
        let mbs_w = width.div_ceil(16);
        let mbs_h = height.div_ceil(16);
        let frame_mbs = mbs_w * mbs_h;
        let level_idc = LEVEL_LIMITS
            .iter()
            .find(|(max_fs, _)| frame_mbs <= *max_fs)
            .map(|&(_, level)| level)
            .unwrap_or(52);

        Ok(Self {
            profile_idc: PROFILE_BASELINE,
            constraint_set_flags: 0xC0,
            level_idc,
            sps_id,
            chroma_format_idc: 1,
            bit_depth_luma: 8,
            bit_depth_chroma: 8,
            log2_max_frame_num: 8,
            poc_type: 2,
            log2_max_poc_lsb: 0,
            delta_pic_order_always_zero: false,
            max_num_ref_frames: 1,
            gaps_in_frame_num_allowed: false,
            pic_width_in_mbs: mbs_w,
            pic_height_in_map_units: mbs_h,
            frame_mbs_only: true,
            direct_8x8_inference: true,
            // 4:2:0 帧编码的裁剪单位为 2 像素
            crop: (0, (mbs_w * 16 - width) / 2, 0, (mbs_h * 16 - height) / 2),
            vui_present: false,
        })
    }

    /// 裁剪后的宽度
    pub fn width(&self) -> u32 {
        self.pic_width_in_mbs * 16 - (self.crop.0 + self.crop.1) * self.crop_unit_x()
    }

    /// 裁剪后的高度
    pub fn height(&self) -> u32 {
        self.frame_height_in_mbs() * 16 - (self.crop.2 + self.crop.3) * self.crop_unit_y()
    }

    /// 帧高度 (宏块)
    pub fn frame_height_in_mbs(&self) -> u32 {
        self.pic_height_in_map_units * if self.frame_mbs_only { 1 } else { 2 }
    }

    /// MaxFrameNum
    pub fn max_frame_num(&self) -> u32 {
        1 << self.log2_max_frame_num
    }

    fn crop_unit_x(&self) -> u32 {
        match self.chroma_format_idc {
            1 | 2 => 2,
            _ => 1,
        }
    }

    fn crop_unit_y(&self) -> u32 {
        let sub_height = if self.chroma_format_idc == 1 { 2 } else { 1 };
        let field = if self.frame_mbs_only { 1 } else { 2 };
        if self.chroma_format_idc == 0 { field } else { sub_height * field }
    }

    /// 写出 RBSP (含 trailing bits)
    pub fn write_rbsp(&self, bw: &mut BitWriter) -> TaoResult<()> {
        if is_high_profile(self.profile_idc) {
            return Err(TaoError::Unsupported(format!(
                "H.264: 仅生成 baseline SPS, profile_idc={}",
                self.profile_idc
            )));
        }
        bw.write_bits(u32::from(self.profile_idc), 8)?;
        bw.write_bits(u32::from(self.constraint_set_flags), 8)?;
        bw.write_bits(u32::from(self.level_idc), 8)?;
        write_ue(bw, self.sps_id)?;
        write_ue(bw, self.log2_max_frame_num - 4)?;
        write_ue(bw, self.poc_type)?;
        match self.poc_type {
            0 => write_ue(bw, self.log2_max_poc_lsb - 4)?,
            1 => {
                return Err(TaoError::Unsupported(
                    "H.264: 不生成 pic_order_cnt_type=1 的 SPS".into(),
                ));
            }
            _ => {}
        }
        write_ue(bw, self.max_num_ref_frames)?;
        bw.write_flag(self.gaps_in_frame_num_allowed)?;
        write_ue(bw, self.pic_width_in_mbs - 1)?;
        write_ue(bw, self.pic_height_in_map_units - 1)?;
        bw.write_flag(self.frame_mbs_only)?;
        if !self.frame_mbs_only {
            bw.write_bit(0)?; // mb_adaptive_frame_field_flag
        }
        bw.write_flag(self.direct_8x8_inference)?;
        let (l, r, t, b) = self.crop;
        let cropping = l | r | t | b != 0;
        bw.write_flag(cropping)?;
        if cropping {
            write_ue(bw, l)?;
            write_ue(bw, r)?;
            write_ue(bw, t)?;
            write_ue(bw, b)?;
        }
        bw.write_bit(0)?; // vui_parameters_present_flag
        write_rbsp_trailing_bits(bw)
    }

    /// 生成 RBSP 字节
    pub fn to_rbsp(&self) -> TaoResult<Vec<u8>> {
        let mut bw = BitWriter::new();
        self.write_rbsp(&mut bw)?;
        Ok(bw.finish())
    }
}

/// 是否为带 chroma_format_idc 等扩展字段的 profile
fn is_high_profile(profile_idc: u8) -> bool {
    matches!(
        profile_idc,
        100 | 110 | 122 | 244 | 44 | 83 | 86 | 118 | 128 | 138 | 139 | 134 | 135
    )
}

/// 从 RBSP 数据解析 SPS
///
/// VUI 参数只记录存在与否, 不解析其内容.
pub fn parse_sps(rbsp: &[u8]) -> TaoResult<Sps> {
    if rbsp.len() < 3 {
        return Err(TaoError::InvalidData("H.264: SPS RBSP 太短".into()));
    }

    let mut br = BitReader::new(rbsp);
    let profile_idc = br.read_bits(8)? as u8;
    let constraint_set_flags = br.read_bits(8)? as u8;
    let level_idc = br.read_bits(8)? as u8;
    let sps_id = read_ue_max(&mut br, 31, "sps_id")?;

    let mut chroma_format_idc = 1;
    let mut bit_depth_luma = 8;
    let mut bit_depth_chroma = 8;
    if is_high_profile(profile_idc) {
        chroma_format_idc = read_ue_max(&mut br, 3, "chroma_format_idc")?;
        if chroma_format_idc == 3 {
            br.skip_bits(1)?; // separate_colour_plane_flag
        }
        bit_depth_luma = read_ue_max(&mut br, 6, "bit_depth_luma_minus8")? + 8;
        bit_depth_chroma = read_ue_max(&mut br, 6, "bit_depth_chroma_minus8")? + 8;
        br.skip_bits(1)?; // qpprime_y_zero_transform_bypass_flag
        if br.read_flag()? {
            return Err(TaoError::Unsupported(
                "H.264: 不支持 SPS 量化矩阵".into(),
            ));
        }
    }

    let log2_max_frame_num = read_ue_max(&mut br, 12, "log2_max_frame_num_minus4")? + 4;
    let poc_type = read_ue_max(&mut br, 2, "pic_order_cnt_type")?;
    let mut log2_max_poc_lsb = 0;
    let mut delta_pic_order_always_zero = false;
    match poc_type {
        0 => {
            log2_max_poc_lsb = read_ue_max(&mut br, 12, "log2_max_pic_order_cnt_lsb_minus4")? + 4;
        }
        1 => {
            delta_pic_order_always_zero = br.read_flag()?;
            read_se(&mut br)?; // offset_for_non_ref_pic
            read_se(&mut br)?; // offset_for_top_to_bottom_field
            let cycle = read_ue_max(&mut br, 255, "num_ref_frames_in_pic_order_cnt_cycle")?;
            for _ in 0..cycle {
                read_se(&mut br)?;
            }
        }
        _ => {}
    }

    let max_num_ref_frames = read_ue_max(&mut br, 16, "max_num_ref_frames")?;
    let gaps_in_frame_num_allowed = br.read_flag()?;
    let pic_width_in_mbs = read_ue_max(&mut br, 1023, "pic_width_in_mbs_minus1")? + 1;
    let pic_height_in_map_units = read_ue_max(&mut br, 1023, "pic_height_in_map_units_minus1")? + 1;
    let frame_mbs_only = br.read_flag()?;
    if !frame_mbs_only {
        br.skip_bits(1)?; // mb_adaptive_frame_field_flag
    }
    let direct_8x8_inference = br.read_flag()?;

    let mut crop = (0, 0, 0, 0);
    if br.read_flag()? {
        crop = (
            read_ue(&mut br)?,
            read_ue(&mut br)?,
            read_ue(&mut br)?,
            read_ue(&mut br)?,
        );
    }
    let vui_present = br.read_flag()?;

    let sps = Sps {
        profile_idc,
        constraint_set_flags,
        level_idc,
        sps_id,
        chroma_format_idc,
        bit_depth_luma,
        bit_depth_chroma,
        log2_max_frame_num,
        poc_type,
        log2_max_poc_lsb,
        delta_pic_order_always_zero,
        max_num_ref_frames,
        gaps_in_frame_num_allowed,
        pic_width_in_mbs,
        pic_height_in_map_units,
        frame_mbs_only,
        direct_8x8_inference,
        crop,
        vui_present,
    };

    let crop_x = u64::from(crop.0) + u64::from(crop.1);
    let crop_y = u64::from(crop.2) + u64::from(crop.3);
    if crop_x * u64::from(sps.crop_unit_x()) >= u64::from(pic_width_in_mbs * 16)
        || crop_y * u64::from(sps.crop_unit_y()) >= u64::from(sps.frame_height_in_mbs() * 16)
    {
        return Err(TaoError::InvalidData(format!(
            "H.264: 裁剪参数非法, crop={:?}",
            crop
        )));
    }

    Ok(sps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline_sps_往返() {
        let sps = Sps::baseline(176, 144, 0).unwrap();
        // QCIF 99 个宏块, 恰好在 level 1.0 上限内
        assert_eq!(sps.level_idc, 10);
        assert_eq!(Sps::baseline(352, 288, 0).unwrap().level_idc, 20);
        assert_eq!(Sps::baseline(1920, 1080, 0).unwrap().level_idc, 40);
        assert_eq!(sps.crop, (0, 0, 0, 0));
        let rbsp = sps.to_rbsp().unwrap();
        let parsed = parse_sps(&rbsp).unwrap();
        assert_eq!(parsed, sps);
        assert_eq!((parsed.width(), parsed.height()), (176, 144));
    }

    #[test]
    fn test_非16倍数尺寸使用裁剪() {
        let sps = Sps::baseline(100, 50, 3).unwrap();
        assert_eq!(sps.pic_width_in_mbs, 7);
        assert_eq!(sps.pic_height_in_map_units, 4);
        assert_eq!(sps.crop, (0, 6, 0, 7));
        let parsed = parse_sps(&sps.to_rbsp().unwrap()).unwrap();
        assert_eq!((parsed.width(), parsed.height()), (100, 50));
        assert_eq!(parsed.sps_id, 3);
    }

    #[test]
    fn test_奇数尺寸拒绝() {
        assert!(Sps::baseline(17, 16, 0).is_err());
        assert!(Sps::baseline(16, 16, 32).is_err());
    }

    #[test]
    fn test_截断的sps报告比特不足() {
        let rbsp = Sps::baseline(64, 64, 0).unwrap().to_rbsp().unwrap();
        let err = parse_sps(&rbsp[..4]).unwrap_err();
        assert!(err.is_bit_exhausted(), "{err}");
    }
}
