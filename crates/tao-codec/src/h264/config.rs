//! H.264 编解码参数表.
//!
//! 参数以字符串键值对读写, 与 `CodecParameters::options` 以及命令行
//! `-o key=value` 共用同一套键名.

use std::fmt;

use tao_core::{PixelFormat, TaoError, TaoResult};

/// 码率控制方式 ("mode of operation")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModeOfOperation {
    /// 所有宏块使用 `quality` 指定的 QP, 超出预算时退回自适应搜索
    FixedQp = 0,
    /// 按预算自适应调整每个宏块的 QP, 使最差宏块失真最小
    #[default]
    MinMaxAdaptive = 1,
}

/// 图像编码类型 ("picture coding type")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PictureCodingType {
    /// IDR 帧内图像
    #[default]
    Intra = 0,
    /// 单参考帧 P 图像
    Inter = 1,
}

impl fmt::Display for PictureCodingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Intra => write!(f, "I"),
            Self::Inter => write!(f, "P"),
        }
    }
}

/// 全部参数键名
pub const PARAMETER_NAMES: [&str; 20] = [
    "width",
    "height",
    "incolour",
    "outcolour",
    "mode of operation",
    "quality",
    "picture coding type",
    "last pic coding type",
    "autoipicture",
    "ipicturemultiplier",
    "ipicturefraction",
    "start code emulation prevention",
    "prepend param sets to i-pictures",
    "generate param set on open",
    "seq param set",
    "pic param set",
    "intra period",
    "loop filter",
    "motion search range",
    "bit budget",
];

/// H.264 编解码参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct H264Config {
    pub width: u32,
    pub height: u32,
    /// 编码器输入像素格式
    pub in_colour: PixelFormat,
    /// 解码器输出像素格式
    pub out_colour: PixelFormat,
    pub mode: ModeOfOperation,
    /// 基准 QP, 同时是自适应搜索允许的最小 QP
    pub quality: u8,
    /// 下一幅图像请求的编码类型
    pub picture_coding_type: PictureCodingType,
    /// 上一幅图像实际使用的编码类型 (只读)
    pub last_pic_coding_type: PictureCodingType,
    /// 自动安排 I 图像: 编码一幅 I 图像后自动回到 P, 并按 `intra_period` 周期插入 I
    pub auto_i_picture: bool,
    /// I 图像预算倍数
    pub i_picture_multiplier: u32,
    /// I 图像预算附加百分比
    pub i_picture_fraction: u32,
    pub emulation_prevention: bool,
    pub prepend_param_sets: bool,
    /// 打开后第一个数据包携带参数集
    pub gen_param_set_on_open: bool,
    pub seq_param_set: u32,
    pub pic_param_set: u32,
    /// 自动 I 图像周期, 0 表示只有第一幅和显式请求的图像为 I
    pub intra_period: u32,
    pub loop_filter: bool,
    pub motion_search_range: u32,
    /// 每幅图像的比特预算, 0 表示由码率换算
    pub bit_budget: usize,
}

impl Default for H264Config {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            in_colour: PixelFormat::Yuv420p,
            out_colour: PixelFormat::Yuv420p,
            mode: ModeOfOperation::MinMaxAdaptive,
            quality: 16,
            picture_coding_type: PictureCodingType::Intra,
            last_pic_coding_type: PictureCodingType::Intra,
            auto_i_picture: true,
            i_picture_multiplier: 2,
            i_picture_fraction: 0,
            emulation_prevention: true,
            prepend_param_sets: true,
            gen_param_set_on_open: true,
            seq_param_set: 0,
            pic_param_set: 0,
            intra_period: 0,
            loop_filter: true,
            motion_search_range: 16,
            bit_budget: 0,
        }
    }
}

fn parse_num<T: std::str::FromStr>(key: &str, value: &str) -> TaoResult<T> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| TaoError::InvalidArgument(format!("参数 \"{key}\" 的值非法: {value}")))
}

fn parse_flag(key: &str, value: &str) -> TaoResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "on" | "true" | "yes" => Ok(true),
        "0" | "off" | "false" | "no" => Ok(false),
        _ => Err(TaoError::InvalidArgument(format!(
            "参数 \"{key}\" 需要开关值, 实际为: {value}"
        ))),
    }
}

fn parse_range(key: &str, value: &str, max: u32) -> TaoResult<u32> {
    let v: u32 = parse_num(key, value)?;
    if v > max {
        return Err(TaoError::InvalidArgument(format!(
            "参数 \"{key}\" 超出范围: {v} > {max}"
        )));
    }
    Ok(v)
}

impl H264Config {
    /// 设置一个参数
    pub fn set_parameter(&mut self, key: &str, value: &str) -> TaoResult<()> {
        match key.trim().to_ascii_lowercase().as_str() {
            "width" => self.width = parse_num(key, value)?,
            "height" => self.height = parse_num(key, value)?,
            "incolour" => self.in_colour = value.parse()?,
            "outcolour" => self.out_colour = value.parse()?,
            "mode of operation" => {
                self.mode = match parse_range(key, value, 1)? {
                    0 => ModeOfOperation::FixedQp,
                    _ => ModeOfOperation::MinMaxAdaptive,
                }
            }
            "quality" => self.quality = parse_range(key, value, 51)? as u8,
            "picture coding type" => {
                self.picture_coding_type = match value.trim().to_ascii_uppercase().as_str() {
                    "I" => PictureCodingType::Intra,
                    "P" => PictureCodingType::Inter,
                    _ => match parse_range(key, value, 1)? {
                        0 => PictureCodingType::Intra,
                        _ => PictureCodingType::Inter,
                    },
                }
            }
            "last pic coding type" => {
                return Err(TaoError::InvalidArgument(
                    "参数 \"last pic coding type\" 为只读".into(),
                ));
            }
            "autoipicture" => self.auto_i_picture = parse_flag(key, value)?,
            "ipicturemultiplier" => {
                let v: u32 = parse_num(key, value)?;
                if v == 0 {
                    return Err(TaoError::InvalidArgument(
                        "参数 \"ipicturemultiplier\" 不能为 0".into(),
                    ));
                }
                self.i_picture_multiplier = v;
            }
            "ipicturefraction" => self.i_picture_fraction = parse_num(key, value)?,
            "start code emulation prevention" => {
                self.emulation_prevention = parse_flag(key, value)?
            }
            "prepend param sets to i-pictures" => {
                self.prepend_param_sets = parse_flag(key, value)?
            }
            "generate param set on open" => self.gen_param_set_on_open = parse_flag(key, value)?,
            "seq param set" => self.seq_param_set = parse_range(key, value, 31)?,
            "pic param set" => self.pic_param_set = parse_range(key, value, 255)?,
            "intra period" => self.intra_period = parse_num(key, value)?,
            "loop filter" => self.loop_filter = parse_flag(key, value)?,
            "motion search range" => self.motion_search_range = parse_range(key, value, 64)?,
            "bit budget" => self.bit_budget = parse_num(key, value)?,
            _ => {
                return Err(TaoError::InvalidArgument(format!("未知参数: \"{key}\"")));
            }
        }
        Ok(())
    }

    /// 读取一个参数的字符串形式
    pub fn get_parameter(&self, key: &str) -> TaoResult<String> {
        let flag = |b: bool| if b { "1" } else { "0" }.to_string();
        Ok(match key.trim().to_ascii_lowercase().as_str() {
            "width" => self.width.to_string(),
            "height" => self.height.to_string(),
            "incolour" => self.in_colour.to_string(),
            "outcolour" => self.out_colour.to_string(),
            "mode of operation" => (self.mode as u8).to_string(),
            "quality" => self.quality.to_string(),
            "picture coding type" => (self.picture_coding_type as u8).to_string(),
            "last pic coding type" => (self.last_pic_coding_type as u8).to_string(),
            "autoipicture" => flag(self.auto_i_picture),
            "ipicturemultiplier" => self.i_picture_multiplier.to_string(),
            "ipicturefraction" => self.i_picture_fraction.to_string(),
            "start code emulation prevention" => flag(self.emulation_prevention),
            "prepend param sets to i-pictures" => flag(self.prepend_param_sets),
            "generate param set on open" => flag(self.gen_param_set_on_open),
            "seq param set" => self.seq_param_set.to_string(),
            "pic param set" => self.pic_param_set.to_string(),
            "intra period" => self.intra_period.to_string(),
            "loop filter" => flag(self.loop_filter),
            "motion search range" => self.motion_search_range.to_string(),
            "bit budget" => self.bit_budget.to_string(),
            _ => {
                return Err(TaoError::InvalidArgument(format!("未知参数: \"{key}\"")));
            }
        })
    }

    /// 依次应用键值对
    pub fn apply_options<'a, I>(&mut self, options: I) -> TaoResult<()>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (key, value) in options {
            self.set_parameter(key, value)?;
        }
        Ok(())
    }

    /// I 图像的预算: `budget * multiplier + budget * fraction / 100`
    pub fn i_picture_budget(&self, budget: usize) -> usize {
        let multiplier = self.i_picture_multiplier as usize;
        let fraction = self.i_picture_fraction as usize;
        budget
            .saturating_mul(multiplier)
            .saturating_add(budget.saturating_mul(fraction) / 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_默认值() {
        let cfg = H264Config::default();
        assert_eq!(cfg.i_picture_multiplier, 2);
        assert_eq!(cfg.i_picture_fraction, 0);
        assert!(cfg.auto_i_picture);
        assert_eq!(cfg.mode, ModeOfOperation::MinMaxAdaptive);
        assert_eq!(cfg.i_picture_budget(1000), 2000);
    }

    #[test]
    fn test_设置与读取往返() {
        let mut cfg = H264Config::default();
        cfg.apply_options([
            ("width", "176"),
            ("height", "144"),
            ("quality", "30"),
            ("incolour", "rgb24"),
            ("mode of operation", "0"),
            ("start code emulation prevention", "off"),
            ("ipicturefraction", "50"),
            ("picture coding type", "P"),
        ])
        .unwrap();
        assert_eq!(cfg.width, 176);
        assert_eq!(cfg.in_colour, PixelFormat::Rgb24);
        assert_eq!(cfg.mode, ModeOfOperation::FixedQp);
        assert!(!cfg.emulation_prevention);
        assert_eq!(cfg.picture_coding_type, PictureCodingType::Inter);
        assert_eq!(cfg.i_picture_budget(1000), 2500);

        for key in PARAMETER_NAMES {
            let v = cfg.get_parameter(key).unwrap();
            if key != "last pic coding type" {
                let mut copy = cfg.clone();
                copy.set_parameter(key, &v).unwrap();
                assert_eq!(copy, cfg, "key={key}");
            }
        }
    }

    #[test]
    fn test_非法参数() {
        let mut cfg = H264Config::default();
        assert!(cfg.set_parameter("quality", "52").is_err());
        assert!(cfg.set_parameter("quality", "abc").is_err());
        assert!(cfg.set_parameter("last pic coding type", "0").is_err());
        assert!(cfg.set_parameter("ipicturemultiplier", "0").is_err());
        assert!(cfg.set_parameter("no such key", "1").is_err());
        assert!(cfg.get_parameter("no such key").is_err());
    }
}
