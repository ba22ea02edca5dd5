//! H.264 NAL 单元的封装与拆分 (Annex B 字节流).
//!
//! ```text
//! 00 00 00 01 | forbidden(1) ref_idc(2) type(5) | RBSP (含防竞争字节)
//! ```
//!
//! RBSP 中出现 `00 00` 后跟不大于 `03` 的字节时插入 `03`, 使负载内部不会
//! 出现起始码. 解析时执行镜像操作.

use tao_core::{BitWriter, TaoError, TaoResult};

/// 4 字节起始码
pub const START_CODE: [u8; 4] = [0x00, 0x00, 0x00, 0x01];

/// NAL 单元类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NalUnitType {
    /// 非 IDR 图像切片
    Slice,
    /// 数据分区 A/B/C (baseline 不使用)
    SlicePartition(u8),
    /// IDR 图像切片
    SliceIdr,
    /// 增补增强信息 (SEI)
    Sei,
    /// 序列参数集 (SPS)
    Sps,
    /// 图像参数集 (PPS)
    Pps,
    /// 访问单元分隔符 (AUD)
    Aud,
    /// 其他类型
    Other(u8),
}

impl NalUnitType {
    /// 从 NAL 类型编号创建
    pub fn from_type_id(type_id: u8) -> Self {
        match type_id {
            1 => Self::Slice,
            2..=4 => Self::SlicePartition(type_id),
            5 => Self::SliceIdr,
            6 => Self::Sei,
            7 => Self::Sps,
            8 => Self::Pps,
            9 => Self::Aud,
            _ => Self::Other(type_id),
        }
    }

    /// 获取类型编号
    pub fn type_id(&self) -> u8 {
        match self {
            Self::Slice => 1,
            Self::SlicePartition(id) | Self::Other(id) => *id,
            Self::SliceIdr => 5,
            Self::Sei => 6,
            Self::Sps => 7,
            Self::Pps => 8,
            Self::Aud => 9,
        }
    }

    /// 是否为图像切片
    pub fn is_vcl(&self) -> bool {
        matches!(
            self,
            Self::Slice | Self::SlicePartition(_) | Self::SliceIdr
        )
    }

    /// 是否为 IDR
    pub fn is_idr(&self) -> bool {
        matches!(self, Self::SliceIdr)
    }
}

impl std::fmt::Display for NalUnitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Slice => write!(f, "Slice"),
            Self::SlicePartition(id) => write!(f, "SlicePartition({id})"),
            Self::SliceIdr => write!(f, "IDR"),
            Self::Sei => write!(f, "SEI"),
            Self::Sps => write!(f, "SPS"),
            Self::Pps => write!(f, "PPS"),
            Self::Aud => write!(f, "AUD"),
            Self::Other(id) => write!(f, "Other({id})"),
        }
    }
}

/// 解析后的 NAL 单元
#[derive(Debug, Clone)]
pub struct NalUnit {
    /// NAL 单元类型
    pub nal_type: NalUnitType,
    /// nal_ref_idc (0-3)
    pub ref_idc: u8,
    /// NAL 单元原始数据 (不含起始码, 含头部字节)
    pub data: Vec<u8>,
}

impl NalUnit {
    /// 从 NAL 数据 (含头部字节) 解析
    pub fn parse(data: &[u8]) -> TaoResult<Self> {
        let Some(&header) = data.first() else {
            return Err(TaoError::InvalidData("H.264: NAL 单元数据为空".into()));
        };
        if header & 0x80 != 0 {
            return Err(TaoError::InvalidData(
                "H.264: forbidden_zero_bit 非法".into(),
            ));
        }

        Ok(Self {
            nal_type: NalUnitType::from_type_id(header & 0x1F),
            ref_idc: (header >> 5) & 0x03,
            data: data.to_vec(),
        })
    }

    /// 获取 RBSP (移除头部字节与防竞争字节)
    pub fn rbsp(&self) -> Vec<u8> {
        remove_emulation_prevention(&self.data[1..])
    }

    /// 获取 RBSP 以及去掉 rbsp_trailing_bits 后的有效位长度
    pub fn rbsp_with_payload_bits(&self) -> TaoResult<(Vec<u8>, usize)> {
        let rbsp = self.rbsp();
        let bits = rbsp_payload_bits(&rbsp).ok_or_else(|| {
            TaoError::InvalidData(format!("H.264: {} 缺少 rbsp_stop_one_bit", self.nal_type))
        })?;
        Ok((rbsp, bits))
    }
}

/// 生成 NAL 头部字节
pub fn nal_header(ref_idc: u8, nal_type: NalUnitType) -> u8 {
    ((ref_idc & 0x03) << 5) | (nal_type.type_id() & 0x1F)
}

/// 写出一个完整的 Annex B NAL 单元 (起始码 + 头部 + 负载)
///
/// `emulation_prevention` 关闭时负载原样写出.
pub fn write_nal_unit(
    out: &mut Vec<u8>,
    ref_idc: u8,
    nal_type: NalUnitType,
    rbsp: &[u8],
    emulation_prevention: bool,
) {
    out.extend_from_slice(&START_CODE);
    out.push(nal_header(ref_idc, nal_type));
    if emulation_prevention {
        out.extend_from_slice(&insert_emulation_prevention(rbsp));
    } else {
        out.extend_from_slice(rbsp);
    }
}

/// 从 Annex B 字节流中分割出所有 NAL 单元
///
/// 支持 3 字节和 4 字节起始码. 无法解析的 NAL 单元被丢弃.
pub fn split_annex_b(data: &[u8]) -> Vec<NalUnit> {
    let offsets = find_start_codes(data);
    let mut nalus = Vec::new();

    for (i, &start) in offsets.iter().enumerate() {
        let end = offsets.get(i + 1).copied().unwrap_or(data.len());
        let nal_start = skip_start_code(data, start);
        if nal_start >= end {
            continue;
        }

        // 去除尾部的 0 字节 (trailing_zero_8bits)
        let mut nal_end = end;
        while nal_end > nal_start && data[nal_end - 1] == 0x00 {
            nal_end -= 1;
        }

        if nal_end > nal_start {
            if let Ok(nalu) = NalUnit::parse(&data[nal_start..nal_end]) {
                nalus.push(nalu);
            }
        }
    }

    nalus
}

/// 插入防竞争字节
///
/// 连续两个 `00` 后若紧跟 `00..=03` 则先插入 `03`; 负载以 `00 00` 结尾时追加 `03`.
pub fn insert_emulation_prevention(rbsp: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(rbsp.len() + rbsp.len() / 64 + 1);
    let mut zeros = 0usize;

    for &b in rbsp {
        if zeros >= 2 && b <= 0x03 {
            out.push(0x03);
            zeros = 0;
        }
        out.push(b);
        if b == 0x00 {
            zeros += 1;
        } else {
            zeros = 0;
        }
    }
    if zeros >= 2 {
        out.push(0x03);
    }

    out
}

/// 移除防竞争字节 (`00 00 03` → `00 00`)
pub fn remove_emulation_prevention(data: &[u8]) -> Vec<u8> {
    let mut rbsp = Vec::with_capacity(data.len());
    let mut i = 0;

    while i < data.len() {
        if i + 2 < data.len() && data[i] == 0x00 && data[i + 1] == 0x00 && data[i + 2] == 0x03 {
            rbsp.push(0x00);
            rbsp.push(0x00);
            i += 3;
        } else {
            rbsp.push(data[i]);
            i += 1;
        }
    }

    rbsp
}

/// 插入防竞争字节后增加的字节数
pub fn emulation_prevention_overhead(rbsp: &[u8]) -> usize {
    insert_emulation_prevention(rbsp).len() - rbsp.len()
}

/// 写入 rbsp_trailing_bits (停止位 1 + 对齐用的 0)
pub fn write_rbsp_trailing_bits(bw: &mut BitWriter) -> TaoResult<()> {
    bw.write_bit(1)?;
    bw.align_to_byte()
}

/// 去掉 rbsp_trailing_bits 后的有效位数
///
/// 找到最后一个非零字节中最低的 1 (rbsp_stop_one_bit), 其前面的位为负载.
pub fn rbsp_payload_bits(rbsp: &[u8]) -> Option<usize> {
    let last = rbsp.iter().rposition(|&b| b != 0)?;
    let trailing = rbsp[last].trailing_zeros() as usize;
    Some(last * 8 + 7 - trailing)
}

// ============================================================
// 内部工具函数
// ============================================================

/// 查找所有起始码的位置
fn find_start_codes(data: &[u8]) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut i = 0;

    while i + 2 < data.len() {
        if data[i] == 0x00 && data[i + 1] == 0x00 {
            if data[i + 2] == 0x01 {
                positions.push(i);
                i += 3;
                continue;
            } else if i + 3 < data.len() && data[i + 2] == 0x00 && data[i + 3] == 0x01 {
                positions.push(i);
                i += 4;
                continue;
            }
        }
        i += 1;
    }

    positions
}

/// 跳过起始码, 返回 NAL 数据的起始位置
fn skip_start_code(data: &[u8], pos: usize) -> usize {
    if data[pos..].starts_with(&START_CODE) {
        pos + 4
    } else if data[pos..].starts_with(&START_CODE[1..]) {
        pos + 3
    } else {
        pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nal_type_type_id() {
        for id in 0..=31 {
            assert_eq!(NalUnitType::from_type_id(id).type_id(), id);
        }
        assert!(NalUnitType::SliceIdr.is_idr());
        assert!(NalUnitType::Slice.is_vcl());
        assert!(!NalUnitType::Pps.is_vcl());
    }

    #[test]
    fn test_nal_unit_parse() {
        // 0b0_11_00111 = 0x67
        let nalu = NalUnit::parse(&[0x67, 0x42, 0x00, 0x1E]).unwrap();
        assert_eq!(nalu.nal_type, NalUnitType::Sps);
        assert_eq!(nalu.ref_idc, 3);
        assert!(NalUnit::parse(&[]).is_err());
        assert!(NalUnit::parse(&[0xE7]).is_err());
    }

    #[test]
    fn test_写出后可以拆分() {
        let mut out = Vec::new();
        write_nal_unit(&mut out, 3, NalUnitType::Sps, &[0x42, 0x00, 0x00, 0x01], true);
        write_nal_unit(&mut out, 3, NalUnitType::Pps, &[0xCE], true);
        write_nal_unit(&mut out, 3, NalUnitType::SliceIdr, &[0x88, 0x80], true);

        let nalus = split_annex_b(&out);
        assert_eq!(nalus.len(), 3);
        assert_eq!(nalus[0].nal_type, NalUnitType::Sps);
        assert_eq!(nalus[0].rbsp(), vec![0x42, 0x00, 0x00, 0x01]);
        assert_eq!(nalus[1].nal_type, NalUnitType::Pps);
        assert_eq!(nalus[2].nal_type, NalUnitType::SliceIdr);
        assert_eq!(nalus[2].ref_idc, 3);
    }

    #[test]
    fn test_插入防竞争字节() {
        assert_eq!(
            insert_emulation_prevention(&[0x00, 0x00, 0x01]),
            vec![0x00, 0x00, 0x03, 0x01]
        );
        assert_eq!(
            insert_emulation_prevention(&[0x00, 0x00, 0x04]),
            vec![0x00, 0x00, 0x04]
        );
        assert_eq!(
            insert_emulation_prevention(&[0x00, 0x00, 0x00, 0x00]),
            vec![0x00, 0x00, 0x03, 0x00, 0x00, 0x03]
        );
    }

    #[test]
    fn test_防竞争字节往返() {
        let mut seed = 0x1234_5678u32;
        for len in 0..200usize {
            let bytes: Vec<u8> = (0..len)
                .map(|_| {
                    seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12345);
                    // 偏向 0..=3, 尽量制造需要转义的序列
                    let v = (seed >> 16) as u8;
                    if v < 160 { v & 0x03 } else { v }
                })
                .collect();
            let escaped = insert_emulation_prevention(&bytes);
            for w in escaped.windows(3) {
                assert!(!(w[0] == 0 && w[1] == 0 && w[2] <= 2), "转义后仍有起始码前缀");
            }
            assert_eq!(remove_emulation_prevention(&escaped), bytes, "len={len}");
        }
    }

    #[test]
    fn test_rbsp_有效位长度() {
        // 1010_1000: 停止位在第 5 位, 负载 4 位
        assert_eq!(rbsp_payload_bits(&[0b1010_1000]), Some(4));
        assert_eq!(rbsp_payload_bits(&[0xFF, 0x80]), Some(8));
        assert_eq!(rbsp_payload_bits(&[0x00, 0x00]), None);
    }
}
