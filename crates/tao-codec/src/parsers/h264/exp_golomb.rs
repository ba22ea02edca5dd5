//! Exp-Golomb 变长整数编解码.
//!
//! 参数集、slice 头和宏块层语法共用的 ue(v)/se(v)/te(v) 编码.
//! 全部为无状态函数, 内部以 u64 计算, 完整覆盖 u32 与 i32 的取值范围.
//!
//! ```text
//! codeNum = 2^k - 1 + info:   [k 个 0] 1 [k 位 info]
//! ```

use tao_core::{BitReader, BitWriter, TaoError, TaoResult};

/// ue(v) 码字中前导零的最大个数 (codeNum ≤ 2^32 - 1 + 2^32)
const MAX_LEADING_ZEROS: u32 = 32;

/// codeNum 的码长
fn code_len(code_num: u64) -> u32 {
    let v = code_num + 1;
    let bits = 64 - v.leading_zeros();
    2 * bits - 1
}

fn se_to_code_num(value: i32) -> u64 {
    let v = i64::from(value);
    if v > 0 { (2 * v - 1) as u64 } else { (-2 * v) as u64 }
}

fn code_num_to_se(code_num: u64) -> TaoResult<i32> {
    let v = if code_num & 1 == 1 {
        ((code_num + 1) / 2) as i64
    } else {
        -((code_num / 2) as i64)
    };
    i32::try_from(v).map_err(|_| TaoError::InvalidData(format!("se(v) 超出 i32 范围: {v}")))
}

fn write_code_num(bw: &mut BitWriter, code_num: u64) -> TaoResult<()> {
    let v = code_num + 1;
    let bits = 64 - v.leading_zeros();
    let len = 2 * bits - 1;
    // 整个码字一次性检查上限, 写入失败时写入器状态不变
    if let Some(remaining) = bw.remaining_bits() {
        if len as usize > remaining {
            return Err(TaoError::BitExhausted {
                needed: len as usize,
                available: remaining,
            });
        }
    }
    bw.write_bits_u64(0, bits - 1)?;
    bw.write_bits_u64(v, bits)
}

fn read_code_num(br: &mut BitReader) -> TaoResult<u64> {
    let mut leading_zeros = 0u32;
    while br.read_bit()? == 0 {
        leading_zeros += 1;
        if leading_zeros > MAX_LEADING_ZEROS {
            return Err(TaoError::VlcSyncLoss(format!(
                "Exp-Golomb 前导零过多: {leading_zeros}"
            )));
        }
    }
    if leading_zeros == 0 {
        return Ok(0);
    }
    let info = br.read_bits_u64(leading_zeros)?;
    Ok((1u64 << leading_zeros) - 1 + info)
}

/// ue(v) 码长
pub fn ue_len(value: u32) -> u32 {
    code_len(u64::from(value))
}

/// se(v) 码长
pub fn se_len(value: i32) -> u32 {
    code_len(se_to_code_num(value))
}

/// te(v) 码长
pub fn te_len(value: u32, range: u32) -> u32 {
    if range == 1 { 1 } else { ue_len(value) }
}

/// 写入 ue(v)
pub fn write_ue(bw: &mut BitWriter, value: u32) -> TaoResult<()> {
    write_code_num(bw, u64::from(value))
}

/// 写入 se(v)
pub fn write_se(bw: &mut BitWriter, value: i32) -> TaoResult<()> {
    write_code_num(bw, se_to_code_num(value))
}

/// 写入 te(v)
///
/// `range` 为语法元素的最大取值. 取值范围为 1 时写入单个取反位.
pub fn write_te(bw: &mut BitWriter, value: u32, range: u32) -> TaoResult<()> {
    if value > range {
        return Err(TaoError::InvalidArgument(format!(
            "te(v) 值 {value} 超出范围 {range}"
        )));
    }
    if range == 1 {
        bw.write_bit(u32::from(value == 0))
    } else {
        write_ue(bw, value)
    }
}

/// 读取 ue(v)
pub fn read_ue(br: &mut BitReader) -> TaoResult<u32> {
    let code_num = read_code_num(br)?;
    u32::try_from(code_num)
        .map_err(|_| TaoError::InvalidData(format!("ue(v) 超出 u32 范围: {code_num}")))
}

/// 读取 se(v)
pub fn read_se(br: &mut BitReader) -> TaoResult<i32> {
    code_num_to_se(read_code_num(br)?)
}

/// 读取 te(v)
pub fn read_te(br: &mut BitReader, range: u32) -> TaoResult<u32> {
    if range == 1 {
        Ok(u32::from(br.read_bit()? == 0))
    } else {
        let v = read_ue(br)?;
        if v > range {
            return Err(TaoError::InvalidData(format!(
                "te(v) 值 {v} 超出范围 {range}"
            )));
        }
        Ok(v)
    }
}

/// 读取 ue(v) 并检查上限
pub fn read_ue_max(br: &mut BitReader, max: u32, name: &str) -> TaoResult<u32> {
    let v = read_ue(br)?;
    if v > max {
        return Err(TaoError::InvalidData(format!(
            "H.264: {name} 超出范围, value={v}, max={max}"
        )));
    }
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip_ue(v: u32) -> u32 {
        let mut bw = BitWriter::new();
        write_ue(&mut bw, v).unwrap();
        assert_eq!(bw.bits_written(), ue_len(v) as usize, "ue 码长不一致: {v}");
        let data = bw.finish();
        let mut br = BitReader::new(&data);
        read_ue(&mut br).unwrap()
    }

    fn roundtrip_se(v: i32) -> i32 {
        let mut bw = BitWriter::new();
        write_se(&mut bw, v).unwrap();
        assert_eq!(bw.bits_written(), se_len(v) as usize, "se 码长不一致: {v}");
        let data = bw.finish();
        let mut br = BitReader::new(&data);
        read_se(&mut br).unwrap()
    }

    #[test]
    fn test_ue_已知码字() {
        let mut bw = BitWriter::new();
        for v in [0u32, 1, 2, 3, 7] {
            write_ue(&mut bw, v).unwrap();
        }
        // 1 010 011 00100 0001000
        assert_eq!(bw.bits_written(), 1 + 3 + 3 + 5 + 7);
        assert_eq!(bw.finish(), vec![0b1010_0110, 0b0100_0001, 0b0000_0000]);
    }

    #[test]
    fn test_ue_边界值往返() {
        for v in [0u32, 1, 2, 254, 255, 256, 65535, (1 << 31) - 1, 1 << 31, u32::MAX - 1, u32::MAX] {
            assert_eq!(roundtrip_ue(v), v);
        }
    }

    #[test]
    fn test_se_边界值往返() {
        let values = [
            0i32,
            1,
            -1,
            2,
            -2,
            127,
            -128,
            (1 << 30),
            -(1 << 30),
            i32::MAX,
            -i32::MAX,
            i32::MIN,
        ];
        for v in values {
            assert_eq!(roundtrip_se(v), v);
        }
    }

    #[test]
    fn test_te_单比特与多比特() {
        let mut bw = BitWriter::new();
        write_te(&mut bw, 0, 1).unwrap();
        write_te(&mut bw, 1, 1).unwrap();
        write_te(&mut bw, 2, 3).unwrap();
        assert_eq!(bw.bits_written(), 1 + 1 + 3);
        let data = bw.finish();
        let mut br = BitReader::new(&data);
        assert_eq!(read_te(&mut br, 1).unwrap(), 0);
        assert_eq!(read_te(&mut br, 1).unwrap(), 1);
        assert_eq!(read_te(&mut br, 3).unwrap(), 2);
    }

    #[test]
    fn test_超过上限时整个码字不写入() {
        let mut bw = BitWriter::new().with_limit(4);
        assert!(write_ue(&mut bw, 7).unwrap_err().is_bit_exhausted());
        assert_eq!(bw.bits_written(), 0);
        write_ue(&mut bw, 1).unwrap();
        assert_eq!(bw.bits_written(), 3);
    }

    #[test]
    fn test_前导零过多报告失步() {
        let data = [0u8; 6];
        let mut br = BitReader::new(&data);
        assert!(matches!(read_ue(&mut br), Err(TaoError::VlcSyncLoss(_))));
    }

    #[test]
    fn test_码流截断报告比特不足() {
        // 0001 后缺少 3 位 info
        let data = [0b0001_0000];
        let mut br = BitReader::with_bit_len(&data, 5);
        assert!(read_ue(&mut br).unwrap_err().is_bit_exhausted());
    }
}
