//! 比特流读取器.
//!
//! 按大端位序 (MSB first) 从字节缓冲区中读取数据.
//!
//! 读取器可以限定有效位长度 (例如 RBSP 去掉尾部填充后的长度),
//! 越界读取返回 `TaoError::BitExhausted`, 不会返回填充的零值.

use crate::{TaoError, TaoResult};

/// 比特流读取器
///
/// # 示例
/// ```
/// use tao_core::bitreader::BitReader;
///
/// let data = [0b10110001, 0b01010101];
/// let mut br = BitReader::new(&data);
/// assert_eq!(br.read_bits(4).unwrap(), 0b1011);
/// assert_eq!(br.read_bits(4).unwrap(), 0b0001);
/// assert_eq!(br.read_bits(8).unwrap(), 0b01010101);
/// ```
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    /// 源数据
    data: &'a [u8],
    /// 已读取位数
    pos: usize,
    /// 有效位长度
    bit_len: usize,
}

impl<'a> BitReader<'a> {
    /// 创建新的比特流读取器
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            bit_len: data.len() * 8,
        }
    }

    /// 创建限定位长度的读取器
    ///
    /// `bit_len` 超过数据长度时按数据长度截断.
    pub fn with_bit_len(data: &'a [u8], bit_len: usize) -> Self {
        Self {
            data,
            pos: 0,
            bit_len: bit_len.min(data.len() * 8),
        }
    }

    /// 获取已读取的总位数
    pub fn bits_read(&self) -> usize {
        self.pos
    }

    /// 获取剩余可读位数
    pub fn bits_left(&self) -> usize {
        self.bit_len - self.pos
    }

    /// 有效位长度
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// 是否已到达末尾
    pub fn is_eof(&self) -> bool {
        self.bits_left() == 0
    }

    /// 当前是否在字节边界
    pub fn is_byte_aligned(&self) -> bool {
        self.pos % 8 == 0
    }

    fn check(&self, n: usize) -> TaoResult<()> {
        let available = self.bits_left();
        if n > available {
            return Err(TaoError::BitExhausted {
                needed: n,
                available,
            });
        }
        Ok(())
    }

    /// 读取 1 个位
    pub fn read_bit(&mut self) -> TaoResult<u32> {
        self.check(1)?;
        let byte = self.data[self.pos >> 3];
        let bit = (byte >> (7 - (self.pos & 7))) & 1;
        self.pos += 1;
        Ok(u32::from(bit))
    }

    /// 读取布尔标志
    pub fn read_flag(&mut self) -> TaoResult<bool> {
        Ok(self.read_bit()? == 1)
    }

    /// 读取 N 个位 (最多 32 位)
    pub fn read_bits(&mut self, n: u32) -> TaoResult<u32> {
        if n == 0 {
            return Ok(0);
        }
        if n > 32 {
            return Err(TaoError::InvalidArgument(format!(
                "read_bits: n={} 超过 32 位",
                n,
            )));
        }
        self.check(n as usize)?;

        let mut result: u32 = 0;
        let mut remaining = n;
        while remaining > 0 {
            let bit_pos = (self.pos & 7) as u32;
            let available = 8 - bit_pos;
            let to_read = remaining.min(available);

            // 从当前字节中提取位
            let shift = available - to_read;
            let mask = ((1u32 << to_read) - 1) as u8;
            let bits = (self.data[self.pos >> 3] >> shift) & mask;

            result = (result << to_read) | u32::from(bits);
            self.pos += to_read as usize;
            remaining -= to_read;
        }

        Ok(result)
    }

    /// 读取 N 个位 (最多 64 位)
    pub fn read_bits_u64(&mut self, n: u32) -> TaoResult<u64> {
        if n <= 32 {
            return self.read_bits(n).map(u64::from);
        }
        if n > 64 {
            return Err(TaoError::InvalidArgument(format!(
                "read_bits_u64: n={} 超过 64 位",
                n,
            )));
        }
        self.check(n as usize)?;
        let high = u64::from(self.read_bits(n - 32)?);
        let low = u64::from(self.read_bits(32)?);
        Ok((high << 32) | low)
    }

    /// 窥视 N 个位 (不移动位置)
    pub fn peek_bits(&mut self, n: u32) -> TaoResult<u32> {
        let saved = self.pos;
        let result = self.read_bits(n);
        self.pos = saved;
        result
    }

    /// 跳过 N 个位
    pub fn skip_bits(&mut self, n: usize) -> TaoResult<()> {
        self.check(n)?;
        self.pos += n;
        Ok(())
    }

    /// 对齐到下一个字节边界
    ///
    /// 如果当前已在字节边界, 则不做任何事. 越过有效长度时停在末尾.
    pub fn align_to_byte(&mut self) {
        let aligned = (self.pos + 7) & !7;
        self.pos = aligned.min(self.bit_len);
    }

    /// 获取当前字节位置
    pub fn byte_position(&self) -> usize {
        self.pos >> 3
    }

    /// 获取底层数据的引用
    pub fn data(&self) -> &'a [u8] {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_bits_basic() {
        let data = [0b10110001, 0b01010101];
        let mut br = BitReader::new(&data);

        assert_eq!(br.read_bits(1).unwrap(), 1);
        assert_eq!(br.read_bits(1).unwrap(), 0);
        assert_eq!(br.read_bits(2).unwrap(), 0b11);
        assert_eq!(br.read_bits(4).unwrap(), 0b0001);
        assert_eq!(br.read_bits(8).unwrap(), 0b01010101);

        assert!(br.is_eof());
    }

    #[test]
    fn test_read_bits_32_bit() {
        let data = [0xFF, 0x00, 0xFF, 0x00];
        let mut br = BitReader::new(&data);
        assert_eq!(br.read_bits(32).unwrap(), 0xFF00FF00);
    }

    #[test]
    fn test_peek_bits() {
        let data = [0b10110001];
        let mut br = BitReader::new(&data);

        assert_eq!(br.peek_bits(4).unwrap(), 0b1011);
        assert_eq!(br.peek_bits(4).unwrap(), 0b1011); // 不移动
        assert_eq!(br.read_bits(4).unwrap(), 0b1011);
        assert_eq!(br.peek_bits(4).unwrap(), 0b0001);
    }

    #[test]
    fn test_skip_and_align() {
        let data = [0b10110001, 0b01010101];
        let mut br = BitReader::new(&data);

        br.skip_bits(3).unwrap();
        br.align_to_byte();
        assert_eq!(br.byte_position(), 1);
        assert_eq!(br.read_bits(8).unwrap(), 0b01010101);
    }

    #[test]
    fn test_read_bits_u64() {
        let data = [0xFF, 0x00, 0xFF, 0x00, 0xAA, 0xBB, 0xCC, 0xDD];
        let mut br = BitReader::new(&data);
        assert_eq!(br.read_bits_u64(64).unwrap(), 0xFF00FF00AABBCCDD);
    }

    #[test]
    fn test_限定位长度后越界返回比特不足() {
        let data = [0xFF, 0xFF];
        let mut br = BitReader::with_bit_len(&data, 10);
        assert_eq!(br.read_bits(8).unwrap(), 0xFF);
        assert_eq!(br.bits_left(), 2);
        let err = br.read_bits(3).unwrap_err();
        assert!(matches!(
            err,
            TaoError::BitExhausted {
                needed: 3,
                available: 2
            }
        ));
        // 失败不移动位置
        assert_eq!(br.read_bits(2).unwrap(), 0b11);
        assert!(br.read_bit().is_err());
    }
}
