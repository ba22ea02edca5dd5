//! 比特流写入器.
//!
//! 按大端位序 (MSB first) 向字节缓冲区写入数据, 与 `BitReader` 对应.
//!
//! 写入器有两种工作模式:
//! - `BitSink::Write`: 正常写入字节;
//! - `BitSink::CountOnly`: 只累计位数, 不保存数据, 用于码率探测.
//!
//! 两种模式都可以设置比特上限. 越过上限的写入返回 `TaoError::BitExhausted`,
//! 且写入器状态保持不变.

use crate::{TaoError, TaoResult};

/// 写入目标
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitSink {
    /// 写入字节缓冲区
    Write,
    /// 只计数, 不写入
    CountOnly,
}

/// 比特流写入器
///
/// # 示例
/// ```
/// use tao_core::bitwriter::BitWriter;
///
/// let mut bw = BitWriter::new();
/// bw.write_bits(0b1011, 4).unwrap();
/// bw.write_bits(0b0001, 4).unwrap();
/// bw.write_bits(0b01010101, 8).unwrap();
/// let data = bw.finish();
/// assert_eq!(data, vec![0b10110001, 0b01010101]);
/// ```
#[derive(Debug, Clone)]
pub struct BitWriter {
    sink: BitSink,
    /// 输出缓冲区
    data: Vec<u8>,
    /// 当前字节 (正在填充)
    current_byte: u8,
    /// 当前字节中已填充的位数 (0-7)
    bit_count: u8,
    /// 累计写入位数 (两种模式都维护)
    total_bits: usize,
    /// 比特上限
    limit: Option<usize>,
}

impl BitWriter {
    /// 创建新的比特流写入器
    pub fn new() -> Self {
        Self::with_sink(BitSink::Write)
    }

    /// 以指定容量创建比特流写入器
    pub fn with_capacity(capacity: usize) -> Self {
        let mut bw = Self::new();
        bw.data.reserve(capacity);
        bw
    }

    /// 创建只计数的写入器
    pub fn counter() -> Self {
        Self::with_sink(BitSink::CountOnly)
    }

    /// 按写入目标创建
    pub fn with_sink(sink: BitSink) -> Self {
        Self {
            sink,
            data: Vec::new(),
            current_byte: 0,
            bit_count: 0,
            total_bits: 0,
            limit: None,
        }
    }

    /// 设置比特上限
    pub fn with_limit(mut self, limit_bits: usize) -> Self {
        self.limit = Some(limit_bits);
        self
    }

    /// 修改比特上限
    pub fn set_limit(&mut self, limit_bits: Option<usize>) {
        self.limit = limit_bits;
    }

    /// 当前比特上限
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// 写入目标
    pub fn sink(&self) -> BitSink {
        self.sink
    }

    /// 是否为只计数模式
    pub fn is_counting(&self) -> bool {
        self.sink == BitSink::CountOnly
    }

    /// 获取已写入的总位数
    pub fn bits_written(&self) -> usize {
        self.total_bits
    }

    /// 距离上限的剩余位数, 无上限时返回 `None`
    pub fn remaining_bits(&self) -> Option<usize> {
        self.limit.map(|l| l.saturating_sub(self.total_bits))
    }

    /// 当前是否在字节边界
    pub fn is_byte_aligned(&self) -> bool {
        self.total_bits % 8 == 0
    }

    fn reserve(&self, n: u32) -> TaoResult<()> {
        if let Some(limit) = self.limit {
            let needed = n as usize;
            let available = limit.saturating_sub(self.total_bits);
            if needed > available {
                return Err(TaoError::BitExhausted { needed, available });
            }
        }
        Ok(())
    }

    fn push_bits(&mut self, value: u32, n: u32) {
        self.total_bits += n as usize;
        if self.sink == BitSink::CountOnly {
            return;
        }

        let mut remaining = n;
        while remaining > 0 {
            let available = 8 - self.bit_count as u32;
            let to_write = remaining.min(available);

            let shift = remaining - to_write;
            let mask = if to_write >= 32 {
                u32::MAX
            } else {
                (1u32 << to_write) - 1
            };
            let bits = ((value >> shift) & mask) as u8;

            if to_write >= 8 {
                // 整字节写入 (bit_count 必定为 0)
                self.current_byte = bits;
            } else {
                self.current_byte = (self.current_byte << to_write) | bits;
            }
            self.bit_count += to_write as u8;

            if self.bit_count >= 8 {
                self.data.push(self.current_byte);
                self.current_byte = 0;
                self.bit_count = 0;
            }

            remaining -= to_write;
        }
    }

    /// 写入 1 个位
    pub fn write_bit(&mut self, bit: u32) -> TaoResult<()> {
        self.reserve(1)?;
        self.push_bits(bit & 1, 1);
        Ok(())
    }

    /// 写入布尔标志
    pub fn write_flag(&mut self, flag: bool) -> TaoResult<()> {
        self.write_bit(u32::from(flag))
    }

    /// 写入 N 个位 (最多 32 位)
    ///
    /// 值的低 N 位被写入, 高位在前.
    pub fn write_bits(&mut self, value: u32, n: u32) -> TaoResult<()> {
        if n > 32 {
            return Err(TaoError::InvalidArgument(format!(
                "write_bits: n={} 超过 32 位",
                n
            )));
        }
        if n == 0 {
            return Ok(());
        }
        self.reserve(n)?;
        self.push_bits(value, n);
        Ok(())
    }

    /// 写入 N 个位 (最多 64 位)
    pub fn write_bits_u64(&mut self, value: u64, n: u32) -> TaoResult<()> {
        if n > 64 {
            return Err(TaoError::InvalidArgument(format!(
                "write_bits_u64: n={} 超过 64 位",
                n
            )));
        }
        self.reserve(n)?;
        if n <= 32 {
            self.push_bits(value as u32, n);
        } else {
            self.push_bits((value >> 32) as u32, n - 32);
            self.push_bits(value as u32, 32);
        }
        Ok(())
    }

    /// 写入 `count` 个 0 后跟一个 1
    pub fn write_zeros_then_one(&mut self, count: u32) -> TaoResult<()> {
        self.reserve(count + 1)?;
        let mut left = count;
        while left > 0 {
            let n = left.min(32);
            self.push_bits(0, n);
            left -= n;
        }
        self.push_bits(1, 1);
        Ok(())
    }

    /// 对齐到字节边界 (用 0 填充)
    pub fn align_to_byte(&mut self) -> TaoResult<()> {
        let pad = ((8 - self.total_bits % 8) % 8) as u32;
        if pad > 0 {
            self.reserve(pad)?;
            self.push_bits(0, pad);
        }
        Ok(())
    }

    /// 追加另一个写入器的全部内容
    ///
    /// 只计数模式的来源只追加位数.
    pub fn append(&mut self, other: &BitWriter) -> TaoResult<()> {
        let n = other.total_bits;
        self.reserve(n as u32)?;
        if self.sink == BitSink::CountOnly || other.sink == BitSink::CountOnly {
            self.total_bits += n;
            return Ok(());
        }
        for &b in &other.data {
            self.push_bits(u32::from(b), 8);
        }
        if other.bit_count > 0 {
            self.push_bits(u32::from(other.current_byte), u32::from(other.bit_count));
        }
        Ok(())
    }

    /// 写入完整字节
    pub fn write_bytes(&mut self, bytes: &[u8]) -> TaoResult<()> {
        self.reserve((bytes.len() * 8) as u32)?;
        if self.sink == BitSink::Write && self.bit_count == 0 {
            // 快速路径: 已对齐
            self.data.extend_from_slice(bytes);
            self.total_bits += bytes.len() * 8;
        } else {
            for &b in bytes {
                self.push_bits(u32::from(b), 8);
            }
        }
        Ok(())
    }

    /// 获取当前已完成的字节数据引用
    ///
    /// 注意: 不包括正在填充的当前字节.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// 完成写入, 返回字节数据
    ///
    /// 如果当前不在字节边界, 用 0 填充 (不受上限约束).
    pub fn finish(mut self) -> Vec<u8> {
        if self.bit_count > 0 {
            let pad = 8 - self.bit_count;
            self.current_byte <<= pad;
            self.data.push(self.current_byte);
        }
        self.data
    }
}

impl Default for BitWriter {
    fn default() -> Self {
        Self::new()
    }
}
