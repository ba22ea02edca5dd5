//! 压缩数据包 (Packet).
//!
//! 一个数据包对应一幅编码图像的完整访问单元 (Annex B 字节流,
//! 可能带有前置的 SPS/PPS).

use bytes::Bytes;

/// 压缩数据包
#[derive(Debug, Clone)]
pub struct Packet {
    /// 压缩数据
    pub data: Bytes,
    /// 有效位长度 (字节流末尾可能不足一字节时有意义)
    pub bit_len: usize,
    /// 显示时间戳 (帧序号)
    pub pts: i64,
    /// 是否为关键帧 (IDR)
    pub is_keyframe: bool,
}

impl Packet {
    /// 创建空数据包
    pub fn empty() -> Self {
        Self {
            data: Bytes::new(),
            bit_len: 0,
            pts: 0,
            is_keyframe: false,
        }
    }

    /// 从数据创建数据包, 有效位长度取整个缓冲区
    pub fn from_data(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let bit_len = data.len() * 8;
        Self {
            data,
            bit_len,
            ..Self::empty()
        }
    }

    /// 数据大小 (字节)
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 是否为空包 (flush packet)
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
