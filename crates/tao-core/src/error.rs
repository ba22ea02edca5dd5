//! 统一错误类型定义.
//!
//! 所有 tao crate 共用的错误类型, 支持跨模块传播.
//!
//! 码流层错误分为四类:
//! - `BitExhausted`: 剩余比特不足以读写下一个语法元素, 调用方可恢复 (如提高 QP 重试);
//! - `VlcSyncLoss`: 读到无法匹配任何变长码字的比特模式, 当前 slice 失步;
//! - `Unsupported`: 语法值指向 baseline 之外的特性 (CABAC, B slice, slice group 等);
//! - `BudgetUnsatisfiable`: 即使全部宏块使用最小编码也放不进比特预算, 当前图像丢弃.

use thiserror::Error;

/// 统一错误类型
#[derive(Debug, Error)]
pub enum TaoError {
    /// 无效参数
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 不支持的操作 (超出 baseline profile 的语法或模式)
    #[error("不支持的操作: {0}")]
    Unsupported(String),

    /// 编解码器错误
    #[error("编解码器错误: {0}")]
    Codec(String),

    /// I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 数据不足, 需要更多输入
    #[error("数据不足, 需要更多输入")]
    NeedMoreData,

    /// 已到达流末尾
    #[error("已到达流末尾")]
    Eof,

    /// 比特预算或码流剩余比特不足
    #[error("比特不足: 需要 {needed} 位, 剩余 {available} 位")]
    BitExhausted {
        /// 本次操作需要的位数
        needed: usize,
        /// 实际剩余的位数
        available: usize,
    },

    /// 变长码失步 (没有匹配的码字)
    #[error("变长码失步: {0}")]
    VlcSyncLoss(String),

    /// 比特预算无法满足
    #[error("比特预算无法满足: 最少需要 {required} 位, 预算 {available} 位")]
    BudgetUnsatisfiable {
        /// 最小编码所需位数
        required: usize,
        /// 可用预算
        available: usize,
    },

    /// 未找到指定的编解码器
    #[error("未找到编解码器: {0}")]
    CodecNotFound(String),

    /// 无效数据 (损坏的码流等)
    #[error("无效数据: {0}")]
    InvalidData(String),

    /// 内部错误 (不应发生)
    #[error("内部错误: {0}")]
    Internal(String),
}

impl TaoError {
    /// 是否为可恢复的比特不足错误
    pub fn is_bit_exhausted(&self) -> bool {
        matches!(self, Self::BitExhausted { .. })
    }
}

/// 统一 Result 类型
pub type TaoResult<T> = Result<T, TaoError>;
