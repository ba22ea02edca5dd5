//! # tao-avc
//!
//! 纯 Rust 实现的 H.264 baseline 编解码器.
//!
//! - **编码**: I16x16 帧内预测 + 单参考 P16x16 帧间预测, CAVLC 熵编码,
//!   在每幅图像的比特预算内为每个宏块选择 QP, 使最差宏块失真最小
//! - **解码**: 同一子集的逐样本精确重建, 带环路去块滤波
//!
//! # 快速开始
//!
//! ```rust
//! use tao_avc::codec::h264::{H264Config, PictureDecoder, PictureEncoder, YuvPicture};
//!
//! let config = H264Config { width: 32, height: 32, ..H264Config::default() };
//! let mut encoder = PictureEncoder::new(config).unwrap();
//! let picture = YuvPicture::filled(32, 32, 100).unwrap();
//! let encoded = encoder.encode(&picture, 4000).unwrap();
//! assert!(encoded.bit_len <= 8000);
//!
//! let mut decoder = PictureDecoder::new();
//! let decoded = decoder.decode(&encoded.data).unwrap().unwrap();
//! assert_eq!(Some(&decoded.picture), encoder.reference());
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `tao-core` | 错误类型, 比特流读写, 像素格式 |
//! | `tao-codec` | 编解码器框架, H.264 语法层与编解码核心 |

/// 核心类型与工具
pub use tao_core as core;

/// 编解码器框架与 H.264 实现
pub use tao_codec as codec;

/// 获取版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// 创建已注册所有内置编解码器的注册表
pub fn default_codec_registry() -> tao_codec::CodecRegistry {
    let mut registry = tao_codec::CodecRegistry::new();
    tao_codec::register_all(&mut registry);
    registry
}
