//! # tao-codec
//!
//! H.264 baseline 编解码器库, 提供编解码器框架与 Packet/Frame 抽象.
//!
//! - [`h264`]: 编解码核心 (CAVLC, 变换量化, 帧内/帧间预测, 码率分配, 去块滤波)
//! - [`parsers::h264`]: NAL / SPS / PPS / slice 头语法
//! - [`encoders`] / [`decoders`]: 接入 [`Encoder`] / [`Decoder`] 框架的适配层
//!
//! ## 使用示例
//!
//! ```rust
//! use tao_codec::{CodecId, CodecRegistry};
//!
//! let mut reg = CodecRegistry::new();
//! tao_codec::register_all(&mut reg);
//!
//! let decoder = reg.create_decoder(CodecId::H264).unwrap();
//! let encoder = reg.create_encoder(CodecId::H264).unwrap();
//! assert_eq!(decoder.name(), encoder.name());
//! ```

pub mod codec_id;
pub mod codec_parameters;
pub mod decoder;
pub mod decoders;
pub mod encoder;
pub mod encoders;
pub mod frame;
pub mod h264;
pub mod packet;
pub mod parsers;
pub mod registry;

// 重导出常用类型
pub use codec_id::CodecId;
pub use codec_parameters::{CodecParameters, VideoCodecParams};
pub use decoder::Decoder;
pub use encoder::Encoder;
pub use frame::{PictureType, VideoFrame};
pub use packet::Packet;
pub use registry::CodecRegistry;

/// 注册所有内置编解码器
pub fn register_all(registry: &mut CodecRegistry) {
    decoders::register_all_decoders(registry);
    encoders::register_all_encoders(registry);
}
