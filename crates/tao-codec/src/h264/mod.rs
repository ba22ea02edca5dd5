//! H.264 baseline 编解码核心.
//!
//! 分层:
//! - 熵编码: [`cavlc`] 残差块, Exp-Golomb 在 [`crate::parsers::h264::exp_golomb`]
//! - 变换量化: [`transform`], [`residual`]
//! - 宏块模型与语法: [`macroblock`], [`slice_data`]
//! - 预测: [`intra`], [`motion`]
//! - 码率分配: [`rdo`]
//! - 图像级流程: [`encode`], [`decode`], 以及环路滤波 [`deblock`]

pub mod cavlc;
pub mod colour;
pub mod config;
pub mod deblock;
pub mod decode;
pub mod encode;
pub mod intra;
pub mod macroblock;
pub mod motion;
pub mod picture;
pub mod rdo;
pub mod residual;
pub mod slice_data;
pub mod transform;

pub use config::{H264Config, ModeOfOperation, PictureCodingType};
pub use decode::{DecodedPicture, PictureDecoder};
pub use encode::{EncodedPicture, PictureEncoder};
pub use picture::YuvPicture;
