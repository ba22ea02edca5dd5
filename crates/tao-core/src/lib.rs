//! # tao-core
//!
//! tao-avc 核心库, 提供错误类型、比特流读写器和像素格式定义.
//!
//! 所有编解码模块共用这里的基础设施: 码流层的 `BitReader`/`BitWriter`,
//! 以及贯穿整个工作区的 `TaoError`/`TaoResult`.

pub mod bitreader;
pub mod bitwriter;
pub mod error;
pub mod pixel_format;

// 重导出常用类型
pub use bitreader::BitReader;
pub use bitwriter::BitWriter;
pub use error::{TaoError, TaoResult};
pub use pixel_format::PixelFormat;
