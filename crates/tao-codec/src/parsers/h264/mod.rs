//! H.264/AVC 码流语法层.
//!
//! - NAL 单元封装/拆分与防竞争字节
//! - Exp-Golomb 变长整数
//! - SPS / PPS / slice 头的生成与解析

pub mod exp_golomb;
pub mod nal;
pub mod pps;
pub mod slice_header;
pub mod sps;

pub use nal::{NalUnit, NalUnitType, split_annex_b, write_nal_unit};
pub use pps::{Pps, parse_pps};
pub use slice_header::{SliceHeader, SliceType, parse_slice_header};
pub use sps::{Sps, parse_sps};
