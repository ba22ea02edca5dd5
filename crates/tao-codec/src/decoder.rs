//! 解码器 trait 定义.

use tao_core::TaoResult;

use crate::codec_id::CodecId;
use crate::codec_parameters::CodecParameters;
use crate::frame::VideoFrame;
use crate::packet::Packet;

/// 解码器 trait
///
/// 解码流程:
/// 1. 调用 `send_packet()` 送入一个访问单元
/// 2. 调用 `receive_frame()` 取出解码后的帧
/// 3. 送入空包表示结束
pub trait Decoder: Send {
    /// 获取解码器标识
    fn codec_id(&self) -> CodecId;

    /// 获取解码器名称
    fn name(&self) -> &str;

    /// 使用参数配置解码器
    ///
    /// 码流自带参数集时可以跳过.
    fn open(&mut self, _params: &CodecParameters) -> TaoResult<()> {
        Ok(())
    }

    /// 送入一个压缩数据包进行解码
    fn send_packet(&mut self, packet: &Packet) -> TaoResult<()>;

    /// 从解码器取出一帧解码数据
    ///
    /// # 返回
    /// - `Err(TaoError::NeedMoreData)`: 需要送入更多数据包
    /// - `Err(TaoError::Eof)`: 所有帧已取出
    fn receive_frame(&mut self) -> TaoResult<VideoFrame>;

    /// 刷新解码器, 丢弃参考帧
    fn flush(&mut self);
}
