//! 编码器 trait 定义.

use tao_core::TaoResult;

use crate::codec_id::CodecId;
use crate::codec_parameters::CodecParameters;
use crate::frame::VideoFrame;
use crate::packet::Packet;

/// 编码器 trait
///
/// 编码流程:
/// 1. 调用 `open()` 提供尺寸与专有参数
/// 2. 调用 `send_frame()` 送入原始帧数据
/// 3. 调用 `receive_packet()` 取出压缩数据包
/// 4. 送入 None 表示编码结束
pub trait Encoder: Send {
    /// 获取编码器标识
    fn codec_id(&self) -> CodecId;

    /// 获取编码器名称
    fn name(&self) -> &str;

    /// 使用参数配置编码器
    fn open(&mut self, params: &CodecParameters) -> TaoResult<()>;

    /// 设置单个专有参数
    fn set_option(&mut self, key: &str, value: &str) -> TaoResult<()>;

    /// 送入一帧原始数据进行编码
    ///
    /// # 返回
    /// - `Ok(())`: 帧已接受
    /// - `Err(TaoError::NeedMoreData)`: 上一个数据包尚未取出
    fn send_frame(&mut self, frame: Option<&VideoFrame>) -> TaoResult<()>;

    /// 从编码器取出一个压缩数据包
    ///
    /// # 返回
    /// - `Err(TaoError::NeedMoreData)`: 需要送入更多帧
    /// - `Err(TaoError::Eof)`: 所有数据包已取出
    fn receive_packet(&mut self) -> TaoResult<Packet>;

    /// 刷新编码器, 下一帧重新从 IDR 开始
    fn flush(&mut self);
}
