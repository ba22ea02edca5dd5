//! 编解码器注册表.
//!
//! 按 `CodecId` 或名称查找并实例化编码器/解码器. 同一 `CodecId` 可注册多个实现,
//! 按注册顺序决定优先级.

use tao_core::{TaoError, TaoResult};

use crate::codec_id::CodecId;
use crate::decoder::Decoder;
use crate::encoder::Encoder;

/// 解码器工厂函数类型
pub type DecoderFactory = fn() -> TaoResult<Box<dyn Decoder>>;

/// 编码器工厂函数类型
pub type EncoderFactory = fn() -> TaoResult<Box<dyn Encoder>>;

/// 注册条目: 标识, 名称, 工厂
struct Entry<F> {
    codec_id: CodecId,
    name: String,
    factory: F,
}

/// 按注册顺序保存的条目表
struct Table<F> {
    entries: Vec<Entry<F>>,
    /// 用于错误信息的角色名 ("编码器" / "解码器")
    role: &'static str,
}

impl<F: Copy> Table<F> {
    fn new(role: &'static str) -> Self {
        Self {
            entries: Vec::new(),
            role,
        }
    }

    fn push(&mut self, codec_id: CodecId, name: String, factory: F) {
        self.entries.push(Entry {
            codec_id,
            name,
            factory,
        });
    }

    fn by_id(&self, codec_id: CodecId) -> TaoResult<F> {
        self.entries
            .iter()
            .find(|e| e.codec_id == codec_id)
            .map(|e| e.factory)
            .ok_or_else(|| TaoError::CodecNotFound(format!("未找到 {codec_id} 的{}", self.role)))
    }

    fn by_name(&self, name: &str) -> TaoResult<F> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.factory)
            .ok_or_else(|| TaoError::CodecNotFound(format!("未找到名为 {name} 的{}", self.role)))
    }

    fn list(&self) -> Vec<(CodecId, &str)> {
        self.entries
            .iter()
            .map(|e| (e.codec_id, e.name.as_str()))
            .collect()
    }
}

/// 编解码器注册表
pub struct CodecRegistry {
    decoders: Table<DecoderFactory>,
    encoders: Table<EncoderFactory>,
}

impl CodecRegistry {
    /// 创建空的注册表
    pub fn new() -> Self {
        Self {
            decoders: Table::new("解码器"),
            encoders: Table::new("编码器"),
        }
    }

    /// 注册一个解码器
    pub fn register_decoder(
        &mut self,
        codec_id: CodecId,
        name: impl Into<String>,
        factory: DecoderFactory,
    ) {
        self.decoders.push(codec_id, name.into(), factory);
    }

    /// 注册一个编码器
    pub fn register_encoder(
        &mut self,
        codec_id: CodecId,
        name: impl Into<String>,
        factory: EncoderFactory,
    ) {
        self.encoders.push(codec_id, name.into(), factory);
    }

    /// 创建指定 `CodecId` 的解码器, 取最先注册的实现
    pub fn create_decoder(&self, codec_id: CodecId) -> TaoResult<Box<dyn Decoder>> {
        (self.decoders.by_id(codec_id)?)()
    }

    /// 创建指定 `CodecId` 的编码器, 取最先注册的实现
    pub fn create_encoder(&self, codec_id: CodecId) -> TaoResult<Box<dyn Encoder>> {
        (self.encoders.by_id(codec_id)?)()
    }

    /// 按名称创建编码器
    pub fn create_encoder_by_name(&self, name: &str) -> TaoResult<Box<dyn Encoder>> {
        (self.encoders.by_name(name)?)()
    }

    /// 按名称创建解码器
    pub fn create_decoder_by_name(&self, name: &str) -> TaoResult<Box<dyn Decoder>> {
        (self.decoders.by_name(name)?)()
    }

    /// 已注册的解码器, 按注册顺序
    pub fn list_decoders(&self) -> Vec<(CodecId, &str)> {
        self.decoders.list()
    }

    /// 已注册的编码器, 按注册顺序
    pub fn list_encoders(&self) -> Vec<(CodecId, &str)> {
        self.encoders.list()
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}
