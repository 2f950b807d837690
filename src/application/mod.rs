//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（音色存储、推理协作者、音频探测、合成缓存）
//! - commands: CQRS 命令及处理器（克隆音色、合成语音）
//! - queries: CQRS 查询及处理器（音色列表、详情）
//! - pipeline: 合成编排器
//! - error: 应用层错误定义

pub mod base_speaker;
pub mod commands;
pub mod error;
pub mod pipeline;
pub mod ports;
pub mod queries;
pub mod scratch;

#[cfg(test)]
pub(crate) mod test_support;

// Re-exports
pub use base_speaker::{BaseSpeaker, BaseSpeakerError};
pub use commands::{
    handlers::{CloneVoiceHandler, SpeakHandler},
    CloneVoice, CloneVoiceResponse, Speak,
};
pub use error::{ApplicationError, ErrorCategory};
pub use pipeline::SynthesisPipeline;
pub use ports::{
    generate_cache_key, AudioInfo, AudioProbePort, AudioSample, CacheError, CacheStats,
    CodecError, EmbeddingExtractorPort, ExtractedEmbedding, InferenceError,
    SpeechSynthesizerPort, StoreError, SynthesisCachePort, ToneConverterPort, VoiceStorePort,
};
pub use queries::{
    handlers::{GetVoiceHandler, ListVoicesHandler, VoiceResponse},
    GetVoice, ListVoices,
};
pub use scratch::{RequestScratch, ScratchSpace};
