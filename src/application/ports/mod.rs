//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod audio_codec;
mod inference;
mod synthesis_cache;
mod voice_store;

pub use audio_codec::{AudioInfo, AudioProbePort, CodecError};
pub use inference::{
    AudioSample, EmbeddingExtractorPort, ExtractedEmbedding, InferenceError,
    SpeechSynthesizerPort, ToneConverterPort,
};
pub use synthesis_cache::{generate_cache_key, CacheError, CacheStats, SynthesisCachePort};
pub use voice_store::{StoreError, VoiceStorePort};
