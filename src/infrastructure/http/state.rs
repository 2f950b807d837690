//! Application State
//!
//! 包含所有 Command/Query Handlers 的应用状态

use std::sync::Arc;
use std::time::Duration;

use crate::application::{
    // Command handlers
    CloneVoiceHandler, SpeakHandler,
    // Query handlers
    GetVoiceHandler, ListVoicesHandler,
    // Ports
    EmbeddingExtractorPort, SpeechSynthesizerPort, SynthesisCachePort, VoiceStorePort,
    // Orchestration
    ScratchSpace, SynthesisPipeline,
};

/// 请求处理参数
#[derive(Debug, Clone)]
pub struct RequestLimits {
    /// 单个请求的墙钟超时
    pub request_timeout: Duration,
    /// 合成文本最大字符数
    pub max_text_chars: usize,
    /// 克隆时是否启用 VAD
    pub vad: bool,
}

/// 应用状态
pub struct AppState {
    // ========== Ports ==========
    pub voice_store: Arc<dyn VoiceStorePort>,
    pub synthesizer: Arc<dyn SpeechSynthesizerPort>,
    pub inference_backend: String,
    pub base_speaker: String,

    // ========== Command Handlers ==========
    pub clone_voice_handler: CloneVoiceHandler,
    pub speak_handler: SpeakHandler,

    // ========== Query Handlers ==========
    pub get_voice_handler: GetVoiceHandler,
    pub list_voices_handler: ListVoicesHandler,
}

impl AppState {
    /// 创建应用状态
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        voice_store: Arc<dyn VoiceStorePort>,
        extractor: Arc<dyn EmbeddingExtractorPort>,
        synthesizer: Arc<dyn SpeechSynthesizerPort>,
        pipeline: Arc<SynthesisPipeline>,
        scratch: ScratchSpace,
        cache: Option<Arc<dyn SynthesisCachePort>>,
        inference_backend: impl Into<String>,
        limits: RequestLimits,
    ) -> Self {
        let base_speaker = pipeline.base_speaker().selector().to_string();

        let mut clone_voice_handler = CloneVoiceHandler::new(
            extractor,
            voice_store.clone(),
            scratch,
            limits.request_timeout,
        )
        .with_vad(limits.vad);
        let mut speak_handler =
            SpeakHandler::new(pipeline, limits.request_timeout, limits.max_text_chars);

        if let Some(cache) = cache {
            clone_voice_handler = clone_voice_handler.with_cache(cache.clone());
            speak_handler = speak_handler.with_cache(cache);
        }

        Self {
            // Ports
            voice_store: voice_store.clone(),
            synthesizer,
            inference_backend: inference_backend.into(),
            base_speaker,

            // Command handlers
            clone_voice_handler,
            speak_handler,

            // Query handlers
            get_voice_handler: GetVoiceHandler::new(voice_store.clone()),
            list_voices_handler: ListVoicesHandler::new(voice_store),
        }
    }
}
