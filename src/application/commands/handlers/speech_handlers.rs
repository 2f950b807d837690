//! Speech Command Handlers - 合成语音
//!
//! 校验 -> 缓存查询 -> 编排器（带请求超时）-> 缓存写入

use std::sync::Arc;
use std::time::Duration;

use crate::application::commands::Speak;
use crate::application::error::ApplicationError;
use crate::application::pipeline::SynthesisPipeline;
use crate::application::ports::{generate_cache_key, SynthesisCachePort};
use crate::domain::synthesis::{Speed, SynthesisArtifact, SynthesisRequest};

/// Speak Handler
pub struct SpeakHandler {
    pipeline: Arc<SynthesisPipeline>,
    cache: Option<Arc<dyn SynthesisCachePort>>,
    timeout: Duration,
    max_text_chars: usize,
}

impl SpeakHandler {
    pub fn new(pipeline: Arc<SynthesisPipeline>, timeout: Duration, max_text_chars: usize) -> Self {
        Self {
            pipeline,
            cache: None,
            timeout,
            max_text_chars,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn SynthesisCachePort>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub async fn handle(&self, command: Speak) -> Result<SynthesisArtifact, ApplicationError> {
        let voice_id = command
            .voice_id
            .ok_or_else(|| ApplicationError::validation("voice_id is required"))?;
        let speed = match command.speed {
            Some(value) => Speed::new(value).map_err(ApplicationError::validation)?,
            None => Speed::default(),
        };
        let request = SynthesisRequest::new(command.text, voice_id, speed, self.max_text_chars)
            .map_err(ApplicationError::validation)?;

        match tokio::time::timeout(self.timeout, self.speak(&request)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    identity_key = %request.identity_key(),
                    timeout_secs = self.timeout.as_secs(),
                    "Speak request timed out"
                );
                Err(ApplicationError::Timeout(self.timeout))
            }
        }
    }

    async fn speak(&self, request: &SynthesisRequest) -> Result<SynthesisArtifact, ApplicationError> {
        let Some(cache) = &self.cache else {
            return self.pipeline.synthesize(request).await;
        };

        // 缓存 key 与合成使用同一份音色快照，产物总是落在生成它的那一代音色下
        let voice = self.pipeline.resolve(request).await?;
        let cache_key = generate_cache_key(request.text(), &voice, request.speed());

        match cache.get(&cache_key).await {
            Ok(Some(artifact)) => {
                tracing::info!(
                    identity_key = %voice.key(),
                    cache_key = %cache_key,
                    "Synthesis cache hit"
                );
                return Ok(artifact);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(cache_key = %cache_key, error = %e, "Synthesis cache read failed");
            }
        }

        let artifact = self.pipeline.render(request, &voice).await?;

        if let Err(e) = cache.put(&cache_key, &artifact).await {
            tracing::warn!(cache_key = %cache_key, error = %e, "Synthesis cache write failed");
        }

        Ok(artifact)
    }
}
