//! Voice Command Handlers - 音色克隆
//!
//! 上传样本 -> 请求临时目录 -> 嵌入提取 -> 音色存储

use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::application::commands::{CloneVoice, CloneVoiceResponse};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    AudioSample, EmbeddingExtractorPort, ExtractedEmbedding, SynthesisCachePort, VoiceStorePort,
};
use crate::application::scratch::ScratchSpace;
use crate::domain::synthesis::AudioFormat;

/// CloneVoice Handler
pub struct CloneVoiceHandler {
    extractor: Arc<dyn EmbeddingExtractorPort>,
    voice_store: Arc<dyn VoiceStorePort>,
    cache: Option<Arc<dyn SynthesisCachePort>>,
    scratch: ScratchSpace,
    timeout: Duration,
    vad: bool,
}

impl CloneVoiceHandler {
    pub fn new(
        extractor: Arc<dyn EmbeddingExtractorPort>,
        voice_store: Arc<dyn VoiceStorePort>,
        scratch: ScratchSpace,
        timeout: Duration,
    ) -> Self {
        Self {
            extractor,
            voice_store,
            cache: None,
            scratch,
            timeout,
            vad: true,
        }
    }

    /// 启用合成缓存（重新克隆时按音色失效）
    pub fn with_cache(mut self, cache: Arc<dyn SynthesisCachePort>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// 是否在提取前做语音活动检测
    pub fn with_vad(mut self, vad: bool) -> Self {
        self.vad = vad;
        self
    }

    /// 超时只覆盖上传与提取；存储写入一旦开始即完成，不会在提交后报告超时
    pub async fn handle(&self, command: CloneVoice) -> Result<CloneVoiceResponse, ApplicationError> {
        let (request_id, extracted) =
            match tokio::time::timeout(self.timeout, self.extract(command)).await {
                Ok(result) => result?,
                Err(_) => {
                    tracing::warn!(timeout_secs = self.timeout.as_secs(), "Clone request timed out");
                    return Err(ApplicationError::Timeout(self.timeout));
                }
            };
        self.commit(request_id, extracted).await
    }

    async fn extract(&self, command: CloneVoice) -> Result<(Uuid, ExtractedEmbedding), ApplicationError> {
        if command.audio_data.is_empty() {
            return Err(ApplicationError::validation("Audio sample is empty"));
        }

        let file_name = command
            .file_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| "sample.wav".to_string());
        let format = AudioFormat::from_file_name(&file_name).ok_or_else(|| {
            ApplicationError::validation(format!(
                "Unsupported audio file '{}', expected wav, mp3, flac or ogg",
                file_name
            ))
        })?;

        // 样本只存在于本请求的临时目录，任何退出路径都会删除
        let scratch = self.scratch.request()?;
        let sample_path = scratch.path(&format!("upload.{}", format.extension()));
        tokio::fs::write(&sample_path, &command.audio_data).await?;

        tracing::info!(
            request_id = %scratch.id(),
            file_name = %file_name,
            size = command.audio_data.len(),
            "Voice sample received"
        );

        let sample = AudioSample {
            path: sample_path,
            file_name: file_name.clone(),
        };
        let extracted = self.extractor.extract(&sample, self.vad).await.map_err(|e| {
            tracing::warn!(
                request_id = %scratch.id(),
                file_name = %file_name,
                error = %e,
                "Embedding extraction failed"
            );
            ApplicationError::Extraction(e)
        })?;

        Ok((scratch.id(), extracted))
    }

    async fn commit(
        &self,
        request_id: Uuid,
        extracted: ExtractedEmbedding,
    ) -> Result<CloneVoiceResponse, ApplicationError> {
        let key = self
            .voice_store
            .create(&extracted.sample_name, &extracted.embedding)
            .await
            .map_err(|e| {
                tracing::error!(
                    request_id = %request_id,
                    sample_name = %extracted.sample_name,
                    error = %e,
                    "Failed to store voice identity"
                );
                ApplicationError::StorageWrite(e.to_string())
            })?;

        if let Some(cache) = &self.cache {
            match cache.invalidate_voice(&key).await {
                Ok(removed) if removed > 0 => {
                    tracing::info!(identity_key = %key, removed, "Stale synthesis cache invalidated");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(identity_key = %key, error = %e, "Failed to invalidate synthesis cache");
                }
            }
        }

        tracing::info!(
            request_id = %request_id,
            identity_key = %key,
            dims = ?extracted.embedding.dims(),
            "Voice cloned"
        );

        Ok(CloneVoiceResponse {
            identity_key: key.to_string(),
            sample_name: extracted.sample_name.to_string(),
        })
    }
}
