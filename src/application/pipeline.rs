//! Synthesis Pipeline - 合成编排器
//!
//! 三阶段顺序执行（阶段间严格数据依赖，无内部并行）:
//! 1. 解析目标音色: 从音色存储读取嵌入向量，不存在立即失败
//! 2. 基础合成: 以基础说话人合成中间波形
//! 3. 音色转换: 基础说话人参考嵌入 -> 目标嵌入
//!
//! 全有或全无：任一阶段失败都不返回产物；编排器从不写音色存储，也不做跨请求缓存

use std::sync::Arc;
use std::time::Instant;

use crate::application::base_speaker::BaseSpeaker;
use crate::application::error::ApplicationError;
use crate::application::ports::{
    AudioProbePort, InferenceError, SpeechSynthesizerPort, ToneConverterPort, VoiceStorePort,
};
use crate::application::scratch::ScratchSpace;
use crate::domain::synthesis::{AudioFormat, SynthesisArtifact, SynthesisRequest};
use crate::domain::voice::{IdentityKey, VoiceIdentity};

const BASE_WAVEFORM: &str = "base.wav";
const CONVERTED_WAVEFORM: &str = "converted.wav";

/// 合成编排器
pub struct SynthesisPipeline {
    voice_store: Arc<dyn VoiceStorePort>,
    synthesizer: Arc<dyn SpeechSynthesizerPort>,
    converter: Arc<dyn ToneConverterPort>,
    probe: Arc<dyn AudioProbePort>,
    base_speaker: BaseSpeaker,
    scratch: ScratchSpace,
}

impl SynthesisPipeline {
    pub fn new(
        voice_store: Arc<dyn VoiceStorePort>,
        synthesizer: Arc<dyn SpeechSynthesizerPort>,
        converter: Arc<dyn ToneConverterPort>,
        probe: Arc<dyn AudioProbePort>,
        base_speaker: BaseSpeaker,
        scratch: ScratchSpace,
    ) -> Self {
        Self {
            voice_store,
            synthesizer,
            converter,
            probe,
            base_speaker,
            scratch,
        }
    }

    pub fn base_speaker(&self) -> &BaseSpeaker {
        &self.base_speaker
    }

    /// 执行完整合成流水线
    pub async fn synthesize(
        &self,
        request: &SynthesisRequest,
    ) -> Result<SynthesisArtifact, ApplicationError> {
        let voice = self.resolve(request).await?;
        self.render(request, &voice).await
    }

    /// 阶段 1: 解析目标音色（格式非法的标识不可能存在）
    pub async fn resolve(&self, request: &SynthesisRequest) -> Result<VoiceIdentity, ApplicationError> {
        let key = IdentityKey::parse(request.identity_key())
            .map_err(|_| ApplicationError::voice_not_found(request.identity_key()))?;
        self.voice_store
            .get(&key)
            .await
            .map_err(|e| ApplicationError::from_lookup(&key, e))
    }

    /// 阶段 2、3: 以已解析的音色快照合成，不再读取音色存储
    pub async fn render(
        &self,
        request: &SynthesisRequest,
        voice: &VoiceIdentity,
    ) -> Result<SynthesisArtifact, ApplicationError> {
        let key = voice.key();
        let target = voice.embedding();

        let scratch = self.scratch.request()?;
        let base_path = scratch.path(BASE_WAVEFORM);
        let output_path = scratch.path(CONVERTED_WAVEFORM);
        let started = Instant::now();

        // 阶段 2: 基础合成
        self.synthesizer
            .synthesize(
                request.text(),
                self.base_speaker.selector(),
                request.speed().value(),
                &base_path,
            )
            .await
            .map_err(|e| {
                tracing::warn!(
                    request_id = %scratch.id(),
                    identity_key = %key,
                    error = %e,
                    "Base synthesis failed"
                );
                ApplicationError::Synthesis(e)
            })?;

        tracing::debug!(
            request_id = %scratch.id(),
            speaker = %self.base_speaker.selector(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Base waveform synthesized"
        );

        // 阶段 3: 音色转换
        self.converter
            .convert(
                &base_path,
                self.base_speaker.reference(),
                target,
                &output_path,
            )
            .await
            .map_err(|e| {
                tracing::warn!(
                    request_id = %scratch.id(),
                    identity_key = %key,
                    error = %e,
                    "Tone conversion failed"
                );
                ApplicationError::Conversion(e)
            })?;

        // 校验输出：缺失、空或不可解码都视为转换失败
        let audio_data = tokio::fs::read(&output_path).await.map_err(|e| {
            ApplicationError::Conversion(InferenceError::InvalidResponse(format!(
                "converted waveform unreadable: {}",
                e
            )))
        })?;
        let info = self.probe.inspect(&audio_data).map_err(|e| {
            ApplicationError::Conversion(InferenceError::InvalidResponse(format!(
                "converted waveform undecodable: {}",
                e
            )))
        })?;
        if info.data_size == 0 {
            return Err(ApplicationError::Conversion(InferenceError::InvalidResponse(
                "converted waveform is empty".to_string(),
            )));
        }

        tracing::info!(
            request_id = %scratch.id(),
            identity_key = %key,
            text_len = request.text().len(),
            speed = %request.speed(),
            duration_ms = info.duration_ms,
            audio_size = audio_data.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Synthesis completed"
        );

        Ok(SynthesisArtifact {
            audio_data,
            format: AudioFormat::Wav,
            sample_rate: info.sample_rate,
            channels: info.channels,
            duration_ms: info.duration_ms,
        })
    }
}
