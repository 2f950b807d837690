//! Inference Ports - 推理协作者抽象
//!
//! 嵌入提取、基础语音合成、音色转换三个不透明能力的窄接口，
//! 具体实现在 infrastructure/adapters 层（HTTP 推理服务或本地 Fake）

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::domain::voice::{SampleName, SpeakerEmbedding, SpeakerSelector};

/// 推理错误
#[derive(Debug, Clone, Error)]
pub enum InferenceError {
    #[error("No speech detected in sample")]
    NoSpeech,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Service error: {0}")]
    Service(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl InferenceError {
    /// 协作者是否拒绝了输入本身（修改输入前重试无意义）
    pub fn is_input_rejection(&self) -> bool {
        matches!(self, Self::NoSpeech | Self::InvalidInput(_))
    }
}

impl From<std::io::Error> for InferenceError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// 上传的音频样本
#[derive(Debug, Clone)]
pub struct AudioSample {
    /// 请求临时目录中的样本路径
    pub path: PathBuf,
    /// 上传时的原始文件名（样本名称由此推导）
    pub file_name: String,
}

/// 提取结果
#[derive(Debug, Clone)]
pub struct ExtractedEmbedding {
    pub embedding: SpeakerEmbedding,
    pub sample_name: SampleName,
}

/// Embedding Extractor Port
#[async_trait]
pub trait EmbeddingExtractorPort: Send + Sync {
    /// 从音频样本提取说话人嵌入向量
    ///
    /// vad 为 true 时先做语音活动检测，无有效语音返回 `InferenceError::NoSpeech`
    async fn extract(
        &self,
        sample: &AudioSample,
        vad: bool,
    ) -> Result<ExtractedEmbedding, InferenceError>;
}

/// Speech Synthesizer Port
#[async_trait]
pub trait SpeechSynthesizerPort: Send + Sync {
    /// 合成器声明的基础说话人集合（有序）
    async fn speakers(&self) -> Result<Vec<SpeakerSelector>, InferenceError>;

    /// 以基础说话人合成文本，WAV 写入 output
    async fn synthesize(
        &self,
        text: &str,
        speaker: &SpeakerSelector,
        speed: f32,
        output: &Path,
    ) -> Result<(), InferenceError>;

    /// 检查合成服务是否可用
    async fn health_check(&self) -> bool {
        true // 默认实现
    }
}

/// Tone Converter Port
#[async_trait]
pub trait ToneConverterPort: Send + Sync {
    /// 将 source 中的语音由源说话人音色转换为目标说话人音色，WAV 写入 output
    async fn convert(
        &self,
        source: &Path,
        source_embedding: &SpeakerEmbedding,
        target_embedding: &SpeakerEmbedding,
        output: &Path,
    ) -> Result<(), InferenceError>;
}
