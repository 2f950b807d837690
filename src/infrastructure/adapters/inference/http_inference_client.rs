//! HTTP Inference Client - 调用外部推理服务
//!
//! 一个客户端同时实现嵌入提取、基础合成、音色转换三个端口
//!
//! 推理服务 API:
//! - GET  /speakers  -> {"speakers": [{"name": "EN-US", "id": 0}]}
//! - POST /extract   multipart(audio, vad) -> {"embedding": {"dims", "values"}, "sample_name"}
//! - POST /tts       {"text", "speaker_id", "speed"} (JSON) -> audio/wav
//! - POST /convert   multipart(audio, source_se, target_se) -> audio/wav
//! - GET  /health

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::application::ports::{
    AudioSample, EmbeddingExtractorPort, ExtractedEmbedding, InferenceError,
    SpeechSynthesizerPort, ToneConverterPort,
};
use crate::domain::voice::{SampleName, SpeakerEmbedding, SpeakerSelector};

/// 嵌入向量的线上格式
#[derive(Debug, Serialize, Deserialize)]
struct EmbeddingPayload {
    dims: Vec<usize>,
    values: Vec<f32>,
}

impl From<&SpeakerEmbedding> for EmbeddingPayload {
    fn from(embedding: &SpeakerEmbedding) -> Self {
        Self {
            dims: embedding.dims().to_vec(),
            values: embedding.values().to_vec(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExtractHttpResponse {
    embedding: EmbeddingPayload,
    sample_name: String,
}

#[derive(Debug, Deserialize)]
struct SpeakersHttpResponse {
    speakers: Vec<SpeakerSelector>,
}

/// 合成请求体 (JSON)
#[derive(Debug, Serialize)]
struct TtsHttpRequest<'a> {
    text: &'a str,
    speaker_id: u32,
    speed: f32,
}

/// HTTP 推理客户端配置
#[derive(Debug, Clone)]
pub struct HttpInferenceClientConfig {
    /// 推理服务基础 URL
    pub base_url: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
}

impl Default for HttpInferenceClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 120,
        }
    }
}

impl HttpInferenceClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// HTTP 推理客户端
pub struct HttpInferenceClient {
    client: Client,
    config: HttpInferenceClientConfig,
}

impl HttpInferenceClient {
    pub fn new(config: HttpInferenceClientConfig) -> Result<Self, InferenceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| InferenceError::Network(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// 以文件形式附加音频
    async fn audio_part(path: &Path, file_name: &str) -> Result<Part, InferenceError> {
        let data = tokio::fs::read(path).await?;
        Ok(Part::bytes(data).file_name(file_name.to_string()))
    }

    /// 校验响应状态，非 2xx 映射为推理错误
    async fn check(response: Response) -> Result<Response, InferenceError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response.text().await.unwrap_or_default();
        let message = format!("HTTP {}: {}", status, error_text);
        if status.is_client_error() {
            Err(InferenceError::InvalidInput(message))
        } else {
            Err(InferenceError::Service(message))
        }
    }

    /// 读取 WAV 响应体并写入 output
    async fn write_audio(response: Response, output: &Path) -> Result<usize, InferenceError> {
        let audio_data = response
            .bytes()
            .await
            .map_err(|e| InferenceError::InvalidResponse(format!("Failed to read audio: {}", e)))?;

        if audio_data.is_empty() {
            return Err(InferenceError::InvalidResponse(
                "Empty audio response".to_string(),
            ));
        }

        tokio::fs::write(output, &audio_data).await?;
        Ok(audio_data.len())
    }
}

fn map_send_error(e: reqwest::Error) -> InferenceError {
    if e.is_timeout() {
        InferenceError::Timeout
    } else if e.is_connect() {
        InferenceError::Network(format!("Cannot connect to inference service: {}", e))
    } else {
        InferenceError::Network(e.to_string())
    }
}

#[async_trait]
impl EmbeddingExtractorPort for HttpInferenceClient {
    async fn extract(
        &self,
        sample: &AudioSample,
        vad: bool,
    ) -> Result<ExtractedEmbedding, InferenceError> {
        let form = Form::new()
            .part("audio", Self::audio_part(&sample.path, &sample.file_name).await?)
            .text("vad", vad.to_string());

        tracing::debug!(
            url = %self.url("/extract"),
            file_name = %sample.file_name,
            vad,
            "Sending extract request"
        );

        let response = self
            .client
            .post(self.url("/extract"))
            .multipart(form)
            .send()
            .await
            .map_err(map_send_error)?;

        // 422: 样本被拒绝（无有效语音）
        if response.status() == StatusCode::UNPROCESSABLE_ENTITY {
            let detail = response.text().await.unwrap_or_default();
            tracing::debug!(detail = %detail, "Extractor rejected sample");
            return Err(InferenceError::NoSpeech);
        }

        let body: ExtractHttpResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| InferenceError::InvalidResponse(e.to_string()))?;

        let embedding = SpeakerEmbedding::new(body.embedding.dims, body.embedding.values)
            .map_err(|e| InferenceError::InvalidResponse(e.to_string()))?;
        let sample_name = SampleName::new(body.sample_name.as_str())
            .unwrap_or_else(|_| SampleName::from_file_name(&body.sample_name));

        tracing::info!(
            sample_name = %sample_name,
            dims = ?embedding.dims(),
            "Embedding extracted"
        );

        Ok(ExtractedEmbedding {
            embedding,
            sample_name,
        })
    }
}

#[async_trait]
impl SpeechSynthesizerPort for HttpInferenceClient {
    async fn speakers(&self) -> Result<Vec<SpeakerSelector>, InferenceError> {
        let response = self
            .client
            .get(self.url("/speakers"))
            .send()
            .await
            .map_err(map_send_error)?;

        let body: SpeakersHttpResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| InferenceError::InvalidResponse(e.to_string()))?;

        Ok(body.speakers)
    }

    async fn synthesize(
        &self,
        text: &str,
        speaker: &SpeakerSelector,
        speed: f32,
        output: &Path,
    ) -> Result<(), InferenceError> {
        let request = TtsHttpRequest {
            text,
            speaker_id: speaker.id,
            speed,
        };

        tracing::debug!(
            url = %self.url("/tts"),
            text_len = text.len(),
            speaker = %speaker,
            speed,
            "Sending TTS request"
        );

        let response = self
            .client
            .post(self.url("/tts"))
            .json(&request)
            .send()
            .await
            .map_err(map_send_error)?;

        let audio_size = Self::write_audio(Self::check(response).await?, output).await?;

        tracing::debug!(speaker = %speaker, audio_size, "Base synthesis completed");
        Ok(())
    }

    async fn health_check(&self) -> bool {
        match self
            .client
            .get(self.url("/health"))
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl ToneConverterPort for HttpInferenceClient {
    async fn convert(
        &self,
        source: &Path,
        source_embedding: &SpeakerEmbedding,
        target_embedding: &SpeakerEmbedding,
        output: &Path,
    ) -> Result<(), InferenceError> {
        let source_se = serde_json::to_string(&EmbeddingPayload::from(source_embedding))
            .map_err(|e| InferenceError::InvalidInput(e.to_string()))?;
        let target_se = serde_json::to_string(&EmbeddingPayload::from(target_embedding))
            .map_err(|e| InferenceError::InvalidInput(e.to_string()))?;

        let form = Form::new()
            .part("audio", Self::audio_part(source, "base.wav").await?)
            .text("source_se", source_se)
            .text("target_se", target_se);

        let response = self
            .client
            .post(self.url("/convert"))
            .multipart(form)
            .send()
            .await
            .map_err(map_send_error)?;

        let audio_size = Self::write_audio(Self::check(response).await?, output).await?;

        tracing::debug!(audio_size, "Tone conversion completed");
        Ok(())
    }
}
