//! Fake Inference - 不依赖推理服务的本地协作者
//!
//! 用于开发和测试：信号处理代替模型推理，结果确定且可复现。
//! 解码/编码在 spawn_blocking 中执行，不阻塞请求处理

use async_trait::async_trait;
use std::path::Path;

use crate::application::ports::{
    AudioSample, EmbeddingExtractorPort, ExtractedEmbedding, InferenceError,
    SpeechSynthesizerPort, ToneConverterPort,
};
use crate::domain::synthesis::{MAX_SPEED, MIN_SPEED};
use crate::domain::voice::{SampleName, SpeakerEmbedding, SpeakerSelector};
use crate::infrastructure::adapters::codec::{DecodedAudio, WavCodec};

/// 嵌入向量维度 [1, EMBEDDING_BANDS, 1]
const EMBEDDING_BANDS: usize = 256;
/// VAD 帧长（毫秒）
const VAD_FRAME_MS: u64 = 20;
/// 有声帧 RMS 阈值
const VAD_THRESHOLD: f32 = 0.01;
/// 有声帧最少数量（约 0.2 秒）
const VAD_MIN_VOICED_FRAMES: usize = 10;

const FAKE_SAMPLE_RATE: u32 = 22050;
const MS_PER_CHAR: f32 = 60.0;
const MIN_DURATION_MS: f32 = 200.0;
/// 单次合成时长上限（10 分钟）
const MAX_DURATION_MS: f32 = 600_000.0;

fn blocking_error(e: tokio::task::JoinError) -> InferenceError {
    InferenceError::Service(format!("Worker task failed: {}", e))
}

fn decode_wav(data: &[u8]) -> Result<DecodedAudio, InferenceError> {
    WavCodec::new()
        .decode(data)
        .map_err(|e| InferenceError::InvalidInput(e.to_string()))
}

fn encode_wav(pcm: &DecodedAudio) -> Result<Vec<u8>, InferenceError> {
    WavCodec::new()
        .encode(pcm)
        .map_err(|e| InferenceError::Service(e.to_string()))
}

/// 单声道化
fn mono(audio: &DecodedAudio) -> Vec<f32> {
    let channels = audio.channels.max(1) as usize;
    audio
        .samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// 基于帧能量的语音活动检测，返回有声样本
fn voiced_samples(audio: &DecodedAudio) -> Vec<f32> {
    let samples = mono(audio);
    let frame_len = ((audio.sample_rate as u64 * VAD_FRAME_MS) / 1000).max(1) as usize;

    samples
        .chunks(frame_len)
        .filter(|frame| {
            let energy: f32 = frame.iter().map(|s| s * s).sum::<f32>() / frame.len() as f32;
            energy.sqrt() >= VAD_THRESHOLD
        })
        .flatten()
        .copied()
        .collect()
}

/// 分段能量嵌入：信号切成 EMBEDDING_BANDS 段，各段 RMS 归一化
fn band_energy_embedding(samples: &[f32]) -> Result<SpeakerEmbedding, InferenceError> {
    if samples.is_empty() {
        return Err(InferenceError::NoSpeech);
    }

    let band_len = samples.len().div_ceil(EMBEDDING_BANDS);
    let mut bands: Vec<f32> = samples
        .chunks(band_len)
        .map(|band| (band.iter().map(|s| s * s).sum::<f32>() / band.len() as f32).sqrt())
        .collect();
    bands.resize(EMBEDDING_BANDS, 0.0);

    let norm = bands.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        bands.iter_mut().for_each(|v| *v /= norm);
    }

    SpeakerEmbedding::new(vec![1, EMBEDDING_BANDS, 1], bands)
        .map_err(|e| InferenceError::Service(e.to_string()))
}

// ============================================================================
// Extractor
// ============================================================================

/// Fake Embedding Extractor
#[derive(Debug, Default)]
pub struct FakeEmbeddingExtractor;

impl FakeEmbeddingExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EmbeddingExtractorPort for FakeEmbeddingExtractor {
    async fn extract(
        &self,
        sample: &AudioSample,
        vad: bool,
    ) -> Result<ExtractedEmbedding, InferenceError> {
        let data = tokio::fs::read(&sample.path).await?;
        let sample_name = SampleName::from_file_name(&sample.file_name);

        let embedding = tokio::task::spawn_blocking(move || {
            let audio = decode_wav(&data)?;
            let samples = if vad {
                let voiced = voiced_samples(&audio);
                let frame_len =
                    ((audio.sample_rate as u64 * VAD_FRAME_MS) / 1000).max(1) as usize;
                if voiced.len() < frame_len * VAD_MIN_VOICED_FRAMES {
                    return Err(InferenceError::NoSpeech);
                }
                voiced
            } else {
                mono(&audio)
            };
            band_energy_embedding(&samples)
        })
        .await
        .map_err(blocking_error)??;

        tracing::debug!(sample_name = %sample_name, norm = embedding.norm(), "Fake embedding extracted");

        Ok(ExtractedEmbedding {
            embedding,
            sample_name,
        })
    }
}

// ============================================================================
// Synthesizer
// ============================================================================

/// Fake Speech Synthesizer
///
/// 每个基础说话人对应一个固定频率的正弦音，时长随文本长度和语速变化
#[derive(Debug)]
pub struct FakeSpeechSynthesizer {
    speakers: Vec<SpeakerSelector>,
}

impl Default for FakeSpeechSynthesizer {
    fn default() -> Self {
        let speakers = ["EN-US", "EN-BR", "EN-AU", "EN-INDIA", "EN-DEFAULT"]
            .iter()
            .enumerate()
            .map(|(id, name)| SpeakerSelector::new(*name, id as u32))
            .collect();
        Self { speakers }
    }
}

impl FakeSpeechSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    fn frequency(speaker: &SpeakerSelector) -> f32 {
        180.0 + 40.0 * speaker.id as f32
    }

    fn render(speaker: &SpeakerSelector, duration_ms: f32) -> DecodedAudio {
        let duration_ms = duration_ms.clamp(0.0, MAX_DURATION_MS);
        let frames = (FAKE_SAMPLE_RATE as f32 * duration_ms / 1000.0) as usize;
        let frequency = Self::frequency(speaker);
        let samples = (0..frames)
            .map(|i| {
                let t = i as f32 / FAKE_SAMPLE_RATE as f32;
                // 4Hz 包络，模拟音节起伏
                let envelope = 0.6 + 0.4 * (t * 4.0 * std::f32::consts::TAU).sin();
                0.5 * envelope * (t * frequency * std::f32::consts::TAU).sin()
            })
            .collect();
        DecodedAudio::new(samples, FAKE_SAMPLE_RATE, 1)
    }

    /// 基础说话人的内置参考嵌入（与 FakeEmbeddingExtractor 同一算法）
    pub fn base_reference(&self, speaker: &SpeakerSelector) -> Result<SpeakerEmbedding, InferenceError> {
        if !self.speakers.contains(speaker) {
            return Err(InferenceError::InvalidInput(format!(
                "Unknown speaker {}",
                speaker
            )));
        }
        let audio = Self::render(speaker, 1000.0);
        band_energy_embedding(&audio.samples)
    }
}

#[async_trait]
impl SpeechSynthesizerPort for FakeSpeechSynthesizer {
    async fn speakers(&self) -> Result<Vec<SpeakerSelector>, InferenceError> {
        Ok(self.speakers.clone())
    }

    async fn synthesize(
        &self,
        text: &str,
        speaker: &SpeakerSelector,
        speed: f32,
        output: &Path,
    ) -> Result<(), InferenceError> {
        if text.trim().is_empty() {
            return Err(InferenceError::InvalidInput("Empty text".to_string()));
        }
        if !(MIN_SPEED..=MAX_SPEED).contains(&speed) {
            return Err(InferenceError::InvalidInput(format!("Invalid speed {}", speed)));
        }
        if !self.speakers.contains(speaker) {
            return Err(InferenceError::InvalidInput(format!(
                "Unknown speaker {}",
                speaker
            )));
        }

        let duration_ms = (text.chars().count() as f32 * MS_PER_CHAR / speed)
            .clamp(MIN_DURATION_MS, MAX_DURATION_MS);
        let speaker = speaker.clone();
        let wav = tokio::task::spawn_blocking(move || encode_wav(&Self::render(&speaker, duration_ms)))
            .await
            .map_err(blocking_error)??;

        tokio::fs::write(output, wav).await?;
        Ok(())
    }
}

// ============================================================================
// Converter
// ============================================================================

/// Fake Tone Converter
///
/// 按目标/源嵌入均值之比调整增益
#[derive(Debug, Default)]
pub struct FakeToneConverter;

impl FakeToneConverter {
    pub fn new() -> Self {
        Self
    }

    fn gain(source: &SpeakerEmbedding, target: &SpeakerEmbedding) -> f32 {
        let mean = |e: &SpeakerEmbedding| e.values().iter().sum::<f32>() / e.len() as f32;
        let source_mean = mean(source);
        if source_mean.abs() < f32::EPSILON {
            return 1.0;
        }
        (mean(target) / source_mean).abs().clamp(0.25, 4.0)
    }
}

#[async_trait]
impl ToneConverterPort for FakeToneConverter {
    async fn convert(
        &self,
        source: &Path,
        source_embedding: &SpeakerEmbedding,
        target_embedding: &SpeakerEmbedding,
        output: &Path,
    ) -> Result<(), InferenceError> {
        if source_embedding.dims() != target_embedding.dims() {
            return Err(InferenceError::InvalidInput(format!(
                "Embedding shape mismatch: {:?} vs {:?}",
                source_embedding.dims(),
                target_embedding.dims()
            )));
        }

        let data = tokio::fs::read(source).await?;
        let gain = Self::gain(source_embedding, target_embedding);

        let wav = tokio::task::spawn_blocking(move || {
            let mut audio = decode_wav(&data)?;
            audio
                .samples
                .iter_mut()
                .for_each(|s| *s = (*s * gain).clamp(-1.0, 1.0));
            encode_wav(&audio)
        })
        .await
        .map_err(blocking_error)??;

        tokio::fs::write(output, wav).await?;
        Ok(())
    }
}
