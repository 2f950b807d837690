//! 测试替身
//!
//! 端口的内存实现，带调用计数，供应用层和 HTTP 层测试使用

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::application::base_speaker::BaseSpeaker;
use crate::application::ports::{
    AudioSample, CacheError, CacheStats, EmbeddingExtractorPort, ExtractedEmbedding,
    InferenceError, SpeechSynthesizerPort, StoreError, SynthesisCachePort, ToneConverterPort,
    VoiceStorePort,
};
use crate::domain::synthesis::SynthesisArtifact;
use crate::domain::voice::{IdentityKey, SampleName, SpeakerEmbedding, SpeakerSelector, VoiceIdentity};
use crate::infrastructure::adapters::{DecodedAudio, WavCodec};

/// 固定形状 [1, 4, 1] 的嵌入向量
pub fn embedding(value: f32) -> SpeakerEmbedding {
    SpeakerEmbedding::new(vec![1, 4, 1], vec![value; 4]).unwrap()
}

/// EN-US#0 基础说话人
pub fn base_speaker() -> BaseSpeaker {
    BaseSpeaker::new(SpeakerSelector::new("EN-US", 0), embedding(1.0))
}

/// 16kHz 单声道正弦波 WAV
pub fn tone_wav(duration_ms: u64, amplitude: f32) -> Vec<u8> {
    let sample_rate = 16000u32;
    let frames = (sample_rate as u64 * duration_ms / 1000) as usize;
    let samples = (0..frames)
        .map(|i| amplitude * (i as f32 * 440.0 * std::f32::consts::TAU / sample_rate as f32).sin())
        .collect();
    WavCodec::new()
        .encode(&DecodedAudio::new(samples, sample_rate, 1))
        .unwrap()
}

// ============================================================================
// Voice store
// ============================================================================

#[derive(Default)]
pub struct MemoryVoiceStore {
    voices: Mutex<BTreeMap<IdentityKey, VoiceIdentity>>,
    creates: AtomicUsize,
    fail_writes: AtomicBool,
    write_delay: Mutex<Option<Duration>>,
}

impl MemoryVoiceStore {
    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    pub fn delay_writes(&self, delay: Duration) {
        *self.write_delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait]
impl VoiceStorePort for MemoryVoiceStore {
    async fn create(
        &self,
        sample_name: &SampleName,
        embedding: &SpeakerEmbedding,
    ) -> Result<IdentityKey, StoreError> {
        let delay = *self.write_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Write("disk full".to_string()));
        }
        let voice = VoiceIdentity::new(sample_name, embedding.clone());
        let key = voice.key().clone();
        self.voices.lock().unwrap().insert(key.clone(), voice);
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(key)
    }

    async fn get(&self, key: &IdentityKey) -> Result<VoiceIdentity, StoreError> {
        self.voices
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.clone()))
    }

    async fn list(&self) -> Result<Vec<IdentityKey>, StoreError> {
        Ok(self.voices.lock().unwrap().keys().cloned().collect())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

// ============================================================================
// Extractor
// ============================================================================

/// 按文件名推导样本名；样本字节为空或全零视为无语音
#[derive(Default)]
pub struct StubExtractor {
    calls: AtomicUsize,
    samples: Mutex<Vec<PathBuf>>,
    failure: Mutex<Option<InferenceError>>,
    delay: Mutex<Option<Duration>>,
}

impl StubExtractor {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn sample_paths(&self) -> Vec<PathBuf> {
        self.samples.lock().unwrap().clone()
    }

    pub fn fail_with(&self, err: InferenceError) {
        *self.failure.lock().unwrap() = Some(err);
    }

    pub fn delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait]
impl EmbeddingExtractorPort for StubExtractor {
    async fn extract(
        &self,
        sample: &AudioSample,
        vad: bool,
    ) -> Result<ExtractedEmbedding, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.samples.lock().unwrap().push(sample.path.clone());

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(err) = self.failure.lock().unwrap().clone() {
            return Err(err);
        }

        let data = tokio::fs::read(&sample.path).await?;
        if vad && data.iter().all(|b| *b == 0) {
            return Err(InferenceError::NoSpeech);
        }

        Ok(ExtractedEmbedding {
            embedding: embedding(data.len() as f32 / 1000.0),
            sample_name: SampleName::from_file_name(&sample.file_name),
        })
    }
}

// ============================================================================
// Synthesizer
// ============================================================================

pub struct StubSynthesizer {
    speakers: Vec<SpeakerSelector>,
    calls: AtomicUsize,
    failure: Mutex<Option<InferenceError>>,
    delay: Mutex<Option<Duration>>,
    last_speaker: Mutex<Option<SpeakerSelector>>,
    output_dirs: Mutex<Vec<PathBuf>>,
}

impl Default for StubSynthesizer {
    fn default() -> Self {
        Self::with_speakers(vec![SpeakerSelector::new("EN-US", 0)])
    }
}

impl StubSynthesizer {
    pub fn with_speakers(speakers: Vec<SpeakerSelector>) -> Self {
        Self {
            speakers,
            calls: AtomicUsize::new(0),
            failure: Mutex::new(None),
            delay: Mutex::new(None),
            last_speaker: Mutex::new(None),
            output_dirs: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail_with(&self, err: InferenceError) {
        *self.failure.lock().unwrap() = Some(err);
    }

    pub fn delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn last_speaker(&self) -> Option<SpeakerSelector> {
        self.last_speaker.lock().unwrap().clone()
    }

    pub fn output_dirs(&self) -> Vec<PathBuf> {
        self.output_dirs.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechSynthesizerPort for StubSynthesizer {
    async fn speakers(&self) -> Result<Vec<SpeakerSelector>, InferenceError> {
        Ok(self.speakers.clone())
    }

    async fn synthesize(
        &self,
        text: &str,
        speaker: &SpeakerSelector,
        _speed: f32,
        output: &Path,
    ) -> Result<(), InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_speaker.lock().unwrap() = Some(speaker.clone());
        if let Some(parent) = output.parent() {
            self.output_dirs.lock().unwrap().push(parent.to_path_buf());
        }

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(err) = self.failure.lock().unwrap().clone() {
            return Err(err);
        }

        let duration_ms = 50 * text.chars().count().max(1) as u64;
        tokio::fs::write(output, tone_wav(duration_ms, 0.5)).await?;
        Ok(())
    }
}

// ============================================================================
// Converter
// ============================================================================

#[derive(Default)]
pub struct StubConverter {
    calls: AtomicUsize,
    failure: Mutex<Option<InferenceError>>,
    garbage: AtomicBool,
    last: Mutex<Option<(SpeakerEmbedding, SpeakerEmbedding)>>,
}

impl StubConverter {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail_with(&self, err: InferenceError) {
        *self.failure.lock().unwrap() = Some(err);
    }

    /// 输出不可解码的数据
    pub fn write_garbage(&self) {
        self.garbage.store(true, Ordering::SeqCst);
    }

    pub fn last_embeddings(&self) -> Option<(SpeakerEmbedding, SpeakerEmbedding)> {
        self.last.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToneConverterPort for StubConverter {
    async fn convert(
        &self,
        source: &Path,
        source_embedding: &SpeakerEmbedding,
        target_embedding: &SpeakerEmbedding,
        output: &Path,
    ) -> Result<(), InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some((source_embedding.clone(), target_embedding.clone()));

        if let Some(err) = self.failure.lock().unwrap().clone() {
            return Err(err);
        }

        if self.garbage.load(Ordering::SeqCst) {
            tokio::fs::write(output, b"not a wav").await?;
        } else {
            tokio::fs::copy(source, output).await?;
        }
        Ok(())
    }
}

// ============================================================================
// Synthesis cache
// ============================================================================

#[derive(Default)]
pub struct MemorySynthesisCache {
    entries: Mutex<BTreeMap<String, SynthesisArtifact>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl MemorySynthesisCache {
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

#[async_trait]
impl SynthesisCachePort for MemorySynthesisCache {
    async fn get(&self, cache_key: &str) -> Result<Option<SynthesisArtifact>, CacheError> {
        let found = self.entries.lock().unwrap().get(cache_key).cloned();
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::SeqCst);
        } else {
            self.misses.fetch_add(1, Ordering::SeqCst);
        }
        Ok(found)
    }

    async fn put(&self, cache_key: &str, artifact: &SynthesisArtifact) -> Result<(), CacheError> {
        self.entries
            .lock()
            .unwrap()
            .insert(cache_key.to_string(), artifact.clone());
        Ok(())
    }

    async fn invalidate_voice(&self, key: &IdentityKey) -> Result<usize, CacheError> {
        let prefix = format!("{}:", key);
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|k, _| !k.starts_with(&prefix));
        Ok(before - entries.len())
    }

    async fn stats(&self) -> CacheStats {
        let entries = self.entries.lock().unwrap();
        CacheStats {
            total_entries: entries.len(),
            total_size_bytes: entries.values().map(|a| a.size_bytes() as u64).sum(),
            max_size_bytes: u64::MAX,
            hit_count: self.hits.load(Ordering::SeqCst) as u64,
            miss_count: self.misses.load(Ordering::SeqCst) as u64,
        }
    }
}
