//! Concurrency Limited - 推理协作者并发限制
//!
//! 用 semaphore 包装任意推理端口实现；max_concurrent = 1 时串行化
//! 非线程安全的协作者。同一个包装实例实现的所有端口共享同一组 permit

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Semaphore, SemaphorePermit};

use crate::application::ports::{
    AudioSample, EmbeddingExtractorPort, ExtractedEmbedding, InferenceError,
    SpeechSynthesizerPort, ToneConverterPort,
};
use crate::domain::voice::{SpeakerEmbedding, SpeakerSelector};

/// 并发受限的协作者
pub struct ConcurrencyLimited<T: ?Sized> {
    inner: Arc<T>,
    semaphore: Semaphore,
    max_concurrent: usize,
}

impl<T: ?Sized> ConcurrencyLimited<T> {
    pub fn new(inner: Arc<T>, max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            inner,
            semaphore: Semaphore::new(max_concurrent),
            max_concurrent,
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// 当前可用 permit 数
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    async fn acquire(&self) -> Result<SemaphorePermit<'_>, InferenceError> {
        self.semaphore
            .acquire()
            .await
            .map_err(|_| InferenceError::Service("Inference limiter closed".to_string()))
    }
}

#[async_trait]
impl<T> EmbeddingExtractorPort for ConcurrencyLimited<T>
where
    T: EmbeddingExtractorPort + ?Sized,
{
    async fn extract(
        &self,
        sample: &AudioSample,
        vad: bool,
    ) -> Result<ExtractedEmbedding, InferenceError> {
        let _permit = self.acquire().await?;
        self.inner.extract(sample, vad).await
    }
}

#[async_trait]
impl<T> SpeechSynthesizerPort for ConcurrencyLimited<T>
where
    T: SpeechSynthesizerPort + ?Sized,
{
    async fn speakers(&self) -> Result<Vec<SpeakerSelector>, InferenceError> {
        self.inner.speakers().await
    }

    async fn synthesize(
        &self,
        text: &str,
        speaker: &SpeakerSelector,
        speed: f32,
        output: &Path,
    ) -> Result<(), InferenceError> {
        let _permit = self.acquire().await?;
        self.inner.synthesize(text, speaker, speed, output).await
    }

    async fn health_check(&self) -> bool {
        self.inner.health_check().await
    }
}

#[async_trait]
impl<T> ToneConverterPort for ConcurrencyLimited<T>
where
    T: ToneConverterPort + ?Sized,
{
    async fn convert(
        &self,
        source: &Path,
        source_embedding: &SpeakerEmbedding,
        target_embedding: &SpeakerEmbedding,
        output: &Path,
    ) -> Result<(), InferenceError> {
        let _permit = self.acquire().await?;
        self.inner
            .convert(source, source_embedding, target_embedding, output)
            .await
    }
}
