//! Inference Adapters - 推理协作者实现
//!
//! - HTTP 推理服务客户端（生产）
//! - 本地 Fake 实现（开发、测试）
//! - 并发限制包装

mod concurrency;
mod fake;
mod http_inference_client;

pub use concurrency::ConcurrencyLimited;
pub use fake::{FakeEmbeddingExtractor, FakeSpeechSynthesizer, FakeToneConverter};
pub use http_inference_client::{HttpInferenceClient, HttpInferenceClientConfig};
