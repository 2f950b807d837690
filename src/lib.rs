//! Revoice - 音色克隆与语音合成服务
//!
//! 架构设计: DDD + CQRS + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Voice Context: 音色标识、说话人嵌入
//! - Synthesis Context: 合成请求、语速、合成产物
//!
//! 应用层 (application/):
//! - Ports: 端口定义（VoiceStore, EmbeddingExtractor, SpeechSynthesizer, ToneConverter, SynthesisCache）
//! - Commands: 克隆音色、合成语音
//! - Queries: 音色列表、详情
//! - Pipeline: 解析音色 -> 基础合成 -> 音色转换
//!
//! 基础设施层 (infrastructure/):
//! - HTTP: RESTful API
//! - Adapters: 推理服务客户端、Fake 推理实现、WAV 编解码、文件音色存储
//! - Persistence: SQLite 音色存储 + Sled 合成缓存

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
