//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,

    /// 推理协作者配置
    #[serde(default)]
    pub inference: InferenceConfig,

    /// 合成配置
    #[serde(default)]
    pub synthesis: SynthesisConfig,

    /// 存储配置
    #[serde(default)]
    pub storage: StorageConfig,

    /// 合成缓存配置
    #[serde(default)]
    pub cache: CacheConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,

    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,

    /// 单个请求的墙钟超时（秒）
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// 上传文件最大大小（字节）
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_request_timeout() -> u64 {
    300
}

fn default_max_upload_size() -> usize {
    50 * 1024 * 1024 // 50 MB
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            max_upload_size: default_max_upload_size(),
        }
    }
}

impl ServerConfig {
    /// 获取服务器地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// 推理后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InferenceBackend {
    /// 外部推理服务
    #[default]
    Http,
    /// 进程内确定性实现（开发与测试用）
    Fake,
}

impl InferenceBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            InferenceBackend::Http => "http",
            InferenceBackend::Fake => "fake",
        }
    }
}

/// 推理协作者配置
#[derive(Debug, Clone, Deserialize)]
pub struct InferenceConfig {
    #[serde(default)]
    pub backend: InferenceBackend,

    /// 推理服务基础 URL
    #[serde(default = "default_inference_url")]
    pub url: String,

    /// 单次推理调用超时（秒）
    #[serde(default = "default_inference_timeout")]
    pub timeout_secs: u64,

    /// 同时进行的推理调用上限
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// 提取嵌入前是否做语音活动检测
    #[serde(default = "default_vad")]
    pub vad: bool,
}

fn default_inference_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_inference_timeout() -> u64 {
    120
}

fn default_max_concurrent() -> usize {
    2
}

fn default_vad() -> bool {
    true
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            backend: InferenceBackend::default(),
            url: default_inference_url(),
            timeout_secs: default_inference_timeout(),
            max_concurrent: default_max_concurrent(),
            vad: default_vad(),
        }
    }
}

/// 合成配置
#[derive(Debug, Clone, Deserialize)]
pub struct SynthesisConfig {
    /// 基础说话人名称；未设置时使用合成器声明的第一个
    #[serde(default)]
    pub base_speaker: Option<String>,

    /// 基础说话人参考嵌入目录
    #[serde(default = "default_base_speakers_dir")]
    pub base_speakers_dir: PathBuf,

    /// 合成文本最大字符数
    #[serde(default = "default_max_text_chars")]
    pub max_text_chars: usize,
}

fn default_base_speakers_dir() -> PathBuf {
    PathBuf::from("checkpoints_v2/base_speakers/ses")
}

fn default_max_text_chars() -> usize {
    5000
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            base_speaker: None,
            base_speakers_dir: default_base_speakers_dir(),
            max_text_chars: default_max_text_chars(),
        }
    }
}

/// 音色存储后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Sqlite,
}

/// 存储配置
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// 音色文件目录（file 后端）
    #[serde(default = "default_voices_dir")]
    pub voices_dir: PathBuf,

    /// 数据库文件路径（sqlite 后端）
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// 最大连接数
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// 请求级临时目录根
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,
}

fn default_voices_dir() -> PathBuf {
    PathBuf::from("outputs")
}

fn default_database_path() -> String {
    "outputs/voices.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_scratch_dir() -> PathBuf {
    PathBuf::from("outputs/tmp")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            voices_dir: default_voices_dir(),
            database_path: default_database_path(),
            max_connections: default_max_connections(),
            scratch_dir: default_scratch_dir(),
        }
    }
}

/// 合成缓存配置
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Sled 数据库路径
    #[serde(default = "default_cache_path")]
    pub path: String,

    /// 缓存容量上限（字节）
    #[serde(default = "default_cache_max_size")]
    pub max_size_bytes: u64,
}

fn default_cache_path() -> String {
    "outputs/cache.sled".to_string()
}

fn default_cache_max_size() -> u64 {
    1024 * 1024 * 1024 // 1 GB
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_cache_path(),
            max_size_bytes: default_cache_max_size(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.request_timeout(), Duration::from_secs(300));
        assert_eq!(config.inference.backend, InferenceBackend::Http);
        assert_eq!(config.inference.url, "http://localhost:8000");
        assert_eq!(config.storage.backend, StorageBackend::File);
        assert_eq!(config.storage.voices_dir, PathBuf::from("outputs"));
        assert!(config.synthesis.base_speaker.is_none());
        assert!(!config.cache.enabled);
    }

    #[test]
    fn test_server_addr() {
        let config = ServerConfig::default();
        assert_eq!(config.addr(), "0.0.0.0:5000");
    }

    #[test]
    fn test_backend_names() {
        assert_eq!(InferenceBackend::Http.as_str(), "http");
        assert_eq!(InferenceBackend::Fake.as_str(), "fake");
    }
}
