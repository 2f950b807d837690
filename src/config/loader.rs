//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::{AppConfig, InferenceBackend, StorageBackend};

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `REVOICE_`，层级分隔符 `__`）
/// 2. 配置文件（config.toml 或 config.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `REVOICE_SERVER__PORT=8080`
/// - `REVOICE_INFERENCE__BACKEND=fake`
/// - `REVOICE_INFERENCE__URL=http://openvoice:8000`
/// - `REVOICE_SYNTHESIS__BASE_SPEAKER=EN-US`
/// - `REVOICE_STORAGE__BACKEND=sqlite`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 默认值（最低优先级）
    builder = builder
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 5000)?
        .set_default("server.request_timeout_secs", 300)?
        .set_default("server.max_upload_size", 50_u64 * 1024 * 1024)?
        .set_default("inference.backend", "http")?
        .set_default("inference.url", "http://localhost:8000")?
        .set_default("inference.timeout_secs", 120)?
        .set_default("inference.max_concurrent", 2)?
        .set_default("inference.vad", true)?
        .set_default("synthesis.base_speakers_dir", "checkpoints_v2/base_speakers/ses")?
        .set_default("synthesis.max_text_chars", 5000)?
        .set_default("storage.backend", "file")?
        .set_default("storage.voices_dir", "outputs")?
        .set_default("storage.database_path", "outputs/voices.db")?
        .set_default("storage.max_connections", 5)?
        .set_default("storage.scratch_dir", "outputs/tmp")?
        .set_default("cache.enabled", false)?
        .set_default("cache.path", "outputs/cache.sled")?
        .set_default("cache.max_size_bytes", 1024_u64 * 1024 * 1024)?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 配置文件（如果存在）
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 环境变量（最高优先级）
    // 注意: 环境变量名会被转换为小写
    builder = builder.add_source(
        Environment::with_prefix("REVOICE")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "Server port cannot be 0".to_string(),
        ));
    }

    if config.server.request_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "Request timeout cannot be 0".to_string(),
        ));
    }

    if config.inference.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "Inference timeout cannot be 0".to_string(),
        ));
    }

    if config.inference.max_concurrent == 0 {
        return Err(ConfigError::ValidationError(
            "Inference max_concurrent cannot be 0".to_string(),
        ));
    }

    if config.inference.backend == InferenceBackend::Http && config.inference.url.is_empty() {
        return Err(ConfigError::ValidationError(
            "Inference URL cannot be empty".to_string(),
        ));
    }

    if config.synthesis.max_text_chars == 0 {
        return Err(ConfigError::ValidationError(
            "max_text_chars cannot be 0".to_string(),
        ));
    }

    if config.storage.backend == StorageBackend::Sqlite && config.storage.database_path.is_empty() {
        return Err(ConfigError::ValidationError(
            "Database path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Server: {}:{}", config.server.host, config.server.port);
    tracing::info!("Request Timeout: {}s", config.server.request_timeout_secs);
    tracing::info!("Max Upload Size: {} bytes", config.server.max_upload_size);
    tracing::info!("Inference Backend: {}", config.inference.backend.as_str());
    if config.inference.backend == InferenceBackend::Http {
        tracing::info!("Inference URL: {}", config.inference.url);
        tracing::info!("Inference Timeout: {}s", config.inference.timeout_secs);
    }
    tracing::info!("Inference Max Concurrent: {}", config.inference.max_concurrent);
    tracing::info!("VAD: {}", config.inference.vad);
    tracing::info!(
        "Base Speaker: {}",
        config.synthesis.base_speaker.as_deref().unwrap_or("(first declared)")
    );
    tracing::info!("Storage Backend: {:?}", config.storage.backend);
    match config.storage.backend {
        StorageBackend::File => tracing::info!("Voices Directory: {:?}", config.storage.voices_dir),
        StorageBackend::Sqlite => tracing::info!("Database: {}", config.storage.database_path),
    }
    tracing::info!("Scratch Directory: {:?}", config.storage.scratch_dir);
    tracing::info!("Cache Enabled: {}", config.cache.enabled);
    if config.cache.enabled {
        tracing::info!("Cache Path: {}", config.cache.path);
    }
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_validation_passes_for_valid_config() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validation_error_for_zero_port() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_zero_timeouts() {
        let mut config = AppConfig::default();
        config.server.request_timeout_secs = 0;
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.inference.timeout_secs = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_zero_concurrency() {
        let mut config = AppConfig::default();
        config.inference.max_concurrent = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_empty_url_only_matters_for_http_backend() {
        let mut config = AppConfig::default();
        config.inference.url = String::new();
        assert!(validate_config(&config).is_err());

        config.inference.backend = InferenceBackend::Fake;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validation_error_for_zero_text_limit() {
        let mut config = AppConfig::default();
        config.synthesis.max_text_chars = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("revoice.toml");
        std::fs::write(
            &path,
            r#"
[server]
port = 6000

[inference]
backend = "fake"
max_concurrent = 1

[synthesis]
base_speaker = "EN-BR"

[storage]
backend = "sqlite"
database_path = "/var/lib/revoice/voices.db"

[cache]
enabled = true
"#,
        )
        .unwrap();

        let config = load_config_from_path(Some(&path)).unwrap();
        assert_eq!(config.server.port, 6000);
        assert_eq!(config.server.request_timeout_secs, 300);
        assert_eq!(config.inference.backend, InferenceBackend::Fake);
        assert_eq!(config.inference.max_concurrent, 1);
        assert_eq!(config.synthesis.base_speaker.as_deref(), Some("EN-BR"));
        assert_eq!(
            config.synthesis.base_speakers_dir,
            PathBuf::from("checkpoints_v2/base_speakers/ses")
        );
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.storage.database_path, "/var/lib/revoice/voices.db");
        assert!(config.cache.enabled);
        assert_eq!(config.cache.max_size_bytes, 1024 * 1024 * 1024);
    }

    #[test]
    fn test_invalid_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("revoice.toml");
        std::fs::write(&path, "[inference]\nmax_concurrent = 0\n").unwrap();

        assert!(matches!(
            load_config_from_path(Some(&path)),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_missing_file_rejected() {
        let path = Path::new("/nonexistent/revoice.toml");
        assert!(matches!(
            load_config_from_path(Some(path)),
            Err(ConfigError::LoadError(_))
        ));
    }
}
