//! Revoice - 音色克隆服务
//!
//! 启动流程：配置 -> 日志 -> 推理协作者 -> 音色存储 -> 基础说话人 -> 编排器 -> HTTP

use std::sync::Arc;

use revoice::application::base_speaker::{load_reference, resolve_selector};
use revoice::application::{
    BaseSpeaker, EmbeddingExtractorPort, ScratchSpace, SpeechSynthesizerPort, SynthesisCachePort,
    SynthesisPipeline, ToneConverterPort, VoiceStorePort,
};
use revoice::config::{
    load_config, print_config, AppConfig, InferenceBackend, StorageBackend,
};
use revoice::infrastructure::adapters::{
    ConcurrencyLimited, FakeEmbeddingExtractor, FakeSpeechSynthesizer, FakeToneConverter,
    FileVoiceStore, HttpInferenceClient, HttpInferenceClientConfig, WavCodec,
};
use revoice::infrastructure::http::{AppState, HttpServer, RequestLimits, ServerConfig};
use revoice::infrastructure::persistence::sled::{SledCacheConfig, SledSynthesisCache};
use revoice::infrastructure::persistence::sqlite::{
    create_pool, run_migrations, DatabaseConfig, SqliteVoiceStore,
};

/// 推理协作者
struct Collaborators {
    extractor: Arc<dyn EmbeddingExtractorPort>,
    synthesizer: Arc<dyn SpeechSynthesizerPort>,
    converter: Arc<dyn ToneConverterPort>,
    base_speaker: BaseSpeaker,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_tracing(&config);

    tracing::info!("Revoice - 音色克隆服务");
    print_config(&config);

    let collaborators = build_collaborators(&config).await?;
    tracing::info!(
        backend = config.inference.backend.as_str(),
        base_speaker = %collaborators.base_speaker.selector(),
        "Inference collaborators ready"
    );

    let voice_store = build_voice_store(&config).await?;
    tracing::info!(backend = voice_store.backend(), "Voice store ready");

    let scratch = ScratchSpace::new(&config.storage.scratch_dir)?;

    let cache: Option<Arc<dyn SynthesisCachePort>> = if config.cache.enabled {
        let cache_config = SledCacheConfig {
            db_path: config.cache.path.clone(),
            max_size_bytes: config.cache.max_size_bytes,
        };
        Some(Arc::new(SledSynthesisCache::new(&cache_config)?))
    } else {
        None
    };

    let pipeline = Arc::new(SynthesisPipeline::new(
        voice_store.clone(),
        collaborators.synthesizer.clone(),
        collaborators.converter,
        Arc::new(WavCodec::new()),
        collaborators.base_speaker,
        scratch.clone(),
    ));

    let state = AppState::new(
        voice_store,
        collaborators.extractor,
        collaborators.synthesizer,
        pipeline,
        scratch,
        cache,
        config.inference.backend.as_str(),
        RequestLimits {
            request_timeout: config.server.request_timeout(),
            max_text_chars: config.synthesis.max_text_chars,
            vad: config.inference.vad,
        },
    );

    let server_config = ServerConfig::new(&config.server.host, config.server.port)
        .with_max_upload_bytes(config.server.max_upload_size);
    let server = HttpServer::new(server_config, state);

    // 启动服务器（带优雅关闭）
    server.run_with_shutdown(shutdown_signal()).await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

/// 初始化日志（RUST_LOG 优先于配置的级别）
fn init_tracing(config: &AppConfig) {
    let log_filter = format!(
        "{},revoice={},tower_http=debug",
        config.log.level, config.log.level
    );
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    if config.log.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// 创建推理协作者并确定基础说话人
async fn build_collaborators(config: &AppConfig) -> anyhow::Result<Collaborators> {
    let max_concurrent = config.inference.max_concurrent;
    let configured = config.synthesis.base_speaker.as_deref();

    match config.inference.backend {
        InferenceBackend::Http => {
            let client_config = HttpInferenceClientConfig::new(&config.inference.url)
                .with_timeout(config.inference.timeout_secs);
            let client = Arc::new(HttpInferenceClient::new(client_config)?);

            if !client.health_check().await {
                tracing::warn!(url = %config.inference.url, "Inference service not reachable yet");
            }

            // 三个端口共享同一组 permit
            let limited = Arc::new(ConcurrencyLimited::new(client, max_concurrent));

            let selector = resolve_selector(limited.as_ref(), configured).await?;
            let reference = load_reference(&config.synthesis.base_speakers_dir, &selector).await?;

            Ok(Collaborators {
                extractor: limited.clone(),
                synthesizer: limited.clone(),
                converter: limited,
                base_speaker: BaseSpeaker::new(selector, reference),
            })
        }
        InferenceBackend::Fake => {
            tracing::warn!("Using fake inference backend, output is not real speech");

            let synthesizer = Arc::new(FakeSpeechSynthesizer::new());
            let selector = resolve_selector(synthesizer.as_ref(), configured).await?;
            let reference = synthesizer.base_reference(&selector)?;

            Ok(Collaborators {
                extractor: Arc::new(ConcurrencyLimited::new(
                    Arc::new(FakeEmbeddingExtractor::new()),
                    max_concurrent,
                )),
                synthesizer: Arc::new(ConcurrencyLimited::new(synthesizer, max_concurrent)),
                converter: Arc::new(ConcurrencyLimited::new(
                    Arc::new(FakeToneConverter::new()),
                    max_concurrent,
                )),
                base_speaker: BaseSpeaker::new(selector, reference),
            })
        }
    }
}

/// 创建音色存储
async fn build_voice_store(config: &AppConfig) -> anyhow::Result<Arc<dyn VoiceStorePort>> {
    match config.storage.backend {
        StorageBackend::File => Ok(Arc::new(FileVoiceStore::new(&config.storage.voices_dir).await?)),
        StorageBackend::Sqlite => {
            if let Some(parent) = std::path::Path::new(&config.storage.database_path).parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let db_config = DatabaseConfig::new(&config.storage.database_path)
                .with_max_connections(config.storage.max_connections);
            let pool = create_pool(&db_config).await?;
            run_migrations(&pool).await?;
            Ok(Arc::new(SqliteVoiceStore::new(pool)))
        }
    }
}

/// 等待 Ctrl-C 或 SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Received shutdown signal");
}
