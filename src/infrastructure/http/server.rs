//! HTTP Server
//!
//! Axum HTTP 服务器启动和配置

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::Router;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::middleware::{error_logging_middleware, request_id_middleware};
use super::routes::create_routes;
use super::state::AppState;

/// 默认上传上限 50MB
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// 服务器配置
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// HTTP 服务器
pub struct HttpServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl HttpServer {
    /// 创建新的 HTTP 服务器
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self {
            config,
            state: Arc::new(state),
        }
    }

    /// 构建 Router
    pub fn router(&self) -> Router {
        // CORS 配置 - 允许所有来源的跨域请求
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers([AUTHORIZATION, CONTENT_TYPE])
            .expose_headers(Any)
            .max_age(std::time::Duration::from_secs(3600));

        create_routes()
            .layer(DefaultBodyLimit::max(self.config.max_upload_bytes))
            .layer(middleware::from_fn(error_logging_middleware))
            .layer(TraceLayer::new_for_http())
            .layer(middleware::from_fn(request_id_middleware))
            .layer(cors)
            .with_state(self.state.clone())
    }

    /// 启动服务器（带优雅关闭）
    pub async fn run_with_shutdown<F>(self, shutdown_signal: F) -> Result<(), std::io::Error>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let router = self.router();
        let addr = self.config.addr();

        let listener = TcpListener::bind(&addr).await?;
        info!("Starting HTTP server on {} (with graceful shutdown)", addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use std::time::Duration;
    use tempfile::TempDir;
    use tower::util::ServiceExt;

    use crate::application::test_support::tone_wav;
    use crate::application::{BaseSpeaker, ScratchSpace, SynthesisPipeline};
    use crate::domain::voice::SpeakerSelector;
    use crate::infrastructure::adapters::{
        FakeEmbeddingExtractor, FakeSpeechSynthesizer, FakeToneConverter, FileVoiceStore,
        WavCodec,
    };
    use crate::infrastructure::http::state::RequestLimits;

    const BOUNDARY: &str = "revoice-test-boundary";

    struct TestServer {
        router: Router,
        _dir: TempDir,
    }

    async fn test_server() -> TestServer {
        let dir = tempfile::tempdir().unwrap();
        let voice_store = Arc::new(FileVoiceStore::new(dir.path().join("voices")).await.unwrap());
        let scratch = ScratchSpace::new(dir.path().join("tmp")).unwrap();

        let synthesizer = Arc::new(FakeSpeechSynthesizer::new());
        let selector = SpeakerSelector::new("EN-US", 0);
        let reference = synthesizer.base_reference(&selector).unwrap();

        let pipeline = Arc::new(SynthesisPipeline::new(
            voice_store.clone(),
            synthesizer.clone(),
            Arc::new(FakeToneConverter::new()),
            Arc::new(WavCodec::new()),
            BaseSpeaker::new(selector, reference),
            scratch.clone(),
        ));

        let state = AppState::new(
            voice_store,
            Arc::new(FakeEmbeddingExtractor::new()),
            synthesizer,
            pipeline,
            scratch,
            None,
            "fake",
            RequestLimits {
                request_timeout: Duration::from_secs(30),
                max_text_chars: 200,
                vad: true,
            },
        );
        let config = ServerConfig::default().with_max_upload_bytes(1024 * 1024);

        TestServer {
            router: HttpServer::new(config, state).router(),
            _dir: dir,
        }
    }

    fn multipart_request(field: &str, file_name: &str, data: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: audio/wav\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/clone-voice")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn speak_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/speak")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn send_json(router: &Router, request: Request<Body>) -> Value {
        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    async fn voices(router: &Router) -> Vec<String> {
        let json = send_json(router, get("/voices")).await;
        assert_eq!(json["errno"], 0);
        serde_json::from_value(json["data"]["voices"].clone()).unwrap()
    }

    #[tokio::test]
    async fn test_index_and_health() {
        let server = test_server().await;

        let json = send_json(&server.router, get("/")).await;
        assert_eq!(json["data"]["name"], "Revoice Server");

        let json = send_json(&server.router, get("/health")).await;
        assert_eq!(json["errno"], 0);
        assert_eq!(json["data"]["status"], "ok");
        assert_eq!(json["data"]["backend"], "fake");
        assert_eq!(json["data"]["inference_reachable"], true);
        assert_eq!(json["data"]["voice_store"], "file");
        assert_eq!(json["data"]["base_speaker"], "EN-US#0");
    }

    #[tokio::test]
    async fn test_clone_then_speak() {
        let server = test_server().await;
        assert!(voices(&server.router).await.is_empty());

        let json = send_json(
            &server.router,
            multipart_request("audio", "alice.wav", &tone_wav(1000, 0.5)),
        )
        .await;
        assert_eq!(json["errno"], 0);
        assert_eq!(json["data"]["voice_id"], "voice_alice");
        assert_eq!(json["data"]["message"], "Voice cloned successfully");
        assert_eq!(voices(&server.router).await, vec!["voice_alice"]);

        let json = send_json(&server.router, get("/voices/voice_alice")).await;
        assert_eq!(json["data"]["voice_id"], "voice_alice");
        assert_eq!(json["data"]["dims"], serde_json::json!([1, 256, 1]));

        let response = server
            .router
            .clone()
            .oneshot(speak_request(
                r#"{"text":"Hello there","voice_id":"voice_alice","speed":1.0}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "audio/wav");
        assert!(response.headers()["content-disposition"]
            .to_str()
            .unwrap()
            .contains("speech.wav"));
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(response.headers()["x-sample-rate"], "22050");

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..4], b"RIFF");
        let decoded = WavCodec::new().decode(&body).unwrap();
        assert!(decoded.duration_ms > 0);
    }

    #[tokio::test]
    async fn test_speak_unknown_voice() {
        let server = test_server().await;

        let json = send_json(
            &server.router,
            speak_request(r#"{"text":"Hello","voice_id":"voice_bob"}"#),
        )
        .await;
        assert_eq!(json["errno"], 404);
        assert!(json["error"].as_str().unwrap().contains("voice_bob"));
        assert!(json["data"].is_null());
    }

    #[tokio::test]
    async fn test_speak_validation() {
        let server = test_server().await;

        for body in [
            r#"{"voice_id":"voice_alice"}"#,
            r#"{"text":"   ","voice_id":"voice_alice"}"#,
            r#"{"text":"Hello"}"#,
            r#"{"text":"Hello","voice_id":"voice_alice","speed":0}"#,
            r#"{"text":"Hello","voice_id":"voice_alice","speed":0.0001}"#,
            r#"{"text":"Hello","voice_id":"voice_alice","speed":1e30}"#,
            "not json",
        ] {
            let json = send_json(&server.router, speak_request(body)).await;
            assert_eq!(json["errno"], 400, "body: {}", body);
        }

        let long_text = "a".repeat(201);
        let json = send_json(
            &server.router,
            speak_request(&format!(r#"{{"text":"{long_text}","voice_id":"voice_alice"}}"#)),
        )
        .await;
        assert_eq!(json["errno"], 400);
    }

    #[tokio::test]
    async fn test_clone_rejections() {
        let server = test_server().await;

        let json = send_json(
            &server.router,
            multipart_request("file", "alice.wav", &tone_wav(1000, 0.5)),
        )
        .await;
        assert_eq!(json["errno"], 400);

        let json = send_json(&server.router, multipart_request("audio", "alice.wav", b"")).await;
        assert_eq!(json["errno"], 400);

        let json = send_json(
            &server.router,
            multipart_request("audio", "quiet.wav", &tone_wav(1000, 0.0)),
        )
        .await;
        assert_eq!(json["errno"], 422);

        let json = send_json(
            &server.router,
            multipart_request("audio", "noise.wav", b"definitely not audio"),
        )
        .await;
        assert_eq!(json["errno"], 422);

        assert!(voices(&server.router).await.is_empty());
    }

    #[tokio::test]
    async fn test_get_voice_missing() {
        let server = test_server().await;
        let json = send_json(&server.router, get("/voices/voice_nobody")).await;
        assert_eq!(json["errno"], 404);
    }
}
