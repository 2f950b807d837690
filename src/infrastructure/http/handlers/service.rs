//! Service Handlers
//!
//! 服务描述与健康检查

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::infrastructure::http::dto::{ApiResponse, EndpointsInfo, HealthData, ServiceInfo};
use crate::infrastructure::http::state::AppState;

/// 服务描述
pub async fn index() -> Json<ApiResponse<ServiceInfo>> {
    Json(ApiResponse::success(ServiceInfo {
        name: "Revoice Server",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: EndpointsInfo {
            clone_voice: "POST /clone-voice (multipart field: audio)",
            speak: "POST /speak (json: text, voice_id, speed)",
            voices: "GET /voices",
            health: "GET /health",
        },
    }))
}

/// 健康检查
///
/// 推理协作者不可达时服务本身仍视为存活，只在 `inference_reachable` 中体现
pub async fn health(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthData>> {
    let inference_reachable = state.synthesizer.health_check().await;
    if !inference_reachable {
        tracing::warn!(backend = %state.inference_backend, "Inference service unreachable");
    }

    Json(ApiResponse::success(HealthData {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        backend: state.inference_backend.clone(),
        inference_reachable,
        voice_store: state.voice_store.backend(),
        base_speaker: state.base_speaker.clone(),
    }))
}
