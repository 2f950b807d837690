//! Speech HTTP Handlers
//!
//! 成功时直接返回音频字节（附件形式），失败时返回统一错误 JSON

use axum::{
    extract::{rejection::JsonRejection, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::application::Speak;
use crate::infrastructure::http::dto::SpeakRequest;
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 合成语音
pub async fn speak(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SpeakRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) =
        payload.map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))?;

    let artifact = state
        .speak_handler
        .handle(Speak {
            text: request.text,
            voice_id: request.voice_id,
            speed: request.speed,
        })
        .await?;

    let headers = [
        (header::CONTENT_TYPE, artifact.format.mime_type().to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"speech.{}\"", artifact.format.extension()),
        ),
        (header::CONTENT_LENGTH, artifact.size_bytes().to_string()),
        (
            header::HeaderName::from_static("x-sample-rate"),
            artifact.sample_rate.to_string(),
        ),
        (
            header::HeaderName::from_static("x-duration-ms"),
            artifact.duration_ms.to_string(),
        ),
    ];

    Ok((headers, artifact.audio_data).into_response())
}
