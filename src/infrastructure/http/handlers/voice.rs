//! Voice HTTP Handlers

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use std::sync::Arc;

use crate::application::{CloneVoice, GetVoice, ListVoices};
use crate::infrastructure::http::dto::{ApiResponse, CloneVoiceData, VoiceDetail, VoicesData};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 上传样本音频的 multipart 字段名
const AUDIO_FIELD: &str = "audio";

/// 克隆音色
pub async fn clone_voice(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<CloneVoiceData>>, ApiError> {
    let mut file_name: Option<String> = None;
    let mut audio_data: Option<Vec<u8>> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        ApiError::BadRequest(format!("Failed to read multipart field: {}", e))
    })? {
        if field.name() != Some(AUDIO_FIELD) {
            continue;
        }

        file_name = field.file_name().map(|s| s.to_string());
        audio_data = Some(
            field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("Failed to read audio: {}", e)))?
                .to_vec(),
        );
    }

    let audio_data =
        audio_data.ok_or_else(|| ApiError::BadRequest("No audio file provided".to_string()))?;

    let response = state
        .clone_voice_handler
        .handle(CloneVoice {
            file_name,
            audio_data,
        })
        .await?;

    tracing::info!(
        voice_id = %response.identity_key,
        sample_name = %response.sample_name,
        "Voice cloned"
    );

    Ok(Json(ApiResponse::success(CloneVoiceData {
        voice_id: response.identity_key,
        message: "Voice cloned successfully",
    })))
}

/// 列出所有音色
pub async fn list_voices(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<VoicesData>>, ApiError> {
    let voices = state.list_voices_handler.handle(ListVoices).await?;
    Ok(Json(ApiResponse::success(VoicesData { voices })))
}

/// 获取音色详情
pub async fn get_voice(
    State(state): State<Arc<AppState>>,
    Path(voice_id): Path<String>,
) -> Result<Json<ApiResponse<VoiceDetail>>, ApiError> {
    let voice = state.get_voice_handler.handle(GetVoice { voice_id }).await?;
    Ok(Json(ApiResponse::success(voice.into())))
}
