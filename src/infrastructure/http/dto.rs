//! Data Transfer Objects

use serde::{Deserialize, Serialize};

use crate::application::VoiceResponse;

// ============================================================================
// 统一响应结构
// ============================================================================

/// 统一 API 响应格式
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub errno: i32,
    pub error: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 成功响应
    pub fn success(data: T) -> Self {
        Self {
            errno: 0,
            error: String::new(),
            data: Some(data),
        }
    }
}

// ============================================================================
// Service DTOs
// ============================================================================

#[derive(Debug, Serialize)]
pub struct EndpointsInfo {
    pub clone_voice: &'static str,
    pub speak: &'static str,
    pub voices: &'static str,
    pub health: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub endpoints: EndpointsInfo,
}

#[derive(Debug, Serialize)]
pub struct HealthData {
    pub status: &'static str,
    pub version: &'static str,
    pub backend: String,
    pub inference_reachable: bool,
    pub voice_store: &'static str,
    pub base_speaker: String,
}

// ============================================================================
// Voice DTOs
// ============================================================================

#[derive(Debug, Serialize)]
pub struct CloneVoiceData {
    pub voice_id: String,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct VoicesData {
    pub voices: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct VoiceDetail {
    pub voice_id: String,
    pub dims: Vec<usize>,
    pub created_at: String,
}

impl From<VoiceResponse> for VoiceDetail {
    fn from(voice: VoiceResponse) -> Self {
        Self {
            voice_id: voice.identity_key,
            dims: voice.dims,
            created_at: voice.created_at,
        }
    }
}

// ============================================================================
// Speech DTOs
// ============================================================================

/// 合成请求；text 缺省为空串，交给应用层统一校验
#[derive(Debug, Deserialize)]
pub struct SpeakRequest {
    #[serde(default)]
    pub text: String,
    pub voice_id: Option<String>,
    pub speed: Option<f32>,
}
