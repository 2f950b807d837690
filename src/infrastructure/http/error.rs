//! HTTP Error Handling
//!
//! 业务错误统一返回 HTTP 200 + `{errno, error, data}`，errno 沿用 HTTP 状态码语义

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::application::{ApplicationError, InferenceError};

/// 统一错误响应格式
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub errno: i32,
    pub error: String,
    pub data: Option<()>,
}

impl ErrorResponse {
    pub fn new(errno: i32, error: impl Into<String>) -> Self {
        Self {
            errno,
            error: error.into(),
            data: None,
        }
    }
}

/// 错误码定义
pub mod errno {
    pub const BAD_REQUEST: i32 = 400;
    pub const NOT_FOUND: i32 = 404;
    pub const UNPROCESSABLE: i32 = 422;
    pub const INTERNAL_ERROR: i32 = 500;
    pub const SERVICE_UNAVAILABLE: i32 = 503;
    pub const GATEWAY_TIMEOUT: i32 = 504;
}

/// API 错误
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    /// 协作者拒绝了输入（如样本中无语音）
    Unprocessable(String),
    Internal(String),
    ServiceUnavailable(String),
    Timeout(String),
}

impl ApiError {
    pub fn errno(&self) -> i32 {
        match self {
            ApiError::NotFound(_) => errno::NOT_FOUND,
            ApiError::BadRequest(_) => errno::BAD_REQUEST,
            ApiError::Unprocessable(_) => errno::UNPROCESSABLE,
            ApiError::Internal(_) => errno::INTERNAL_ERROR,
            ApiError::ServiceUnavailable(_) => errno::SERVICE_UNAVAILABLE,
            ApiError::Timeout(_) => errno::GATEWAY_TIMEOUT,
        }
    }

    fn message(&self) -> &str {
        match self {
            ApiError::NotFound(msg)
            | ApiError::BadRequest(msg)
            | ApiError::Unprocessable(msg)
            | ApiError::Internal(msg)
            | ApiError::ServiceUnavailable(msg)
            | ApiError::Timeout(msg) => msg,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let errno = self.errno();
        let msg = self.message().to_string();

        match &self {
            ApiError::NotFound(_) => {
                tracing::warn!(errno, error = %msg, "Resource not found")
            }
            ApiError::BadRequest(_) | ApiError::Unprocessable(_) => {
                tracing::warn!(errno, error = %msg, "Bad request")
            }
            ApiError::Internal(_) => {
                tracing::error!(errno, error = %msg, "Internal server error")
            }
            ApiError::ServiceUnavailable(_) => {
                tracing::error!(errno, error = %msg, "Service unavailable")
            }
            ApiError::Timeout(_) => {
                tracing::error!(errno, error = %msg, "Request timed out")
            }
        }

        (StatusCode::OK, Json(ErrorResponse::new(errno, msg))).into_response()
    }
}

/// 协作者错误：拒绝输入为 422，其余视为服务暂不可用
fn collaborator_error(message: String, source: &InferenceError) -> ApiError {
    if source.is_input_rejection() {
        ApiError::Unprocessable(message)
    } else {
        ApiError::ServiceUnavailable(message)
    }
}

impl From<ApplicationError> for ApiError {
    fn from(e: ApplicationError) -> Self {
        let message = e.to_string();
        match e {
            ApplicationError::Validation(msg) => ApiError::BadRequest(msg),
            ApplicationError::VoiceNotFound(key) => ApiError::NotFound(format!(
                "Voice not found: {}. Please clone a voice first.",
                key
            )),
            ApplicationError::Extraction(ref source)
            | ApplicationError::Synthesis(ref source)
            | ApplicationError::Conversion(ref source) => collaborator_error(message, source),
            ApplicationError::Timeout(_) => ApiError::Timeout(message),
            ApplicationError::StorageWrite(_)
            | ApplicationError::Storage(_)
            | ApplicationError::Internal(_) => ApiError::Internal(message),
        }
    }
}
