//! 应用层错误定义
//!
//! 统一的命令/查询错误类型

use std::time::Duration;
use thiserror::Error;

use crate::application::ports::{InferenceError, StoreError};
use crate::domain::voice::IdentityKey;

/// 错误类别
///
/// 调用方据此决定：先克隆、修改输入、还是整体重试
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// 音色不存在，先克隆
    NotFound,
    /// 输入有误，修改输入前重试无意义
    BadInput,
    /// 瞬时或内部错误，可整体重试
    Retryable,
}

/// 应用层错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 校验错误（空文本、缺失字段等）
    #[error("Validation error: {0}")]
    Validation(String),

    /// 嵌入提取失败
    #[error("Extraction failed: {0}")]
    Extraction(#[source] InferenceError),

    /// 音色写入失败
    #[error("Storage write failed: {0}")]
    StorageWrite(String),

    /// 音色不存在
    #[error("Voice not found: {0}")]
    VoiceNotFound(String),

    /// 基础合成失败
    #[error("Synthesis failed: {0}")]
    Synthesis(#[source] InferenceError),

    /// 音色转换失败
    #[error("Conversion failed: {0}")]
    Conversion(#[source] InferenceError),

    /// 请求超时
    #[error("Request timed out after {}s", .0.as_secs_f32())]
    Timeout(Duration),

    /// 存储读取错误
    #[error("Storage error: {0}")]
    Storage(String),

    /// 内部错误
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApplicationError {
    /// 创建验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// 创建音色不存在错误
    pub fn voice_not_found(key: impl Into<String>) -> Self {
        Self::VoiceNotFound(key.into())
    }

    /// 创建内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// 错误类别
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::VoiceNotFound(_) => ErrorCategory::NotFound,
            Self::Validation(_) => ErrorCategory::BadInput,
            Self::Extraction(e) | Self::Synthesis(e) | Self::Conversion(e) => {
                if e.is_input_rejection() {
                    ErrorCategory::BadInput
                } else {
                    ErrorCategory::Retryable
                }
            }
            Self::StorageWrite(_) | Self::Timeout(_) | Self::Storage(_) | Self::Internal(_) => {
                ErrorCategory::Retryable
            }
        }
    }

    /// 读取侧存储错误映射：不存在转为 VoiceNotFound
    pub fn from_lookup(key: &IdentityKey, err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => Self::VoiceNotFound(key.to_string()),
            other => Self::Storage(other.to_string()),
        }
    }
}

impl From<std::io::Error> for ApplicationError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(format!("IO error: {}", err))
    }
}
