//! Synthesis Context - Value Objects

use serde::{Deserialize, Serialize};

/// 音频格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Wav,
    Mp3,
    Flac,
    Ogg,
}

impl AudioFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "wav" => Some(Self::Wav),
            "mp3" => Some(Self::Mp3),
            "flac" => Some(Self::Flac),
            "ogg" => Some(Self::Ogg),
            _ => None,
        }
    }

    /// 从文件名推断格式
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        file_name
            .rsplit_once('.')
            .and_then(|(_, ext)| Self::from_extension(ext))
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
            Self::Flac => "flac",
            Self::Ogg => "ogg",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Wav => "audio/wav",
            Self::Mp3 => "audio/mpeg",
            Self::Flac => "audio/flac",
            Self::Ogg => "audio/ogg",
        }
    }
}

/// 语速下限
pub const MIN_SPEED: f32 = 0.1;
/// 语速上限
pub const MAX_SPEED: f32 = 10.0;

/// 语速倍率
///
/// 不变量: 有限值，位于 [MIN_SPEED, MAX_SPEED]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Speed(f32);

impl Speed {
    pub fn new(value: f32) -> Result<Self, &'static str> {
        if !value.is_finite() || value <= 0.0 {
            return Err("语速必须为正数");
        }
        if !(MIN_SPEED..=MAX_SPEED).contains(&value) {
            return Err("语速超出范围 0.1 ~ 10");
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> f32 {
        self.0
    }
}

impl Default for Speed {
    fn default() -> Self {
        Self(1.0)
    }
}

impl std::fmt::Display for Speed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 合成请求（瞬态，不持久化）
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    text: String,
    identity_key: String,
    speed: Speed,
}

impl SynthesisRequest {
    /// 创建并校验合成请求
    ///
    /// identity_key 保持原样，由编排器负责解析（无法解析视为音色不存在）
    pub fn new(
        text: impl Into<String>,
        identity_key: impl Into<String>,
        speed: Speed,
        max_text_chars: usize,
    ) -> Result<Self, &'static str> {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err("合成文本不能为空");
        }
        if trimmed.chars().count() > max_text_chars {
            return Err("合成文本过长");
        }

        let identity_key = identity_key.into();
        if identity_key.trim().is_empty() {
            return Err("音色标识不能为空");
        }

        Ok(Self {
            text: trimmed.to_string(),
            identity_key: identity_key.trim().to_string(),
            speed,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn identity_key(&self) -> &str {
        &self.identity_key
    }

    pub fn speed(&self) -> Speed {
        self.speed
    }
}

/// 合成产物
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisArtifact {
    /// 音频数据
    pub audio_data: Vec<u8>,
    /// 编码格式
    pub format: AudioFormat,
    /// 采样率
    pub sample_rate: u32,
    /// 声道数
    pub channels: u16,
    /// 时长（毫秒）
    pub duration_ms: u64,
}

impl SynthesisArtifact {
    pub fn size_bytes(&self) -> usize {
        self.audio_data.len()
    }
}
