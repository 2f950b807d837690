//! Audio Codec Port - 音频探测抽象
//!
//! 编排器用它校验转换输出是可解码的 WAV，并提取编码元数据

use thiserror::Error;

/// 编解码错误
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Decoding error: {0}")]
    DecodingError(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}

/// 音频信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioInfo {
    /// 时长（毫秒）
    pub duration_ms: u64,
    /// 采样率
    pub sample_rate: u32,
    /// 声道数
    pub channels: u16,
    /// 位深度
    pub bits_per_sample: u16,
    /// PCM 数据大小（字节）
    pub data_size: usize,
}

/// Audio Probe Port
pub trait AudioProbePort: Send + Sync {
    /// 解析 WAV 头部，获取音频信息
    fn inspect(&self, wav_data: &[u8]) -> Result<AudioInfo, CodecError>;
}
