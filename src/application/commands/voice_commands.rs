//! Voice Commands - 音色克隆

/// 克隆音色命令
#[derive(Debug, Clone)]
pub struct CloneVoice {
    /// 上传时的文件名（缺省按 wav 处理）
    pub file_name: Option<String>,
    pub audio_data: Vec<u8>,
}

/// 克隆音色响应
#[derive(Debug, Clone)]
pub struct CloneVoiceResponse {
    pub identity_key: String,
    pub sample_name: String,
}
