//! Speech Commands - 以克隆音色合成语音

/// 合成语音命令
#[derive(Debug, Clone)]
pub struct Speak {
    pub text: String,
    pub voice_id: Option<String>,
    pub speed: Option<f32>,
}
