//! Domain Layer - 领域层
//!
//! 包含两个限界上下文:
//! - Voice Context: 音色标识与嵌入向量
//! - Synthesis Context: 合成请求与合成产物

pub mod synthesis;
pub mod voice;
