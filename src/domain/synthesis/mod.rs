//! Synthesis Context - 合成限界上下文
//!
//! 职责:
//! - 合成请求校验（文本、语速）
//! - 合成产物及其编码元数据

mod value_objects;

pub use value_objects::{
    AudioFormat, Speed, SynthesisArtifact, SynthesisRequest, MAX_SPEED, MIN_SPEED,
};
