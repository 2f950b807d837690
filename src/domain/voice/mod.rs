//! Voice Context - 音色限界上下文
//!
//! 职责:
//! - 音色标识推导与校验
//! - 说话人嵌入向量
//! - 基础说话人选择器

mod aggregate;
mod value_objects;

pub use aggregate::VoiceIdentity;
pub use value_objects::{
    IdentityKey, SampleName, SpeakerEmbedding, SpeakerSelector, IDENTITY_KEY_PREFIX,
};
