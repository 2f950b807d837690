//! Voice Context - Aggregate Root

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{IdentityKey, SampleName, SpeakerEmbedding};

/// VoiceIdentity 聚合根
///
/// 不变量:
/// - identity_key 由样本名称推导，创建后不变
/// - 嵌入向量只能整体替换（同名重新克隆），不做原地修改
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceIdentity {
    key: IdentityKey,
    embedding: SpeakerEmbedding,
    created_at: DateTime<Utc>,
}

impl VoiceIdentity {
    /// 由克隆结果创建新音色
    pub fn new(sample_name: &SampleName, embedding: SpeakerEmbedding) -> Self {
        Self {
            key: IdentityKey::for_sample(sample_name),
            embedding,
            created_at: Utc::now(),
        }
    }

    /// 从存储重建
    pub fn restore(key: IdentityKey, embedding: SpeakerEmbedding, created_at: DateTime<Utc>) -> Self {
        Self {
            key,
            embedding,
            created_at,
        }
    }

    pub fn key(&self) -> &IdentityKey {
        &self.key
    }

    pub fn embedding(&self) -> &SpeakerEmbedding {
        &self.embedding
    }

    pub fn into_embedding(self) -> SpeakerEmbedding {
        self.embedding
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_identity_creation() {
        let name = SampleName::new("alice").unwrap();
        let embedding = SpeakerEmbedding::from_vec(vec![0.5, 0.5]).unwrap();
        let voice = VoiceIdentity::new(&name, embedding.clone());

        assert_eq!(voice.key().as_str(), "voice_alice");
        assert_eq!(voice.embedding(), &embedding);
        assert!(voice.created_at() <= Utc::now());
    }
}
