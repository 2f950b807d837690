//! Synthesis Cache Port - 合成结果缓存
//!
//! 叠加在编排器之上的可选内容寻址缓存，具体实现使用 Sled (LRU)

use async_trait::async_trait;
use chrono::SecondsFormat;
use thiserror::Error;

use crate::domain::synthesis::{Speed, SynthesisArtifact};
use crate::domain::voice::{IdentityKey, VoiceIdentity};

/// Cache 错误
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// 缓存统计信息
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub total_entries: usize,
    pub total_size_bytes: u64,
    pub max_size_bytes: u64,
    pub hit_count: u64,
    pub miss_count: u64,
}

/// Synthesis Cache Port
///
/// 缓存 key 以音色标识为前缀，重新克隆同名音色时可按前缀整体失效
#[async_trait]
pub trait SynthesisCachePort: Send + Sync {
    /// 获取缓存的合成产物（同时刷新 LRU 访问时间）
    async fn get(&self, cache_key: &str) -> Result<Option<SynthesisArtifact>, CacheError>;

    /// 存储合成产物，必要时执行 LRU 淘汰
    async fn put(&self, cache_key: &str, artifact: &SynthesisArtifact) -> Result<(), CacheError>;

    /// 使某音色的全部缓存失效，返回删除的条目数
    async fn invalidate_voice(&self, key: &IdentityKey) -> Result<usize, CacheError>;

    /// 获取缓存统计信息
    async fn stats(&self) -> CacheStats;
}

/// 生成缓存 key
///
/// `{identity_key}:{md5(created_at || speed || text)}`；创建时间区分同名音色的
/// 不同代，重新克隆之前开始的合成只会写入旧代的 key
pub fn generate_cache_key(text: &str, voice: &VoiceIdentity, speed: Speed) -> String {
    let mut context = md5::Context::new();
    context.consume(
        voice
            .created_at()
            .to_rfc3339_opts(SecondsFormat::Nanos, true)
            .as_bytes(),
    );
    context.consume(speed.value().to_bits().to_le_bytes());
    context.consume(text.as_bytes());
    format!("{}:{:x}", voice.key(), context.compute())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::voice::SpeakerEmbedding;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn test_cache_key_depends_on_all_inputs() {
        let created_at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let voice = |name: &str, at| {
            VoiceIdentity::restore(
                IdentityKey::parse(name).unwrap(),
                SpeakerEmbedding::from_vec(vec![0.5, 0.25]).unwrap(),
                at,
            )
        };
        let alice = voice("voice_alice", created_at);
        let bob = voice("voice_bob", created_at);
        let recloned = voice("voice_alice", created_at + Duration::milliseconds(1));
        let normal = Speed::default();
        let fast = Speed::new(1.5).unwrap();

        let base = generate_cache_key("Hello", &alice, normal);
        assert!(base.starts_with("voice_alice:"));
        assert_eq!(base, generate_cache_key("Hello", &alice, normal));
        assert_ne!(base, generate_cache_key("Hello!", &alice, normal));
        assert_ne!(base, generate_cache_key("Hello", &bob, normal));
        assert_ne!(base, generate_cache_key("Hello", &alice, fast));

        let next = generate_cache_key("Hello", &recloned, normal);
        assert!(next.starts_with("voice_alice:"));
        assert_ne!(base, next);
    }
}
