//! Voice Store Port - 音色标识存储
//!
//! 定义音色嵌入向量持久化的抽象接口，具体实现在 infrastructure/persistence 层

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::voice::{IdentityKey, SampleName, SpeakerEmbedding, VoiceIdentity};

/// 存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Identity not found: {0}")]
    NotFound(IdentityKey),

    #[error("Storage write failed: {0}")]
    Write(String),

    #[error("Storage read failed: {0}")]
    Read(String),

    #[error("Corrupt identity artifact: {0}")]
    Corrupt(String),
}

/// Voice Store Port
///
/// 每个音色标识对应一份持久化的嵌入向量
///
/// 一致性约定:
/// - create 按 key 原子写入，读者永远看不到写了一半的数据
/// - 同 key 重复 create 覆盖旧值（后写者胜，无版本）
/// - 无内存缓存，每次 lookup 都是一次新的读取
#[async_trait]
pub trait VoiceStorePort: Send + Sync {
    /// 写入嵌入向量，返回由样本名称推导的音色标识
    async fn create(
        &self,
        sample_name: &SampleName,
        embedding: &SpeakerEmbedding,
    ) -> Result<IdentityKey, StoreError>;

    /// 读取嵌入向量
    async fn lookup(&self, key: &IdentityKey) -> Result<SpeakerEmbedding, StoreError> {
        self.get(key).await.map(VoiceIdentity::into_embedding)
    }

    /// 读取完整音色记录（包含创建时间）
    async fn get(&self, key: &IdentityKey) -> Result<VoiceIdentity, StoreError>;

    /// 列出当前所有音色标识（快照，按字典序）
    async fn list(&self) -> Result<Vec<IdentityKey>, StoreError>;

    /// 存储后端名称（用于日志和健康检查）
    fn backend(&self) -> &'static str;
}
