//! File Voice Store - 文件系统音色存储
//!
//! 每个音色一个文件 `{voices_dir}/{identity_key}.emb`（bincode 编码）。
//! 写入流程：同目录隐藏临时文件 -> fsync -> 原子 rename 覆盖目标，
//! 读者要么看到旧文件要么看到新文件，不会看到半写的内容

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;

use crate::application::ports::{StoreError, VoiceStorePort};
use crate::domain::voice::{IdentityKey, SampleName, SpeakerEmbedding, VoiceIdentity};

const VOICE_FILE_EXT: &str = "emb";
const TEMP_FILE_SUFFIX: &str = ".tmp";

/// 持久化记录
#[derive(Debug, Serialize, Deserialize)]
struct StoredVoice {
    dims: Vec<usize>,
    values: Vec<f32>,
    created_at: DateTime<Utc>,
}

/// 文件系统音色存储
pub struct FileVoiceStore {
    /// 存储根目录
    base_dir: PathBuf,
    /// 按 key 串行化写入，不同 key 互不阻塞
    locks: DashMap<IdentityKey, Arc<Mutex<()>>>,
}

impl FileVoiceStore {
    /// 创建文件存储（目录不存在则创建，并清理崩溃遗留的临时文件）
    pub async fn new(base_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let base_dir = base_dir.as_ref().to_path_buf();

        fs::create_dir_all(&base_dir)
            .await
            .map_err(|e| StoreError::Write(format!("{}: {}", base_dir.display(), e)))?;

        let store = Self {
            base_dir,
            locks: DashMap::new(),
        };
        let removed = store.remove_stale_temp_files().await?;
        if removed > 0 {
            tracing::warn!(removed, dir = %store.base_dir.display(), "Removed stale voice temp files");
        }

        Ok(store)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn voice_path(&self, key: &IdentityKey) -> PathBuf {
        self.base_dir.join(format!("{}.{}", key, VOICE_FILE_EXT))
    }

    fn lock_for(&self, key: &IdentityKey) -> Arc<Mutex<()>> {
        self.locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn remove_stale_temp_files(&self) -> Result<usize, StoreError> {
        let mut removed = 0;
        let mut entries = fs::read_dir(&self.base_dir)
            .await
            .map_err(|e| StoreError::Read(e.to_string()))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::Read(e.to_string()))?
        {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with('.') && name.ends_with(TEMP_FILE_SUFFIX) {
                fs::remove_file(entry.path())
                    .await
                    .map_err(|e| StoreError::Write(e.to_string()))?;
                removed += 1;
            }
        }

        Ok(removed)
    }

    /// 临时文件 + fsync + rename
    fn write_atomic(dir: &Path, target: &Path, prefix: &str, data: &[u8]) -> std::io::Result<()> {
        let mut temp = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(TEMP_FILE_SUFFIX)
            .tempfile_in(dir)?;
        temp.write_all(data)?;
        temp.as_file().sync_all()?;
        temp.persist(target).map_err(|e| e.error)?;
        Ok(())
    }
}

#[async_trait]
impl VoiceStorePort for FileVoiceStore {
    async fn create(
        &self,
        sample_name: &SampleName,
        embedding: &SpeakerEmbedding,
    ) -> Result<IdentityKey, StoreError> {
        let key = IdentityKey::for_sample(sample_name);
        let record = StoredVoice {
            dims: embedding.dims().to_vec(),
            values: embedding.values().to_vec(),
            created_at: Utc::now(),
        };
        let data = bincode::serialize(&record).map_err(|e| StoreError::Write(e.to_string()))?;

        let lock = self.lock_for(&key);
        let _guard = lock.lock().await;

        let dir = self.base_dir.clone();
        let target = self.voice_path(&key);
        let prefix = format!(".{}-", key);
        tokio::task::spawn_blocking(move || Self::write_atomic(&dir, &target, &prefix, &data))
            .await
            .map_err(|e| StoreError::Write(e.to_string()))?
            .map_err(|e| StoreError::Write(format!("{}: {}", key, e)))?;

        tracing::debug!(identity_key = %key, len = embedding.len(), "Voice identity written");

        Ok(key)
    }

    async fn get(&self, key: &IdentityKey) -> Result<VoiceIdentity, StoreError> {
        let data = match fs::read(self.voice_path(key)).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(key.clone()))
            }
            Err(e) => return Err(StoreError::Read(format!("{}: {}", key, e))),
        };

        let record: StoredVoice = bincode::deserialize(&data)
            .map_err(|e| StoreError::Corrupt(format!("{}: {}", key, e)))?;
        let embedding = SpeakerEmbedding::new(record.dims, record.values)
            .map_err(|e| StoreError::Corrupt(format!("{}: {}", key, e)))?;

        Ok(VoiceIdentity::restore(key.clone(), embedding, record.created_at))
    }

    async fn list(&self) -> Result<Vec<IdentityKey>, StoreError> {
        let mut keys = Vec::new();
        let mut entries = fs::read_dir(&self.base_dir)
            .await
            .map_err(|e| StoreError::Read(e.to_string()))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::Read(e.to_string()))?
        {
            let path = entry.path();
            if path.extension().map_or(true, |ext| ext != VOICE_FILE_EXT) {
                continue;
            }
            if let Some(key) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| IdentityKey::parse(stem).ok())
            {
                keys.push(key);
            }
        }

        keys.sort();
        Ok(keys)
    }

    fn backend(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn embedding(value: f32) -> SpeakerEmbedding {
        SpeakerEmbedding::new(vec![1, 8, 1], vec![value; 8]).unwrap()
    }

    fn name(raw: &str) -> SampleName {
        SampleName::new(raw).unwrap()
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let dir = tempdir().unwrap();
        let store = FileVoiceStore::new(dir.path()).await.unwrap();

        let key = store.create(&name("alice"), &embedding(0.25)).await.unwrap();
        assert_eq!(key.as_str(), "voice_alice");
        assert!(dir.path().join("voice_alice.emb").exists());

        assert_eq!(store.lookup(&key).await.unwrap(), embedding(0.25));

        // 新实例同样可读（持久化）
        let reopened = FileVoiceStore::new(dir.path()).await.unwrap();
        let voice = reopened.get(&key).await.unwrap();
        assert_eq!(voice.embedding(), &embedding(0.25));
    }

    #[tokio::test]
    async fn test_lookup_missing() {
        let dir = tempdir().unwrap();
        let store = FileVoiceStore::new(dir.path()).await.unwrap();
        let key = IdentityKey::parse("voice_bob").unwrap();
        assert!(matches!(store.lookup(&key).await, Err(StoreError::NotFound(k)) if k == key));
    }

    #[tokio::test]
    async fn test_create_overwrites_existing() {
        let dir = tempdir().unwrap();
        let store = FileVoiceStore::new(dir.path()).await.unwrap();

        store.create(&name("alice"), &embedding(0.1)).await.unwrap();
        let key = store.create(&name("alice"), &embedding(0.9)).await.unwrap();

        assert_eq!(store.lookup(&key).await.unwrap(), embedding(0.9));
        assert_eq!(store.list().await.unwrap(), vec![key]);
    }

    #[tokio::test]
    async fn test_concurrent_creates_same_key() {
        let dir = tempdir().unwrap();
        let store = Arc::new(FileVoiceStore::new(dir.path()).await.unwrap());

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .create(&name("alice"), &embedding(i as f32 / 16.0))
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // 最终内容恰好是某一次写入的完整数据
        let key = IdentityKey::parse("voice_alice").unwrap();
        let stored = store.lookup(&key).await.unwrap();
        let first = stored.values()[0];
        assert!(stored.values().iter().all(|v| *v == first));
        assert!((0..16).any(|i| embedding(i as f32 / 16.0) == stored));

        let leftovers = std::fs::read_dir(dir.path())
            .unwrap()
            .filter(|e| {
                e.as_ref()
                    .unwrap()
                    .file_name()
                    .to_string_lossy()
                    .ends_with(TEMP_FILE_SUFFIX)
            })
            .count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_list_ignores_foreign_files() {
        let dir = tempdir().unwrap();
        let store = FileVoiceStore::new(dir.path()).await.unwrap();
        store.create(&name("bob"), &embedding(0.2)).await.unwrap();
        store.create(&name("alice"), &embedding(0.3)).await.unwrap();

        std::fs::write(dir.path().join("tmp_tts.wav"), b"RIFF").unwrap();
        std::fs::write(dir.path().join("notes.emb"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("tmp")).unwrap();

        let keys: Vec<_> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|k| k.to_string())
            .collect();
        assert_eq!(keys, vec!["voice_alice", "voice_bob"]);
    }

    #[tokio::test]
    async fn test_unwritable_medium() {
        let dir = tempdir().unwrap();
        let voices_dir = dir.path().join("voices");
        let store = FileVoiceStore::new(&voices_dir).await.unwrap();

        // 目录被替换为普通文件，写入必然失败
        std::fs::remove_dir(&voices_dir).unwrap();
        std::fs::write(&voices_dir, b"").unwrap();

        assert!(matches!(
            store.create(&name("alice"), &embedding(0.5)).await,
            Err(StoreError::Write(_))
        ));
    }

    #[tokio::test]
    async fn test_corrupt_file() {
        let dir = tempdir().unwrap();
        let store = FileVoiceStore::new(dir.path()).await.unwrap();
        std::fs::write(dir.path().join("voice_alice.emb"), b"\x01\x02").unwrap();

        let key = IdentityKey::parse("voice_alice").unwrap();
        assert!(matches!(store.lookup(&key).await, Err(StoreError::Corrupt(_))));
    }

    #[tokio::test]
    async fn test_stale_temp_files_removed_on_open() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(".voice_alice-abc123.tmp"), b"partial").unwrap();
        std::fs::write(dir.path().join("keep.txt"), b"x").unwrap();

        FileVoiceStore::new(dir.path()).await.unwrap();

        assert!(!dir.path().join(".voice_alice-abc123.tmp").exists());
        assert!(dir.path().join("keep.txt").exists());
    }
}
