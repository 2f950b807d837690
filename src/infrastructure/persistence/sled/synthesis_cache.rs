//! Sled-based LRU Synthesis Cache Implementation

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sled::Db;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::application::ports::{CacheError, CacheStats, SynthesisCachePort};
use crate::domain::synthesis::{AudioFormat, SynthesisArtifact};
use crate::domain::voice::IdentityKey;

const ENTRY_PREFIX: &str = "cache:";

/// Sled 缓存配置
#[derive(Debug, Clone)]
pub struct SledCacheConfig {
    /// 数据库路径
    pub db_path: String,
    /// 最大缓存大小（字节）
    pub max_size_bytes: u64,
}

impl Default for SledCacheConfig {
    fn default() -> Self {
        Self {
            db_path: "outputs/cache.sled".to_string(),
            max_size_bytes: 1024 * 1024 * 1024, // 1GB
        }
    }
}

/// 内部缓存条目
#[derive(Debug, Clone, Serialize, Deserialize)]
struct InternalCacheEntry {
    audio_data: Vec<u8>,
    format: AudioFormat,
    sample_rate: u32,
    channels: u16,
    duration_ms: u64,
    size_bytes: u64,
    /// 逻辑访问序号（LRU）
    last_accessed: u64,
    created_at: i64,
}

impl InternalCacheEntry {
    fn into_artifact(self) -> SynthesisArtifact {
        SynthesisArtifact {
            audio_data: self.audio_data,
            format: self.format,
            sample_rate: self.sample_rate,
            channels: self.channels,
            duration_ms: self.duration_ms,
        }
    }
}

/// Sled 合成结果缓存
pub struct SledSynthesisCache {
    db: Db,
    max_size_bytes: u64,
    current_size: AtomicU64,
    access_clock: AtomicU64,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
}

impl SledSynthesisCache {
    /// 创建新的缓存实例
    pub fn new(config: &SledCacheConfig) -> Result<Self, CacheError> {
        let db = sled::open(&config.db_path)
            .map_err(|e| CacheError::DatabaseError(e.to_string()))?;

        // 恢复当前缓存大小和访问时钟
        let (current_size, clock) = Self::scan_totals(&db)?;

        tracing::info!(
            db_path = %config.db_path,
            max_size_bytes = config.max_size_bytes,
            current_size = current_size,
            "SledSynthesisCache initialized"
        );

        Ok(Self {
            db,
            max_size_bytes: config.max_size_bytes,
            current_size: AtomicU64::new(current_size),
            access_clock: AtomicU64::new(clock + 1),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
        })
    }

    /// 打开现有缓存
    pub fn open<P: AsRef<Path>>(path: P, max_size_bytes: u64) -> Result<Self, CacheError> {
        let config = SledCacheConfig {
            db_path: path.as_ref().to_string_lossy().to_string(),
            max_size_bytes,
        };
        Self::new(&config)
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn entry_key(cache_key: &str) -> String {
        format!("{}{}", ENTRY_PREFIX, cache_key)
    }

    fn tick(&self) -> u64 {
        self.access_clock.fetch_add(1, Ordering::Relaxed)
    }

    /// 所有条目的总大小和最大访问序号
    fn scan_totals(db: &Db) -> Result<(u64, u64), CacheError> {
        let mut total = 0u64;
        let mut clock = 0u64;
        for item in db.scan_prefix(ENTRY_PREFIX) {
            let (_, value) = item.map_err(|e| CacheError::DatabaseError(e.to_string()))?;
            if let Ok(entry) = bincode::deserialize::<InternalCacheEntry>(&value) {
                total += entry.size_bytes;
                clock = clock.max(entry.last_accessed);
            }
        }
        Ok((total, clock))
    }

    /// LRU 淘汰一个条目，返回是否有条目被淘汰
    fn evict_lru(&self) -> Result<bool, CacheError> {
        let mut oldest: Option<(sled::IVec, InternalCacheEntry)> = None;

        for item in self.db.scan_prefix(ENTRY_PREFIX) {
            let (key, value) = item.map_err(|e| CacheError::DatabaseError(e.to_string()))?;
            match bincode::deserialize::<InternalCacheEntry>(&value) {
                Ok(entry) => {
                    let is_older = oldest
                        .as_ref()
                        .map(|(_, e)| entry.last_accessed < e.last_accessed)
                        .unwrap_or(true);
                    if is_older {
                        oldest = Some((key, entry));
                    }
                }
                Err(_) => {
                    // 无法解析的条目直接丢弃
                    self.db
                        .remove(&key)
                        .map_err(|e| CacheError::DatabaseError(e.to_string()))?;
                    return Ok(true);
                }
            }
        }

        let Some((key, entry)) = oldest else {
            return Ok(false);
        };

        self.db
            .remove(&key)
            .map_err(|e| CacheError::DatabaseError(e.to_string()))?;
        self.current_size.fetch_sub(entry.size_bytes, Ordering::Relaxed);

        tracing::debug!(
            key = %String::from_utf8_lossy(&key),
            size_bytes = entry.size_bytes,
            "LRU evicted cache entry"
        );

        Ok(true)
    }

    /// 删除条目并扣减大小
    fn remove_entry(&self, key: &[u8]) -> Result<(), CacheError> {
        if let Some(data) = self
            .db
            .remove(key)
            .map_err(|e| CacheError::DatabaseError(e.to_string()))?
        {
            if let Ok(entry) = bincode::deserialize::<InternalCacheEntry>(&data) {
                self.current_size.fetch_sub(entry.size_bytes, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    /// 刷新数据库
    pub fn flush(&self) -> Result<(), CacheError> {
        self.db
            .flush()
            .map_err(|e| CacheError::DatabaseError(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl SynthesisCachePort for SledSynthesisCache {
    async fn get(&self, cache_key: &str) -> Result<Option<SynthesisArtifact>, CacheError> {
        let key = Self::entry_key(cache_key);

        match self.db.get(&key) {
            Ok(Some(data)) => {
                let mut entry: InternalCacheEntry = bincode::deserialize(&data)
                    .map_err(|e| CacheError::SerializationError(e.to_string()))?;

                // LRU touch
                entry.last_accessed = self.tick();
                let entry_bytes = bincode::serialize(&entry)
                    .map_err(|e| CacheError::SerializationError(e.to_string()))?;
                self.db
                    .insert(&key, entry_bytes)
                    .map_err(|e| CacheError::DatabaseError(e.to_string()))?;

                self.hit_count.fetch_add(1, Ordering::Relaxed);
                Ok(Some(entry.into_artifact()))
            }
            Ok(None) => {
                self.miss_count.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
            Err(e) => Err(CacheError::DatabaseError(e.to_string())),
        }
    }

    async fn put(&self, cache_key: &str, artifact: &SynthesisArtifact) -> Result<(), CacheError> {
        let size = artifact.size_bytes() as u64;
        if size > self.max_size_bytes {
            tracing::warn!(
                cache_key = %cache_key,
                size_bytes = size,
                max_size_bytes = self.max_size_bytes,
                "Artifact larger than cache, not cached"
            );
            return Ok(());
        }

        let key = Self::entry_key(cache_key);
        // 覆盖写入时先扣除旧条目
        self.remove_entry(key.as_bytes())?;

        // 淘汰以腾出空间
        while self.current_size.load(Ordering::Relaxed) + size > self.max_size_bytes {
            if !self.evict_lru()? {
                break;
            }
        }

        let entry = InternalCacheEntry {
            audio_data: artifact.audio_data.clone(),
            format: artifact.format,
            sample_rate: artifact.sample_rate,
            channels: artifact.channels,
            duration_ms: artifact.duration_ms,
            size_bytes: size,
            last_accessed: self.tick(),
            created_at: Utc::now().timestamp(),
        };

        let entry_bytes =
            bincode::serialize(&entry).map_err(|e| CacheError::SerializationError(e.to_string()))?;

        self.db
            .insert(&key, entry_bytes)
            .map_err(|e| CacheError::DatabaseError(e.to_string()))?;

        self.current_size.fetch_add(size, Ordering::Relaxed);

        tracing::debug!(cache_key = %cache_key, size_bytes = size, "Synthesis cached");

        Ok(())
    }

    async fn invalidate_voice(&self, key: &IdentityKey) -> Result<usize, CacheError> {
        let prefix = Self::entry_key(&format!("{}:", key));
        let keys: Vec<sled::IVec> = self
            .db
            .scan_prefix(prefix.as_bytes())
            .keys()
            .collect::<Result<_, _>>()
            .map_err(|e| CacheError::DatabaseError(e.to_string()))?;

        for entry_key in &keys {
            self.remove_entry(entry_key)?;
        }

        Ok(keys.len())
    }

    async fn stats(&self) -> CacheStats {
        let total_entries = self.db.scan_prefix(ENTRY_PREFIX).count();

        CacheStats {
            total_entries,
            total_size_bytes: self.current_size.load(Ordering::Relaxed),
            max_size_bytes: self.max_size_bytes,
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
        }
    }
}
