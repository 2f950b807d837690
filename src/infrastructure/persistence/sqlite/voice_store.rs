//! SQLite Voice Store
//!
//! 单条 UPSERT 语句完成创建/覆盖，天然原子

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use super::DbPool;
use crate::application::ports::{StoreError, VoiceStorePort};
use crate::domain::voice::{IdentityKey, SampleName, SpeakerEmbedding, VoiceIdentity};

/// SQLite Voice Store
pub struct SqliteVoiceStore {
    pool: DbPool,
}

impl SqliteVoiceStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct VoiceRow {
    identity_key: String,
    dims: String,
    embedding: Vec<u8>,
    created_at: String,
}

fn encode_values(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_values(raw: &[u8]) -> Result<Vec<f32>, StoreError> {
    if raw.len() % 4 != 0 {
        return Err(StoreError::Corrupt(format!(
            "embedding blob length {} is not a multiple of 4",
            raw.len()
        )));
    }
    Ok(raw
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

impl TryFrom<VoiceRow> for VoiceIdentity {
    type Error = StoreError;

    fn try_from(row: VoiceRow) -> Result<Self, Self::Error> {
        let key = IdentityKey::parse(&row.identity_key)
            .map_err(|e| StoreError::Corrupt(format!("{}: {}", row.identity_key, e)))?;
        let dims: Vec<usize> = serde_json::from_str(&row.dims)
            .map_err(|e| StoreError::Corrupt(format!("{}: {}", key, e)))?;
        let embedding = SpeakerEmbedding::new(dims, decode_values(&row.embedding)?)
            .map_err(|e| StoreError::Corrupt(format!("{}: {}", key, e)))?;
        let created_at = DateTime::parse_from_rfc3339(&row.created_at)
            .map_err(|e| StoreError::Corrupt(format!("{}: {}", key, e)))?
            .with_timezone(&Utc);

        Ok(VoiceIdentity::restore(key, embedding, created_at))
    }
}

#[async_trait]
impl VoiceStorePort for SqliteVoiceStore {
    async fn create(
        &self,
        sample_name: &SampleName,
        embedding: &SpeakerEmbedding,
    ) -> Result<IdentityKey, StoreError> {
        let key = IdentityKey::for_sample(sample_name);
        let dims = serde_json::to_string(embedding.dims())
            .map_err(|e| StoreError::Write(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO voice_identities (identity_key, dims, embedding, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(identity_key) DO UPDATE SET
                dims = excluded.dims,
                embedding = excluded.embedding,
                created_at = excluded.created_at
            "#,
        )
        .bind(key.as_str())
        .bind(dims)
        .bind(encode_values(embedding.values()))
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Write(e.to_string()))?;

        tracing::debug!(identity_key = %key, len = embedding.len(), "Voice identity written");

        Ok(key)
    }

    async fn get(&self, key: &IdentityKey) -> Result<VoiceIdentity, StoreError> {
        let row: Option<VoiceRow> = sqlx::query_as(
            "SELECT identity_key, dims, embedding, created_at FROM voice_identities WHERE identity_key = ?",
        )
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Read(e.to_string()))?;

        row.ok_or_else(|| StoreError::NotFound(key.clone()))?
            .try_into()
    }

    async fn list(&self) -> Result<Vec<IdentityKey>, StoreError> {
        let keys: Vec<String> = sqlx::query_scalar(
            "SELECT identity_key FROM voice_identities ORDER BY identity_key",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Read(e.to_string()))?;

        Ok(keys
            .iter()
            .filter_map(|raw| IdentityKey::parse(raw).ok())
            .collect())
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::persistence::sqlite::{create_pool, run_migrations, DatabaseConfig};

    async fn store() -> SqliteVoiceStore {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteVoiceStore::new(pool)
    }

    fn embedding(value: f32) -> SpeakerEmbedding {
        SpeakerEmbedding::new(vec![1, 4, 1], vec![value, -value, value * 2.0, 0.0]).unwrap()
    }

    #[tokio::test]
    async fn test_create_lookup_and_overwrite() {
        let store = store().await;
        let alice = SampleName::new("alice").unwrap();

        let key = store.create(&alice, &embedding(0.1)).await.unwrap();
        assert_eq!(key.as_str(), "voice_alice");
        assert_eq!(store.lookup(&key).await.unwrap(), embedding(0.1));

        store.create(&alice, &embedding(0.7)).await.unwrap();
        assert_eq!(store.lookup(&key).await.unwrap(), embedding(0.7));
        assert_eq!(store.list().await.unwrap(), vec![key]);
    }

    #[tokio::test]
    async fn test_missing_and_listing() {
        let store = store().await;
        let bob = IdentityKey::parse("voice_bob").unwrap();
        assert!(matches!(store.get(&bob).await, Err(StoreError::NotFound(_))));

        for name in ["carol", "alice"] {
            store
                .create(&SampleName::new(name).unwrap(), &embedding(0.5))
                .await
                .unwrap();
        }
        let keys: Vec<_> = store.list().await.unwrap().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["voice_alice", "voice_carol"]);
        assert_eq!(keys, store.list().await.unwrap().iter().map(|k| k.to_string()).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_corrupt_row() {
        let store = store().await;
        sqlx::query("INSERT INTO voice_identities VALUES ('voice_alice', '[1,2]', x'0000', '2024-01-01T00:00:00Z')")
            .execute(&store.pool)
            .await
            .unwrap();

        let key = IdentityKey::parse("voice_alice").unwrap();
        assert!(matches!(store.get(&key).await, Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn test_blob_encoding() {
        let values = vec![0.5f32, -1.25, 3.0];
        assert_eq!(decode_values(&encode_values(&values)).unwrap(), values);
        assert!(decode_values(&[0, 1, 2]).is_err());
    }
}
