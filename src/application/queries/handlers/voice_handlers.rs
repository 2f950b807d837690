//! Voice Query Handlers

use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::VoiceStorePort;
use crate::application::queries::{GetVoice, ListVoices};
use crate::domain::voice::{IdentityKey, VoiceIdentity};

// ============================================================================
// Response DTOs
// ============================================================================

/// 音色详情响应
#[derive(Debug, Clone)]
pub struct VoiceResponse {
    pub identity_key: String,
    pub dims: Vec<usize>,
    pub created_at: String,
}

impl From<VoiceIdentity> for VoiceResponse {
    fn from(voice: VoiceIdentity) -> Self {
        Self {
            identity_key: voice.key().to_string(),
            dims: voice.embedding().dims().to_vec(),
            created_at: voice.created_at().to_rfc3339(),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GetVoice Handler
pub struct GetVoiceHandler {
    voice_store: Arc<dyn VoiceStorePort>,
}

impl GetVoiceHandler {
    pub fn new(voice_store: Arc<dyn VoiceStorePort>) -> Self {
        Self { voice_store }
    }

    pub async fn handle(&self, query: GetVoice) -> Result<VoiceResponse, ApplicationError> {
        let key = IdentityKey::parse(&query.voice_id)
            .map_err(|_| ApplicationError::voice_not_found(&query.voice_id))?;

        let voice = self
            .voice_store
            .get(&key)
            .await
            .map_err(|e| ApplicationError::from_lookup(&key, e))?;

        Ok(VoiceResponse::from(voice))
    }
}

/// ListVoices Handler
pub struct ListVoicesHandler {
    voice_store: Arc<dyn VoiceStorePort>,
}

impl ListVoicesHandler {
    pub fn new(voice_store: Arc<dyn VoiceStorePort>) -> Self {
        Self { voice_store }
    }

    pub async fn handle(&self, _query: ListVoices) -> Result<Vec<String>, ApplicationError> {
        let keys = self
            .voice_store
            .list()
            .await
            .map_err(|e| ApplicationError::Storage(e.to_string()))?;

        Ok(keys.into_iter().map(|key| key.to_string()).collect())
    }
}
