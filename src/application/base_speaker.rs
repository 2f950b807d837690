//! Base Speaker - 基础说话人解析
//!
//! 启动时一次性确定基础说话人及其参考嵌入向量，注入编排器；
//! 请求处理期间不再做任何选择

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::application::ports::{InferenceError, SpeechSynthesizerPort};
use crate::domain::voice::{SpeakerEmbedding, SpeakerSelector};

/// 基础说话人解析错误
#[derive(Debug, Error)]
pub enum BaseSpeakerError {
    #[error("Synthesizer declares no speakers")]
    NoSpeakers,

    #[error("Base speaker '{requested}' not declared by synthesizer (declared: {declared})")]
    UnknownSpeaker { requested: String, declared: String },

    #[error("Failed to query synthesizer speakers: {0}")]
    Synthesizer(#[from] InferenceError),

    #[error("Failed to read base speaker reference {path}: {message}")]
    ReferenceIo { path: PathBuf, message: String },

    #[error("Invalid base speaker reference {path}: {message}")]
    InvalidReference { path: PathBuf, message: String },
}

/// 基础说话人（选择器 + 参考嵌入）
#[derive(Debug, Clone)]
pub struct BaseSpeaker {
    selector: SpeakerSelector,
    reference: SpeakerEmbedding,
}

impl BaseSpeaker {
    pub fn new(selector: SpeakerSelector, reference: SpeakerEmbedding) -> Self {
        Self {
            selector,
            reference,
        }
    }

    pub fn selector(&self) -> &SpeakerSelector {
        &self.selector
    }

    pub fn reference(&self) -> &SpeakerEmbedding {
        &self.reference
    }
}

/// 参考嵌入文件格式
#[derive(Debug, Deserialize)]
struct ReferenceFile {
    dims: Vec<usize>,
    values: Vec<f32>,
}

/// 确定基础说话人
///
/// 配置了名称则按名称（不区分大小写）匹配；否则取合成器声明的第一个说话人
pub async fn resolve_selector(
    synthesizer: &dyn SpeechSynthesizerPort,
    configured: Option<&str>,
) -> Result<SpeakerSelector, BaseSpeakerError> {
    let declared = synthesizer.speakers().await?;
    if declared.is_empty() {
        return Err(BaseSpeakerError::NoSpeakers);
    }

    match configured {
        Some(name) => declared
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
            .cloned()
            .ok_or_else(|| BaseSpeakerError::UnknownSpeaker {
                requested: name.to_string(),
                declared: declared
                    .iter()
                    .map(|s| s.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        None => {
            let first = declared[0].clone();
            tracing::warn!(
                speaker = %first,
                declared = declared.len(),
                "No base speaker configured, using the first declared speaker"
            );
            Ok(first)
        }
    }
}

/// 参考嵌入文件路径: `{dir}/{lowercased name}.json`
pub fn reference_path(dir: &Path, selector: &SpeakerSelector) -> PathBuf {
    dir.join(format!("{}.json", selector.reference_stem()))
}

/// 加载基础说话人参考嵌入
pub async fn load_reference(
    dir: &Path,
    selector: &SpeakerSelector,
) -> Result<SpeakerEmbedding, BaseSpeakerError> {
    let path = reference_path(dir, selector);

    let raw = tokio::fs::read(&path)
        .await
        .map_err(|e| BaseSpeakerError::ReferenceIo {
            path: path.clone(),
            message: e.to_string(),
        })?;

    let file: ReferenceFile =
        serde_json::from_slice(&raw).map_err(|e| BaseSpeakerError::InvalidReference {
            path: path.clone(),
            message: e.to_string(),
        })?;

    let embedding = SpeakerEmbedding::new(file.dims, file.values).map_err(|e| {
        BaseSpeakerError::InvalidReference {
            path: path.clone(),
            message: e.to_string(),
        }
    })?;

    tracing::info!(
        speaker = %selector,
        path = %path.display(),
        dims = ?embedding.dims(),
        "Base speaker reference loaded"
    );

    Ok(embedding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::StubSynthesizer;
    use tempfile::tempdir;

    fn declared() -> Vec<SpeakerSelector> {
        vec![
            SpeakerSelector::new("EN-US", 0),
            SpeakerSelector::new("EN-BR", 1),
        ]
    }

    #[tokio::test]
    async fn test_resolve_configured_speaker_case_insensitive() {
        let synth = StubSynthesizer::with_speakers(declared());
        let selector = resolve_selector(&synth, Some("en-br")).await.unwrap();
        assert_eq!(selector, SpeakerSelector::new("EN-BR", 1));
    }

    #[tokio::test]
    async fn test_resolve_falls_back_to_first_declared() {
        let synth = StubSynthesizer::with_speakers(declared());
        let selector = resolve_selector(&synth, None).await.unwrap();
        assert_eq!(selector.name, "EN-US");
    }

    #[tokio::test]
    async fn test_resolve_unknown_speaker() {
        let synth = StubSynthesizer::with_speakers(declared());
        let err = resolve_selector(&synth, Some("ZH")).await.unwrap_err();
        match err {
            BaseSpeakerError::UnknownSpeaker { requested, declared } => {
                assert_eq!(requested, "ZH");
                assert_eq!(declared, "EN-US, EN-BR");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_resolve_without_speakers() {
        let synth = StubSynthesizer::with_speakers(vec![]);
        assert!(matches!(
            resolve_selector(&synth, None).await,
            Err(BaseSpeakerError::NoSpeakers)
        ));
    }

    #[tokio::test]
    async fn test_load_reference() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("en-us.json"),
            r#"{"dims":[1,3,1],"values":[0.1,0.2,0.3]}"#,
        )
        .unwrap();

        let selector = SpeakerSelector::new("EN-US", 0);
        let embedding = load_reference(dir.path(), &selector).await.unwrap();
        assert_eq!(embedding.dims(), &[1, 3, 1]);
        assert_eq!(embedding.values(), &[0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn test_load_reference_errors() {
        let dir = tempdir().unwrap();
        let selector = SpeakerSelector::new("EN-US", 0);
        assert!(matches!(
            load_reference(dir.path(), &selector).await,
            Err(BaseSpeakerError::ReferenceIo { .. })
        ));

        std::fs::write(dir.path().join("en-us.json"), r#"{"dims":[2],"values":[0.1]}"#).unwrap();
        assert!(matches!(
            load_reference(dir.path(), &selector).await,
            Err(BaseSpeakerError::InvalidReference { .. })
        ));
    }
}
