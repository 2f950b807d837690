//! Voice Context - Value Objects

use serde::{Deserialize, Serialize};

/// 音色标识前缀，用于与其它产物命名空间隔离
pub const IDENTITY_KEY_PREFIX: &str = "voice_";

/// 样本名称最大长度
const MAX_NAME_LEN: usize = 100;

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// 样本名称
///
/// 不变量:
/// - 非空，长度不超过 100
/// - 仅包含 `[A-Za-z0-9_-]`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SampleName(String);

impl SampleName {
    pub fn new(name: impl Into<String>) -> Result<Self, &'static str> {
        let name = name.into();
        if name.is_empty() {
            return Err("样本名称不能为空");
        }
        if name.len() > MAX_NAME_LEN {
            return Err("样本名称长度不能超过100字符");
        }
        if !name.chars().all(is_name_char) {
            return Err("样本名称只能包含字母、数字、下划线和连字符");
        }
        Ok(Self(name))
    }

    /// 从上传文件名推导样本名称
    ///
    /// 取文件名主干，非法字符替换为 `_`，空结果回退为 `sample`
    pub fn from_file_name(file_name: &str) -> Self {
        let base = file_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default();
        let stem = base.rsplit_once('.').map_or(base, |(stem, _)| stem);

        let sanitized: String = stem
            .chars()
            .map(|c| if is_name_char(c) { c } else { '_' })
            .take(MAX_NAME_LEN)
            .collect();

        if sanitized.is_empty() {
            Self("sample".to_string())
        } else {
            Self(sanitized)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SampleName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 音色唯一标识
///
/// 格式为 `voice_{sample_name}`，由样本名称确定性推导
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IdentityKey(String);

impl IdentityKey {
    /// 由样本名称推导
    pub fn for_sample(sample_name: &SampleName) -> Self {
        Self(format!("{}{}", IDENTITY_KEY_PREFIX, sample_name.as_str()))
    }

    /// 解析外部传入的标识
    ///
    /// 不符合格式的字符串不可能存在于存储中
    pub fn parse(raw: &str) -> Result<Self, &'static str> {
        let name = raw
            .strip_prefix(IDENTITY_KEY_PREFIX)
            .ok_or("音色标识必须以 voice_ 开头")?;
        SampleName::new(name)?;
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 说话人嵌入向量
///
/// 不变量:
/// - values 非空且全部为有限值
/// - dims 各维乘积等于 values 长度
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakerEmbedding {
    dims: Vec<usize>,
    values: Vec<f32>,
}

impl SpeakerEmbedding {
    pub fn new(dims: Vec<usize>, values: Vec<f32>) -> Result<Self, &'static str> {
        if values.is_empty() {
            return Err("嵌入向量不能为空");
        }
        let expected = dims
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d));
        if dims.is_empty() || expected != Some(values.len()) {
            return Err("嵌入向量维度与数据长度不一致");
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err("嵌入向量包含非有限值");
        }
        Ok(Self { dims, values })
    }

    /// 一维向量
    pub fn from_vec(values: Vec<f32>) -> Result<Self, &'static str> {
        Self::new(vec![values.len()], values)
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// L2 范数
    pub fn norm(&self) -> f32 {
        self.values.iter().map(|v| v * v).sum::<f32>().sqrt()
    }
}

/// 基础说话人选择器
///
/// name 为合成器声明的说话人名称（如 `EN-US`），id 为其内部编号
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakerSelector {
    pub name: String,
    pub id: u32,
}

impl SpeakerSelector {
    pub fn new(name: impl Into<String>, id: u32) -> Self {
        Self {
            name: name.into(),
            id,
        }
    }

    /// 基础说话人参考嵌入的文件名主干
    pub fn reference_stem(&self) -> String {
        self.name.to_lowercase()
    }
}

impl std::fmt::Display for SpeakerSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.name, self.id)
    }
}
