//! Sled Persistence - 合成结果缓存

mod synthesis_cache;

pub use synthesis_cache::{SledCacheConfig, SledSynthesisCache};
