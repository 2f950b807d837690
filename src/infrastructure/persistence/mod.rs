//! Persistence Layer - 数据持久化
//!
//! SQLite 音色存储和 Sled 合成缓存

pub mod sled;
pub mod sqlite;

pub use self::sled::SledSynthesisCache;
pub use self::sqlite::SqliteVoiceStore;
