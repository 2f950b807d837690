//! Storage Adapter - 文件系统音色存储

mod file_voice_store;

pub use file_voice_store::FileVoiceStore;
