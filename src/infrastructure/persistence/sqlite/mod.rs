//! SQLite Persistence - SQLite 音色存储

mod database;
mod voice_store;

pub use database::*;
pub use voice_store::*;
