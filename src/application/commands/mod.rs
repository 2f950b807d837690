//! 应用层 - 命令（写操作）
//!
//! CQRS 命令侧：克隆音色、合成语音

mod speech_commands;
mod voice_commands;

pub mod handlers;

pub use speech_commands::*;
pub use voice_commands::*;
