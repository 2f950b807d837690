//! HTTP Handlers

mod service;
mod speech;
mod voice;

pub use service::*;
pub use speech::*;
pub use voice::*;
