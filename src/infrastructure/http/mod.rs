//! HTTP Layer - RESTful API
//!
//! 所有业务响应均为 HTTP 200 + `{errno, error, data}`，唯一例外是
//! `/speak` 成功时直接返回音频字节

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use routes::create_routes;
pub use server::{HttpServer, ServerConfig};
pub use state::{AppState, RequestLimits};
