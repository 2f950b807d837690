//! HTTP Routes
//!
//! API Endpoints:
//! - /                  GET   服务描述
//! - /health            GET   健康检查
//! - /clone-voice       POST  上传样本克隆音色（multipart: audio）
//! - /speak             POST  使用已克隆音色合成语音（返回 WAV）
//! - /voices            GET   列出所有音色
//! - /voices/{voice_id} GET   音色详情

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

/// 创建所有路由
pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/clone-voice", post(handlers::clone_voice))
        .route("/speak", post(handlers::speak))
        .nest("/voices", voice_routes())
}

/// Voice 路由
fn voice_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::list_voices))
        .route("/:voice_id", get(handlers::get_voice))
}
