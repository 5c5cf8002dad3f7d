//! HTTP 接口（axum）
//!
//! 业务路由挂在 /api/v1 下；/health 与 / 在根路径。

pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

use crate::config::AppConfig;
use crate::core::DevOpsAgent;

/// 路由共享状态
pub struct AppState {
    pub agent: Arc<DevOpsAgent>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(agent: Arc<DevOpsAgent>, config: AppConfig) -> Self {
        Self { agent, config }
    }

    /// 仅 development 环境在 500 中返回原始错误
    pub fn expose_detail(&self) -> bool {
        self.config.app.is_development()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);

    let api = Router::new()
        .route("/chat", post(handlers::chat))
        .route("/approve-action", post(handlers::approve_action))
        .route("/sessions/:id/history", get(handlers::session_history))
        .route("/sessions/:id/actions", get(handlers::session_actions))
        .route("/tools", get(handlers::list_tools));

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .nest("/api/v1", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// "*" 表示任意来源；无法解析的来源忽略并告警
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|o| o.trim() == "*") {
        return layer.allow_origin(Any);
    }
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o.trim()) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(parsed))
}
