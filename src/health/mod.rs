//! 健康检查端点
//!
//! - `GET /health/status`：返回应用提供的健康信息
//! - `GET /health/ping`：返回带时间戳的存活标记
//!
//! 启动注册时写入注册中心的 HTTP 检查指向这些端点。

use axum::{Json, Router, routing::get};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 基础健康信息
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BasicHealthInfo {
    pub timestamp: DateTime<Utc>,
}

impl BasicHealthInfo {
    pub fn now() -> Self {
        Self {
            timestamp: Utc::now(),
        }
    }
}

impl Default for BasicHealthInfo {
    fn default() -> Self {
        Self::now()
    }
}

/// 存活响应
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pong {
    pub timestamp: DateTime<Utc>,
}

/// 构建健康检查路由
///
/// # 参数
/// * `health` - 每次请求 `/health/status` 时调用，返回健康信息
pub fn router<F, H>(health: F) -> Router
where
    F: Fn() -> H + Clone + Send + Sync + 'static,
    H: Serialize + Send + 'static,
{
    Router::new()
        .route(
            "/health/status",
            get(move || {
                let health = health.clone();
                async move { Json(health()) }
            }),
        )
        .route("/health/ping", get(ping))
}

async fn ping() -> Json<Pong> {
    Json(Pong {
        timestamp: Utc::now(),
    })
}
