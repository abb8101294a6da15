//! Health check endpoint.

use actix_web::{HttpResponse, web};
use dixis_core::domain::CacheStats;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: String,
    pub cache: CacheStats,
}

/// Health check endpoint - returns server status and cache metadata.
///
/// GET /api/health
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let cache = state.cache.get_cache_stats().await;
    let status = if cache.error.is_some() { "degraded" } else { "ok" };

    HttpResponse::Ok().json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
        cache,
    })
}
