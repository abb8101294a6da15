//! Cache administration endpoints.

use actix_web::{HttpResponse, web};
use dixis_core::services::FlushConfirmation;
use serde::Deserialize;

use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FlushRequest {
    pub confirm: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// GET /api/cache/stats
pub async fn stats(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.cache.get_cache_stats().await)
}

/// POST /api/cache/warm-up
///
/// Always 200; failed sections are listed in the report body.
pub async fn warm_up(state: web::Data<AppState>) -> HttpResponse {
    let report = state.cache.warm_up_caches().await;
    HttpResponse::Ok().json(report)
}

/// POST /api/cache/flush
///
/// Body must be `{"confirm": "flush-all"}`. Anything else is rejected
/// before the store is touched.
pub async fn flush(state: web::Data<AppState>, body: web::Bytes) -> AppResult<HttpResponse> {
    let request: FlushRequest = serde_json::from_slice(&body).map_err(|e| {
        AppError::BadRequest(format!(
            "expected {{\"confirm\": \"{}\"}}: {e}",
            FlushConfirmation::PHRASE
        ))
    })?;

    let reason = request
        .reason
        .unwrap_or_else(|| "admin endpoint".to_string());
    let confirmation = FlushConfirmation::from_phrase(&request.confirm, reason).ok_or_else(|| {
        AppError::BadRequest(format!(
            "confirmation phrase must be \"{}\"",
            FlushConfirmation::PHRASE
        ))
    })?;

    let report = state.cache.clear_all_caches(confirmation).await;
    Ok(HttpResponse::Ok().json(report))
}
