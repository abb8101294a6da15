//! HTTP handlers and route configuration.

mod cache;
mod health;

use actix_web::web;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(health::health_check))
            .service(
                web::scope("/cache")
                    .route("/stats", web::get().to(cache::stats))
                    .route("/warm-up", web::post().to(cache::warm_up))
                    .route("/flush", web::post().to(cache::flush)),
            ),
    );
}
