//! # Dixis Cache Admin
//!
//! Actix-web service exposing cache stats, warm-up and a guarded full flush.

use actix_web::{App, HttpServer, web};
use tracing_actix_web::TracingLogger;

#[cfg(feature = "scheduler")]
mod background;
mod config;
mod handlers;
mod middleware;
mod state;
mod telemetry;

use config::AppConfig;
use state::AppState;
use telemetry::{TelemetryConfig, init_telemetry};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    init_telemetry(&TelemetryConfig::from_env());

    let config = AppConfig::from_env();

    tracing::info!(
        "Starting Dixis cache admin on {}:{}",
        config.host,
        config.port
    );

    let state = AppState::from_config(&config).await?;

    #[cfg(feature = "scheduler")]
    let mut scheduler = {
        let scheduler = background::Scheduler::new(config.scheduler.clone()).await?;
        background::schedule_warm_up(&scheduler, state.cache.clone()).await?;
        scheduler.start().await?;
        scheduler
    };

    let app_state = state.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(app_state.clone()))
            .configure(handlers::configure_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    #[cfg(feature = "scheduler")]
    scheduler.shutdown().await?;

    tracing::info!("Cache admin stopped");
    Ok(())
}
