use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use dotenvy::dotenv;
use std::sync::Arc;
use std::time::Duration;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod models;
mod repo;
mod routes;
mod service;
#[cfg(test)]
mod test_support;
mod utils;

use config::Config;
use db::init_db;

use crate::docs::ApiDoc;
use crate::repo::mysql::MySqlStore;
use crate::repo::{AttendanceRepo, EmployeeDirectory, PayrollRepo, PinRepo, VacationRepo};
use crate::service::kiosk::KioskSessions;
use crate::service::photo::{FsPhotoStore, PhotoStore};
use crate::utils::employee_cache;
use tracing::{error, info};
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    let config = Config::from_env();

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!(timezone = %config.timezone, photo_dir = %config.photo_dir, "Server starting...");

    let pool = init_db(&config.database_url).await;

    // One store behind every data-access seam
    let store = Arc::new(MySqlStore::new(pool.clone()));
    let attendance_repo: Arc<dyn AttendanceRepo> = store.clone();
    let pin_repo: Arc<dyn PinRepo> = store.clone();
    let payroll_repo: Arc<dyn PayrollRepo> = store.clone();
    let directory: Arc<dyn EmployeeDirectory> = store.clone();
    let vacation_repo: Arc<dyn VacationRepo> = store;
    let photos: Arc<dyn PhotoStore> = Arc::new(FsPhotoStore::new(&config.photo_dir));

    // Shared across workers, so built outside the factory closure
    let attendance_repo = Data::from(attendance_repo);
    let pin_repo = Data::from(pin_repo);
    let payroll_repo = Data::from(payroll_repo);
    let directory = Data::from(directory);
    let vacation_repo = Data::from(vacation_repo);
    let photos = Data::from(photos);
    let sessions = Data::new(KioskSessions::new(Duration::from_secs(
        config.kiosk_session_ttl,
    )));

    let pool_for_cache_warmup = pool.clone();
    actix_web::rt::spawn(async move {
        if let Err(e) = employee_cache::warmup_employee_cache(&pool_for_cache_warmup, 500).await {
            error!(error = ?e, "Failed to warm up employee cache");
        }
    });

    let server_addr = config.server_addr.clone();
    let config_data = config.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(pool.clone()))
            .app_data(Data::new(config.clone()))
            .app_data(attendance_repo.clone())
            .app_data(pin_repo.clone())
            .app_data(payroll_repo.clone())
            .app_data(directory.clone())
            .app_data(vacation_repo.clone())
            .app_data(photos.clone())
            .app_data(sessions.clone())
            // Auth, kiosk and protected routes with rate limiting
            .configure(|cfg| routes::configure(cfg, config_data.clone()))
    })
    .bind(server_addr)?
    .run()
    .await
}
