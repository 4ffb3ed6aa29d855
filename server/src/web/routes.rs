// mapofus-server/src/web/routes.rs

use crate::errors::AppError;
use crate::web::handlers::{admin, health, maps, share, webhook};
use actix_web::web;
use mapofus::MapError;

fn json_config() -> web::JsonConfig {
  web::JsonConfig::default()
    .limit(64 * 1024)
    .error_handler(|err, _req| AppError::from(MapError::validation(format!("Invalid request body: {err}"))).into())
}

fn path_config() -> web::PathConfig {
  web::PathConfig::default()
    .error_handler(|err, _req| AppError::from(MapError::invalid_field("map_id", format!("Invalid map id: {err}"))).into())
}

/// Mounts every route under `/api/v1`.
pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api/v1")
      .app_data(json_config())
      .app_data(path_config())
      .route("/health", web::get().to(health::health_check_handler))
      .service(
        web::scope("/maps")
          .route("", web::post().to(maps::create_map_handler))
          .route("", web::get().to(maps::list_my_maps_handler))
          .route("/{map_id}", web::get().to(maps::get_map_handler))
          .route("/{map_id}/invoice", web::post().to(maps::submit_invoice_handler))
          .route("/{map_id}/download", web::get().to(maps::download_map_handler)),
      )
      .route("/share/{map_id}", web::get().to(share::shared_map_handler))
      .service(
        web::scope("/admin")
          .route("/status", web::get().to(admin::admin_status_handler))
          .route("/maps", web::get().to(admin::list_all_maps_handler))
          .route("/maps/{map_id}", web::patch().to(admin::update_map_handler))
          .route("/settings", web::get().to(admin::get_settings_handler))
          .route("/settings", web::patch().to(admin::update_settings_handler)),
      )
      .route("/payment-webhook", web::post().to(webhook::payment_webhook_handler)),
  );
}
