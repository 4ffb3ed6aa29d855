// mapofus-server/src/main.rs

use actix_web::{web as actix_data, App, HttpServer};
use mapofus_server::config::{AppConfig, LogFormat};
use mapofus_server::state::AppState;
use mapofus_server::{db, telemetry, web};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
  dotenvy::dotenv().ok();
  telemetry::init_tracing(LogFormat::from_env());

  tracing::info!("Starting Map of Us server...");

  let app_config = AppConfig::from_env().map_err(|e| {
    tracing::error!(error = %e, "Failed to load application configuration.");
    e
  })?;

  let db_pool = db::connect(&app_config).await.map_err(|e| {
    tracing::error!(error = %e, "Failed to connect to the database.");
    e
  })?;

  let app_state = AppState::from_config(&app_config, db_pool)?;

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(web::configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await?;

  tracing::info!("Server stopped.");
  Ok(())
}
