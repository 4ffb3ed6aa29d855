// mapofus-server/src/web/handlers/admin.rs

use actix_web::{web, HttpResponse};
use mapofus::{AdminUpdateRequest, SettingsUpdate};
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::AuthenticatedUser;

/// Never fails for an authenticated caller; a failed lookup reads as "not admin".
#[instrument(name = "handler::admin_status", skip_all, fields(user_id = %user.identity().user_id))]
pub async fn admin_status_handler(app_state: web::Data<AppState>, user: AuthenticatedUser) -> HttpResponse {
  let status = app_state.admin.gate().is_admin(user.identity()).await;
  HttpResponse::Ok().json(status)
}

#[instrument(name = "handler::admin_list_maps", skip_all, fields(user_id = %user.identity().user_id))]
pub async fn list_all_maps_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let maps = app_state.admin.list_orders(user.identity()).await?;
  Ok(HttpResponse::Ok().json(json!({ "maps": maps })))
}

#[instrument(name = "handler::admin_update_map", skip(app_state, user, body), fields(map_id = %path.as_ref()))]
pub async fn update_map_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  path: web::Path<Uuid>,
  body: web::Json<AdminUpdateRequest>,
) -> Result<HttpResponse, AppError> {
  let map = app_state
    .admin
    .update_order_request(user.identity(), path.into_inner(), body.into_inner())
    .await?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "map": map })))
}

#[instrument(name = "handler::admin_get_settings", skip_all, fields(user_id = %user.identity().user_id))]
pub async fn get_settings_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let settings = app_state.admin.settings(user.identity()).await?;
  Ok(HttpResponse::Ok().json(settings))
}

#[instrument(name = "handler::admin_update_settings", skip_all, fields(user_id = %user.identity().user_id))]
pub async fn update_settings_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  body: web::Json<SettingsUpdate>,
) -> Result<HttpResponse, AppError> {
  let settings = app_state
    .admin
    .update_settings(user.identity(), &body.into_inner())
    .await?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "settings": settings })))
}
