// mapofus-server/src/web/handlers/maps.rs

use actix_web::http::header::LOCATION;
use actix_web::{web, HttpResponse};
use mapofus::CreateOrderRequest;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::AuthenticatedUser;

#[derive(Deserialize, Debug)]
pub struct InvoiceRequest {
  pub invoice_number: String,
}

#[instrument(name = "handler::create_map", skip_all, fields(user_id = %user.identity().user_id))]
pub async fn create_map_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  body: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, AppError> {
  let order = app_state
    .generation
    .create_order(user.identity(), body.into_inner())
    .await?;
  info!(order_id = %order.id, "Map created.");
  Ok(HttpResponse::Created().json(order))
}

#[instrument(name = "handler::list_my_maps", skip_all, fields(user_id = %user.identity().user_id))]
pub async fn list_my_maps_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let maps = app_state.orders.list_mine(user.identity()).await?;
  Ok(HttpResponse::Ok().json(json!({ "maps": maps })))
}

#[instrument(name = "handler::get_map", skip(app_state, user), fields(map_id = %path.as_ref()))]
pub async fn get_map_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let preview = app_state
    .orders
    .get_for_owner(user.identity(), path.into_inner())
    .await?;
  Ok(HttpResponse::Ok().json(preview))
}

#[instrument(name = "handler::submit_invoice", skip(app_state, user, body), fields(map_id = %path.as_ref()))]
pub async fn submit_invoice_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  path: web::Path<Uuid>,
  body: web::Json<InvoiceRequest>,
) -> Result<HttpResponse, AppError> {
  let map = app_state
    .orders
    .submit_invoice(user.identity(), path.into_inner(), &body.invoice_number)
    .await?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "map": map })))
}

#[instrument(name = "handler::download_map", skip(app_state, user), fields(map_id = %path.as_ref()))]
pub async fn download_map_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let url = app_state.orders.download(user.identity(), path.into_inner()).await?;
  Ok(HttpResponse::Found().insert_header((LOCATION, url)).finish())
}
