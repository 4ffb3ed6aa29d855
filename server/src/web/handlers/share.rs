// mapofus-server/src/web/handlers/share.rs

use actix_web::{web, HttpResponse};
use tracing::instrument;
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

/// Public, unauthenticated view of a map.
#[instrument(name = "handler::shared_map", skip(app_state), fields(map_id = %path.as_ref()))]
pub async fn shared_map_handler(app_state: web::Data<AppState>, path: web::Path<Uuid>) -> Result<HttpResponse, AppError> {
  let shared = app_state.orders.share(path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(shared))
}
