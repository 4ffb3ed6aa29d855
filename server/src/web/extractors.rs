// mapofus-server/src/web/extractors.rs

use crate::errors::AppError;
use crate::state::AppState;
use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use mapofus::model::Identity;
use mapofus::MapError;
use tracing::debug;

pub const SESSION_COOKIE: &str = "sb-access-token";

/// The caller behind a valid access token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Identity);

impl AuthenticatedUser {
  pub fn identity(&self) -> &Identity {
    &self.0
  }
}

/// `Authorization: Bearer <token>` first, then the session cookie.
fn access_token(req: &HttpRequest) -> Option<String> {
  let bearer = req
    .headers()
    .get(AUTHORIZATION)
    .and_then(|value| value.to_str().ok())
    .and_then(|value| {
      let (scheme, token) = value.split_once(' ')?;
      scheme.eq_ignore_ascii_case("bearer").then(|| token.trim().to_string())
    })
    .filter(|token| !token.is_empty());
  bearer.or_else(|| {
    req
      .cookie(SESSION_COOKIE)
      .map(|cookie| cookie.value().to_string())
      .filter(|token| !token.is_empty())
  })
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let token = access_token(req);
    let state = req.app_data::<web::Data<AppState>>().cloned();
    Box::pin(async move {
      let state = state.ok_or_else(|| AppError::Internal("application state not registered".to_string()))?;
      let Some(token) = token else {
        debug!("Request carried no access token.");
        return Err(MapError::Authentication("Unauthorized".to_string()).into());
      };
      match state.sessions.resolve(&token).await? {
        Some(identity) => Ok(AuthenticatedUser(identity)),
        None => Err(MapError::Authentication("Unauthorized".to_string()).into()),
      }
    })
  }
}
