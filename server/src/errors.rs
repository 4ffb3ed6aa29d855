// mapofus-server/src/errors.rs

use actix_web::http::{header, StatusCode};
use actix_web::{HttpResponse, ResponseError};
use mapofus::MapError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error(transparent)]
  Domain(#[from] MapError),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    match err.downcast::<MapError>() {
      Ok(map_err) => AppError::Domain(map_err),
      Err(other) => match other.downcast::<sqlx::Error>() {
        Ok(sqlx_err) => AppError::Sqlx(sqlx_err),
        Err(other) => AppError::Internal(format!("{other:#}")),
      },
    }
  }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
  pub error: String,
  pub code: &'static str,
  pub status: u16,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub field: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub retry_after: Option<u64>,
}

const GENERIC_MESSAGE: &str = "An internal error occurred";

impl AppError {
  fn domain(&self) -> Option<&MapError> {
    match self {
      AppError::Domain(e) => Some(e),
      _ => None,
    }
  }

  pub fn body(&self) -> ErrorBody {
    match self.domain() {
      Some(e) => {
        let status = e.status_code();
        let (field, retry_after) = match e {
          MapError::Validation { field, .. } => (field.clone(), None),
          MapError::RateLimit { retry_after_secs } => (None, *retry_after_secs),
          _ => (None, None),
        };
        ErrorBody {
          error: if e.is_client_facing() {
            e.to_string()
          } else {
            GENERIC_MESSAGE.to_string()
          },
          code: e.code(),
          status,
          field,
          retry_after,
        }
      }
      None => ErrorBody {
        error: GENERIC_MESSAGE.to_string(),
        code: match self {
          AppError::Sqlx(_) => "PERSISTENCE_ERROR",
          _ => "INTERNAL_ERROR",
        },
        status: 500,
        field: None,
        retry_after: None,
      },
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    let code = self.domain().map_or(500, MapError::status_code);
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
  }

  fn error_response(&self) -> HttpResponse {
    let body = self.body();
    if body.status >= 500 {
      tracing::error!(application_error = %self, code = body.code, "Responding with error");
    } else {
      tracing::warn!(application_error = %self, code = body.code, "Responding with error");
    }
    let mut response = HttpResponse::build(self.status_code());
    if let Some(secs) = body.retry_after {
      response.insert_header((header::RETRY_AFTER, secs.to_string()));
    }
    response.json(body)
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
