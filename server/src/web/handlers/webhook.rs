// mapofus-server/src/web/handlers/webhook.rs

use actix_web::HttpResponse;
use serde_json::json;
use tracing::warn;

/// Payments are verified by hand from submitted invoice numbers; the old
/// gateway callback is gone for good.
pub async fn payment_webhook_handler() -> HttpResponse {
  warn!("Deprecated payment webhook was called.");
  HttpResponse::Gone().json(json!({
    "error": "This endpoint has been deprecated. Payment is now handled manually via invoice submission.",
    "code": "GONE",
    "status": 410,
  }))
}
