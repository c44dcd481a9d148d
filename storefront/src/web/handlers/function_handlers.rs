// storefront/src/web/handlers/function_handlers.rs

//! `/functions/v1/*`: server-side fulfillment, callable only with the service key.

use actix_web::{error::JsonPayloadError, web, HttpRequest, HttpResponse};
use tracing::{instrument, warn};

use crate::errors::AppError;
use crate::services::fulfillment::{self, ProcessOrderPayload, ProcessPaymentPayload, MISSING_FIELDS_MESSAGE};
use crate::state::AppState;
use crate::web::extractors::ServiceCaller;

/// CORS preflight.
pub async fn preflight_handler() -> HttpResponse {
  HttpResponse::Ok().content_type("text/plain").body("ok")
}

/// Unreadable `process-order` bodies fail like any other order failure.
pub fn order_json_config() -> web::JsonConfig {
  web::JsonConfig::default().error_handler(|err: JsonPayloadError, _req: &HttpRequest| {
    warn!(error = %err, "Unreadable process-order body.");
    AppError::Internal(format!("Invalid request body: {}", err)).into()
  })
}

/// Unreadable `process-payment` bodies are reported as missing fields.
pub fn payment_json_config() -> web::JsonConfig {
  web::JsonConfig::default().error_handler(|err: JsonPayloadError, _req: &HttpRequest| {
    warn!(error = %err, "Unreadable process-payment body.");
    AppError::Validation(MISSING_FIELDS_MESSAGE.to_string()).into()
  })
}

#[instrument(name = "handler::process_order", skip_all)]
pub async fn process_order_handler(
  _caller: ServiceCaller,
  app_state: web::Data<AppState>,
  req_payload: web::Json<ProcessOrderPayload>,
) -> Result<HttpResponse, AppError> {
  let response = fulfillment::confirm_order(&app_state, req_payload.into_inner())
    .await
    .map_err(order_failure)?;
  Ok(HttpResponse::Ok().json(response))
}

#[instrument(name = "handler::process_payment", skip_all)]
pub async fn process_payment_handler(
  _caller: ServiceCaller,
  app_state: web::Data<AppState>,
  req_payload: web::Json<ProcessPaymentPayload>,
) -> Result<HttpResponse, AppError> {
  let response = fulfillment::confirm_payment(&app_state, req_payload.into_inner())
    .await
    .map_err(payment_failure)?;
  Ok(HttpResponse::Ok().json(response))
}

// Every order-confirmation failure is a 500 carrying the message.
fn order_failure(err: AppError) -> AppError {
  match err {
    AppError::Auth(_) | AppError::Internal(_) => err,
    other => AppError::Internal(other.public_message()),
  }
}

// Missing fields stay 400 and declines stay 402; everything else is a 500.
fn payment_failure(err: AppError) -> AppError {
  match err {
    AppError::Auth(_) | AppError::Validation(_) | AppError::Payment(_) | AppError::Internal(_) => err,
    other => AppError::Internal(other.public_message()),
  }
}
