// storefront/src/web/handlers/checkout_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::instrument;

use crate::errors::AppError;
use crate::models::CartItem;
use crate::services::checkout::{self, CheckoutForm};
use crate::state::AppState;
use crate::web::extractors::AuthenticatedSession;

/// The client's cart lines plus the checkout form fields at the top level.
#[derive(Deserialize, Debug)]
pub struct CheckoutRequestPayload {
  #[serde(default)]
  pub items: Vec<CartItem>,
  #[serde(flatten)]
  pub form: CheckoutForm,
}

#[instrument(
    name = "handler::checkout",
    skip(app_state, auth, req_payload),
    fields(user_id = %auth.0.user_id)
)]
pub async fn checkout_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedSession,
  req_payload: web::Json<CheckoutRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let CheckoutRequestPayload { items, form } = req_payload.into_inner();
  let receipt = checkout::submit(&app_state, &auth.0, items, form).await?;
  Ok(HttpResponse::Created().json(receipt))
}
