// storefront/src/web/handlers/order_handlers.rs

//! The shopper's own orders and notifications. Reads run as the shopper, so
//! the store's row policies decide what is visible.

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;
use crate::store::Actor;
use crate::web::extractors::AuthenticatedSession;

#[instrument(name = "handler::list_orders", skip_all, fields(user_id = %auth.0.user_id))]
pub async fn list_orders_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedSession,
) -> Result<HttpResponse, AppError> {
  let user_id = auth.0.user_id;
  let orders = app_state.store.list_orders(&Actor::User(user_id), user_id).await?;
  Ok(HttpResponse::Ok().json(json!({ "orders": orders })))
}

#[instrument(name = "handler::get_order", skip(app_state, auth, path), fields(user_id = %auth.0.user_id, order_id = %path.as_ref()))]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedSession,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let order_id = path.into_inner();
  let actor = Actor::User(auth.0.user_id);
  let order = app_state
    .store
    .get_order(&actor, order_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Order {} not found.", order_id)))?;
  let payment = app_state.store.payment_for_order(&actor, order_id).await?;
  Ok(HttpResponse::Ok().json(json!({
      "order": order,
      "payment": payment,
  })))
}

#[instrument(name = "handler::list_notifications", skip_all, fields(user_id = %auth.0.user_id))]
pub async fn list_notifications_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedSession,
) -> Result<HttpResponse, AppError> {
  let user_id = auth.0.user_id;
  let notifications = app_state
    .store
    .list_notifications(&Actor::User(user_id), user_id)
    .await?;
  Ok(HttpResponse::Ok().json(json!({ "notifications": notifications })))
}
