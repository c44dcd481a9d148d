// storefront/src/pipelines/order_confirmation_pipeline.rs

//! `process-order`: decrement stock per line, then tell the shopper.
//!
//! Lines without enough stock are skipped, not failed. Nothing here is
//! compensated; a failure part-way leaves earlier decrements in place.

use crate::errors::AppError;
use crate::models::NewNotification;
use crate::pipelines::contexts::{OrderConfirmationCtxData, OrderConfirmationInput};
use crate::services::fulfillment::required_uuid;
use crate::store::{Actor, StoreError};
use orderflow::{ContextData, Pipeline, PipelineControl, Registry};
use tracing::{debug, info, instrument, warn};

pub const ORDER_CONFIRMED_TITLE: &str = "Order Confirmed";

pub fn register_order_confirmation_pipeline(registry: &Registry<AppError>) {
  let mut p = Pipeline::<OrderConfirmationCtxData, AppError>::new(&[
    ("validate_order_request", false, None),
    ("load_order", false, None),
    ("decrement_stock_lines", false, None),
    ("post_order_confirmed_notification", false, None),
  ]);

  p.on("validate_order_request", validate_order_request);
  p.on("load_order", load_order);
  p.on("decrement_stock_lines", decrement_stock_lines);
  p.on("post_order_confirmed_notification", post_order_confirmed_notification);

  registry.register_pipeline(p);
  info!("Order confirmation pipeline registered.");
}

#[instrument(name = "order_confirmation::validate", skip_all, err(Display))]
async fn validate_order_request(ctx_data: ContextData<OrderConfirmationCtxData>) -> Result<PipelineControl, AppError> {
  let mut guard = ctx_data.write();
  let order_id = required_uuid(&guard.payload.order_id, "orderId")?;
  let user_id = required_uuid(&guard.payload.user_id, "userId")?;
  if let Some(bad) = guard.payload.items.iter().find(|line| line.quantity <= 0) {
    return Err(AppError::Validation(format!(
      "Quantity for product {} must be positive.",
      bad.product_id
    )));
  }
  let items = guard.payload.items.clone();
  debug!(%order_id, lines = items.len(), "Order confirmation request validated.");
  guard.input = Some(OrderConfirmationInput { order_id, user_id, items });
  Ok(PipelineControl::Continue)
}

#[instrument(name = "order_confirmation::load_order", skip_all, err(Display))]
async fn load_order(ctx_data: ContextData<OrderConfirmationCtxData>) -> Result<PipelineControl, AppError> {
  let (store, order_id, user_id) = {
    let guard = ctx_data.read();
    let input = guard
      .input
      .as_ref()
      .ok_or_else(|| AppError::Internal("Order request was not validated.".to_string()))?;
    (guard.app_state.store.clone(), input.order_id, input.user_id)
  };

  let order = store
    .get_order(&Actor::Service, order_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Order {} not found.", order_id)))?;
  if order.user_id != user_id {
    warn!(%order_id, "Order confirmation for an order owned by another user.");
    return Err(AppError::Forbidden(format!("Order {} does not belong to user {}.", order_id, user_id)));
  }
  if order.status.is_terminal_failure() {
    warn!(%order_id, status = ?order.status, "Order confirmation for a dead order refused.");
    return Err(AppError::Store(StoreError::InvalidState(format!(
      "Order {} is {:?} and cannot be fulfilled.",
      order_id, order.status
    ))));
  }
  ctx_data.write().order = Some(order);
  Ok(PipelineControl::Continue)
}

#[instrument(name = "order_confirmation::decrement_stock", skip_all, err(Display))]
async fn decrement_stock_lines(ctx_data: ContextData<OrderConfirmationCtxData>) -> Result<PipelineControl, AppError> {
  let (store, lines) = {
    let guard = ctx_data.read();
    let lines = guard.input.as_ref().map(|i| i.items.clone()).unwrap_or_default();
    (guard.app_state.store.clone(), lines)
  };

  for line in lines {
    let applied = store
      .decrement_stock_if_available(&Actor::Service, line.product_id, line.quantity)
      .await?;
    if applied {
      debug!(product_id = %line.product_id, quantity = line.quantity, "Stock decremented.");
      ctx_data.write().decremented.push(line);
    } else {
      warn!(
        product_id = %line.product_id,
        quantity = line.quantity,
        "Insufficient stock, line skipped."
      );
      ctx_data.write().skipped.push(line);
    }
  }
  Ok(PipelineControl::Continue)
}

#[instrument(name = "order_confirmation::notify", skip_all, err(Display))]
async fn post_order_confirmed_notification(
  ctx_data: ContextData<OrderConfirmationCtxData>,
) -> Result<PipelineControl, AppError> {
  let (store, notification) = {
    let guard = ctx_data.read();
    let order = guard
      .order
      .as_ref()
      .ok_or_else(|| AppError::Internal("Order was not loaded.".to_string()))?;
    let notification = NewNotification {
      user_id: order.user_id,
      title: ORDER_CONFIRMED_TITLE.to_string(),
      message: format!("Your order {} has been confirmed and is being processed.", order.order_number),
      notification_type: "order".to_string(),
      related_id: Some(order.id),
    };
    (guard.app_state.store.clone(), notification)
  };

  let row = store.insert_notification(&Actor::Service, notification).await?;
  ctx_data.write().notification_id = Some(row.id);
  Ok(PipelineControl::Continue)
}
