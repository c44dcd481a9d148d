// storefront/src/pipelines/checkout_pipeline.rs

//! Cart → Order → Payment → Notification, strictly in that order.
//!
//! The order and payment inserts carry compensations: if a later step fails
//! the order is moved to `abandoned` and the payment to `failed`, so a broken
//! checkout leaves no live rows behind.

use crate::errors::AppError;
use crate::models::{NewNotification, NewOrder, NewPayment, OrderStatus, PaymentStatus};
use crate::pipelines::contexts::CheckoutCtxData;
use crate::services::identifiers;
use crate::services::pricing::MAX_LINE_QUANTITY;
use chrono::Utc;
use orderflow::{ContextData, Pipeline, PipelineControl, Registry};
use std::collections::HashMap;
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub const ORDER_PLACED_TITLE: &str = "Order Placed";

pub fn register_checkout_pipeline(registry: &Registry<AppError>) {
  let mut p = Pipeline::<CheckoutCtxData, AppError>::new(&[
    ("validate_checkout_input", false, None),
    ("resolve_unit_prices", false, None),
    ("compute_order_totals", false, None),
    ("insert_order_record", false, None),
    ("insert_payment_record", false, None),
    ("insert_order_notification", false, None),
  ]);

  p.on("validate_checkout_input", validate_checkout_input);
  p.on("resolve_unit_prices", resolve_unit_prices);
  p.on("compute_order_totals", compute_order_totals);
  p.on("insert_order_record", insert_order_record);
  p.compensate("insert_order_record", abandon_order);
  p.on("insert_payment_record", insert_payment_record);
  p.compensate("insert_payment_record", fail_payment);
  p.on("insert_order_notification", insert_order_notification);

  registry.register_pipeline(p);
  info!("Checkout pipeline registered.");
}

#[instrument(name = "checkout::validate_input", skip_all, err(Display))]
async fn validate_checkout_input(ctx_data: ContextData<CheckoutCtxData>) -> Result<PipelineControl, AppError> {
  let (sessions, session, items, form) = {
    let guard = ctx_data.read();
    (
      guard.app_state.sessions.clone(),
      guard.session.clone(),
      guard.items.clone(),
      guard.form.clone(),
    )
  };

  sessions.ensure_live(&session)?;
  if items.is_empty() {
    return Err(AppError::Validation("Your cart is empty.".to_string()));
  }
  if items.iter().any(|i| i.quantity == 0) {
    return Err(AppError::Validation("Cart quantities must be positive.".to_string()));
  }
  form.validate()?;

  // Repeated product ids collapse into one line, keeping first-seen order.
  let mut merged: Vec<crate::models::CartItem> = Vec::with_capacity(items.len());
  for item in items {
    match merged.iter_mut().find(|m| m.product_id == item.product_id) {
      Some(line) => line.quantity = line.quantity.saturating_add(item.quantity),
      None => merged.push(item),
    }
  }
  if let Some(line) = merged.iter().find(|m| m.quantity > MAX_LINE_QUANTITY) {
    return Err(AppError::Validation(format!(
      "Quantity for product {} may not exceed {}.",
      line.product_id, MAX_LINE_QUANTITY
    )));
  }
  ctx_data.write().items = merged;
  Ok(PipelineControl::Continue)
}

#[instrument(name = "checkout::resolve_unit_prices", skip_all, err(Display))]
async fn resolve_unit_prices(ctx_data: ContextData<CheckoutCtxData>) -> Result<PipelineControl, AppError> {
  let (catalog, product_ids) = {
    let guard = ctx_data.read();
    let ids: Vec<Uuid> = guard.items.iter().map(|i| i.product_id).collect();
    (guard.app_state.catalog.clone(), ids)
  };

  let prices = catalog.unit_prices(&product_ids).await?;
  ctx_data.write().unit_prices = prices;
  Ok(PipelineControl::Continue)
}

#[instrument(name = "checkout::compute_totals", skip_all, err(Display))]
async fn compute_order_totals(ctx_data: ContextData<CheckoutCtxData>) -> Result<PipelineControl, AppError> {
  let mut guard = ctx_data.write();
  let rules = guard.app_state.config.pricing_rules();
  let lines = priced_lines(&guard.items, &guard.unit_prices)?;
  let totals = rules.totals(lines).ok_or_else(|| {
    warn!("Order total exceeds the supported amount.");
    AppError::Validation("Order total is too large.".to_string())
  })?;
  info!(
    subtotal_cents = totals.subtotal_cents,
    tax_cents = totals.tax_cents,
    shipping_cents = totals.shipping_cents,
    total_cents = totals.total_cents,
    "Order totals computed."
  );
  guard.totals = Some(totals);
  Ok(PipelineControl::Continue)
}

fn priced_lines(
  items: &[crate::models::CartItem],
  unit_prices: &HashMap<Uuid, i64>,
) -> Result<Vec<(i64, u32)>, AppError> {
  items
    .iter()
    .map(|item| {
      unit_prices
        .get(&item.product_id)
        .map(|price| (*price, item.quantity))
        .ok_or_else(|| AppError::Internal(format!("No resolved price for product {}", item.product_id)))
    })
    .collect()
}

#[instrument(name = "checkout::insert_order", skip_all, err(Display))]
async fn insert_order_record(ctx_data: ContextData<CheckoutCtxData>) -> Result<PipelineControl, AppError> {
  let (store, actor, new_order) = {
    let guard = ctx_data.read();
    let totals = guard
      .totals
      .ok_or_else(|| AppError::Internal("Order totals were not computed.".to_string()))?;
    let address = guard.form.address_line();
    let new_order = NewOrder {
      user_id: guard.session.user_id,
      order_number: identifiers::order_number(Utc::now()),
      total_amount_cents: totals.total_cents,
      tax_amount_cents: totals.tax_cents,
      shipping_cost_cents: totals.shipping_cents,
      subtotal_cents: totals.subtotal_cents,
      shipping_address: address.clone(),
      billing_address: address,
    };
    (guard.app_state.store.clone(), guard.actor(), new_order)
  };

  let order = store.insert_order(&actor, new_order).await?;
  info!(order_id = %order.id, order_number = %order.order_number, "Order record created.");
  ctx_data.write().order = Some(order);
  Ok(PipelineControl::Continue)
}

#[instrument(name = "checkout::abandon_order", skip_all, err(Display))]
async fn abandon_order(ctx_data: ContextData<CheckoutCtxData>) -> Result<(), AppError> {
  let (store, actor, order_id) = {
    let guard = ctx_data.read();
    (guard.app_state.store.clone(), guard.actor(), guard.order.as_ref().map(|o| o.id))
  };
  let Some(order_id) = order_id else {
    return Ok(());
  };
  store.set_order_status(&actor, order_id, OrderStatus::Abandoned).await?;
  warn!(%order_id, "Order abandoned after a later checkout step failed.");
  if let Some(order) = ctx_data.write().order.as_mut() {
    order.status = OrderStatus::Abandoned;
  }
  Ok(())
}

#[instrument(name = "checkout::insert_payment", skip_all, err(Display))]
async fn insert_payment_record(ctx_data: ContextData<CheckoutCtxData>) -> Result<PipelineControl, AppError> {
  let (store, actor, new_payment) = {
    let guard = ctx_data.read();
    let order = guard
      .order
      .as_ref()
      .ok_or_else(|| AppError::Internal("Order record missing before payment insert.".to_string()))?;
    let new_payment = NewPayment {
      order_id: order.id,
      user_id: order.user_id,
      payment_method: guard.form.payment_method.trim().to_string(),
      amount_cents: order.total_amount_cents,
      status: PaymentStatus::Processing,
    };
    (guard.app_state.store.clone(), guard.actor(), new_payment)
  };

  let payment = store.insert_payment(&actor, new_payment).await?;
  info!(payment_id = %payment.id, "Payment record created.");
  ctx_data.write().payment = Some(payment);
  Ok(PipelineControl::Continue)
}

#[instrument(name = "checkout::fail_payment", skip_all, err(Display))]
async fn fail_payment(ctx_data: ContextData<CheckoutCtxData>) -> Result<(), AppError> {
  let (store, actor, payment_id) = {
    let guard = ctx_data.read();
    (guard.app_state.store.clone(), guard.actor(), guard.payment.as_ref().map(|p| p.id))
  };
  let Some(payment_id) = payment_id else {
    return Ok(());
  };
  store.set_payment_status(&actor, payment_id, PaymentStatus::Failed).await?;
  if let Some(payment) = ctx_data.write().payment.as_mut() {
    payment.status = PaymentStatus::Failed;
  }
  Ok(())
}

#[instrument(name = "checkout::insert_notification", skip_all, err(Display))]
async fn insert_order_notification(ctx_data: ContextData<CheckoutCtxData>) -> Result<PipelineControl, AppError> {
  let (store, actor, notification) = {
    let guard = ctx_data.read();
    let order = guard
      .order
      .as_ref()
      .ok_or_else(|| AppError::Internal("Order record missing before notification.".to_string()))?;
    let notification = NewNotification {
      user_id: order.user_id,
      title: ORDER_PLACED_TITLE.to_string(),
      message: format!("Your order {} has been placed successfully.", order.order_number),
      notification_type: "order".to_string(),
      related_id: Some(order.id),
    };
    (guard.app_state.store.clone(), guard.actor(), notification)
  };

  let row = store.insert_notification(&actor, notification).await?;
  ctx_data.write().notification_id = Some(row.id);
  Ok(PipelineControl::Continue)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::CartItem;

  #[test]
  fn priced_lines_require_every_price() {
    let known = Uuid::new_v4();
    let unknown = Uuid::new_v4();
    let prices = HashMap::from([(known, 2000)]);

    let lines = priced_lines(&[CartItem { product_id: known, quantity: 3 }], &prices).unwrap();
    assert_eq!(lines, vec![(2000, 3)]);

    let err = priced_lines(
      &[
        CartItem { product_id: known, quantity: 1 },
        CartItem { product_id: unknown, quantity: 1 },
      ],
      &prices,
    )
    .unwrap_err();
    assert!(matches!(err, AppError::Internal(_)));
  }
}
