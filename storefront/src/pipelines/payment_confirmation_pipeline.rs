// storefront/src/pipelines/payment_confirmation_pipeline.rs

//! `process-payment`: authorize, settle payment and order together, record
//! the attempt and notify the shopper.
//!
//! Repeating a call is not idempotent: each successful run appends another
//! history row and another notification.

use crate::errors::AppError;
use crate::models::{NewNotification, NewPaymentHistory, PaymentStatus};
use crate::pipelines::contexts::{PaymentConfirmationCtxData, PaymentConfirmationInput};
use crate::services::fulfillment::{required_uuid, MISSING_FIELDS_MESSAGE};
use crate::services::payment_gateway::{AuthorizationRequest, GatewayDecision};
use crate::services::pricing::{format_cents, major_to_cents};
use crate::store::{Actor, StoreError};
use chrono::Utc;
use orderflow::{ContextData, Pipeline, PipelineControl, Registry};
use serde_json::json;
use tracing::{debug, info, instrument, warn};

pub const PAYMENT_RECEIVED_TITLE: &str = "Payment Received";

pub fn register_payment_confirmation_pipeline(registry: &Registry<AppError>) {
  let mut p = Pipeline::<PaymentConfirmationCtxData, AppError>::new(&[
    ("validate_payment_request", false, None),
    ("authorize_with_gateway", false, None),
    ("settle_payment_and_order", false, None),
    ("append_payment_history", false, None),
    ("post_payment_received_notification", false, None),
  ]);

  p.on("validate_payment_request", validate_payment_request);
  p.on("authorize_with_gateway", authorize_with_gateway);
  p.on("settle_payment_and_order", settle_payment_and_order);
  p.on("append_payment_history", append_payment_history);
  p.on("post_payment_received_notification", post_payment_received_notification);

  registry.register_pipeline(p);
  info!("Payment confirmation pipeline registered.");
}

fn missing_fields() -> AppError {
  AppError::Validation(MISSING_FIELDS_MESSAGE.to_string())
}

fn validated_input(ctx: &PaymentConfirmationCtxData) -> Result<&PaymentConfirmationInput, AppError> {
  ctx
    .input
    .as_ref()
    .ok_or_else(|| AppError::Internal("Payment request was not validated.".to_string()))
}

#[instrument(name = "payment_confirmation::validate", skip_all, err(Display))]
async fn validate_payment_request(
  ctx_data: ContextData<PaymentConfirmationCtxData>,
) -> Result<PipelineControl, AppError> {
  let mut guard = ctx_data.write();
  let payload = &guard.payload;

  let payment_method = payload
    .payment_method
    .as_deref()
    .map(str::trim)
    .filter(|m| !m.is_empty())
    .ok_or_else(missing_fields)?
    .to_string();
  let amount_cents = payload
    .amount
    .and_then(major_to_cents)
    .filter(|cents| *cents > 0)
    .ok_or_else(missing_fields)?;
  let payment_id = required_uuid(&payload.payment_id, "paymentId")?;
  let order_id = required_uuid(&payload.order_id, "orderId")?;
  let user_id = required_uuid(&payload.user_id, "userId")?;

  debug!(%payment_id, %order_id, amount_cents, "Payment request validated.");
  guard.input = Some(PaymentConfirmationInput {
    payment_id,
    order_id,
    user_id,
    amount_cents,
    payment_method,
  });
  Ok(PipelineControl::Continue)
}

#[instrument(name = "payment_confirmation::authorize", skip_all, err(Display))]
async fn authorize_with_gateway(
  ctx_data: ContextData<PaymentConfirmationCtxData>,
) -> Result<PipelineControl, AppError> {
  let (store, gateway, input) = {
    let guard = ctx_data.read();
    let input = validated_input(&guard)?.clone();
    (guard.app_state.store.clone(), guard.app_state.gateway.clone(), input)
  };

  let payment = store
    .get_payment(&Actor::Service, input.payment_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Payment {} not found.", input.payment_id)))?;
  if payment.order_id != input.order_id || payment.user_id != input.user_id {
    warn!(payment_id = %input.payment_id, "Payment does not match the given order and user.");
    return Err(AppError::Forbidden(format!(
      "Payment {} does not belong to order {}.",
      input.payment_id, input.order_id
    )));
  }
  if !payment.status.accepts_settlement() {
    warn!(payment_id = %input.payment_id, status = payment.status.as_str(), "Payment can no longer be settled.");
    return Err(AppError::Store(StoreError::InvalidState(format!(
      "Payment {} is {} and cannot be settled.",
      input.payment_id,
      payment.status.as_str()
    ))));
  }

  let request = AuthorizationRequest {
    payment_id: input.payment_id,
    order_id: input.order_id,
    amount_cents: input.amount_cents,
    payment_method: input.payment_method.clone(),
  };
  match gateway.authorize(&request).await? {
    GatewayDecision::Approved { transaction_id } => {
      ctx_data.update(|ctx| {
        ctx.payment = Some(payment);
        ctx.transaction_id = Some(transaction_id);
      });
      Ok(PipelineControl::Continue)
    }
    GatewayDecision::Declined { reason } => {
      warn!(payment_id = %input.payment_id, %reason, "Payment declined by gateway.");
      store
        .set_payment_status(&Actor::Service, input.payment_id, PaymentStatus::Failed)
        .await?;
      store
        .insert_payment_history(
          &Actor::Service,
          NewPaymentHistory {
            payment_id: input.payment_id,
            status: PaymentStatus::Failed,
            response: json!({
              "reason": reason,
              "timestamp": Utc::now().to_rfc3339(),
              "amount_cents": input.amount_cents,
              "payment_method": input.payment_method,
            }),
          },
        )
        .await?;
      Err(AppError::Payment(format!("Payment declined: {}", reason)))
    }
  }
}

#[instrument(name = "payment_confirmation::settle", skip_all, err(Display))]
async fn settle_payment_and_order(
  ctx_data: ContextData<PaymentConfirmationCtxData>,
) -> Result<PipelineControl, AppError> {
  let (store, payment_id, order_id, transaction_id) = {
    let guard = ctx_data.read();
    let input = validated_input(&guard)?;
    let transaction_id = guard
      .transaction_id
      .clone()
      .ok_or_else(|| AppError::Internal("No transaction id before settlement.".to_string()))?;
    (guard.app_state.store.clone(), input.payment_id, input.order_id, transaction_id)
  };

  store
    .settle_payment(&Actor::Service, payment_id, order_id, &transaction_id)
    .await?;
  info!(%payment_id, %order_id, %transaction_id, "Payment settled and order confirmed.");

  ctx_data.update(|ctx| {
    if let Some(payment) = ctx.payment.as_mut() {
      payment.status = PaymentStatus::Success;
      payment.transaction_id = Some(transaction_id);
    }
  });
  Ok(PipelineControl::Continue)
}

#[instrument(name = "payment_confirmation::history", skip_all, err(Display))]
async fn append_payment_history(
  ctx_data: ContextData<PaymentConfirmationCtxData>,
) -> Result<PipelineControl, AppError> {
  let (store, entry) = {
    let guard = ctx_data.read();
    let input = validated_input(&guard)?;
    let entry = NewPaymentHistory {
      payment_id: input.payment_id,
      status: PaymentStatus::Success,
      response: json!({
        "transaction_id": guard.transaction_id,
        "timestamp": Utc::now().to_rfc3339(),
        "amount_cents": input.amount_cents,
        "payment_method": input.payment_method,
      }),
    };
    (guard.app_state.store.clone(), entry)
  };

  let row = store.insert_payment_history(&Actor::Service, entry).await?;
  ctx_data.write().history_id = Some(row.id);
  Ok(PipelineControl::Continue)
}

#[instrument(name = "payment_confirmation::notify", skip_all, err(Display))]
async fn post_payment_received_notification(
  ctx_data: ContextData<PaymentConfirmationCtxData>,
) -> Result<PipelineControl, AppError> {
  let (store, notification) = {
    let guard = ctx_data.read();
    let input = validated_input(&guard)?;
    let notification = NewNotification {
      user_id: input.user_id,
      title: PAYMENT_RECEIVED_TITLE.to_string(),
      message: payment_received_message(input.amount_cents),
      notification_type: "payment".to_string(),
      related_id: Some(input.order_id),
    };
    (guard.app_state.store.clone(), notification)
  };

  let row = store.insert_notification(&Actor::Service, notification).await?;
  ctx_data.write().notification_id = Some(row.id);
  Ok(PipelineControl::Continue)
}

fn payment_received_message(amount_cents: i64) -> String {
  format!("Your payment of {} has been received.", format_cents(amount_cents))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn message_interpolates_major_units() {
    assert_eq!(payment_received_message(7600), "Your payment of $76.00 has been received.");
    assert_eq!(payment_received_message(1999), "Your payment of $19.99 has been received.");
  }
}
