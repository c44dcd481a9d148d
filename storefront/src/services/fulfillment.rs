// storefront/src/services/fulfillment.rs

//! Server-side fulfillment: order confirmation (stock) and payment
//! confirmation (settlement). Both run as the service actor.

use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::pipelines::contexts::{OrderConfirmationCtxData, PaymentConfirmationCtxData};
use crate::state::AppState;
use orderflow::{ContextData, PipelineResult};

pub const MISSING_FIELDS_MESSAGE: &str = "Missing required fields";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
  pub product_id: Uuid,
  pub quantity: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessOrderPayload {
  pub order_id: Option<String>,
  pub user_id: Option<String>,
  #[serde(default)]
  pub items: Vec<OrderLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessOrderResponse {
  pub success: bool,
  pub order_id: Uuid,
  /// Lines left untouched because stock was insufficient.
  pub skipped_items: Vec<OrderLine>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessPaymentPayload {
  pub payment_id: Option<String>,
  pub order_id: Option<String>,
  pub user_id: Option<String>,
  /// Major currency units, e.g. `76.0`.
  pub amount: Option<f64>,
  pub payment_method: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessPaymentResponse {
  pub success: bool,
  pub payment_id: Uuid,
  pub transaction_id: String,
  pub status: String,
}

/// Parses an optional id field, treating absent or blank as missing.
pub(crate) fn required_uuid(value: &Option<String>, field: &str) -> Result<Uuid> {
  let raw = value
    .as_deref()
    .map(str::trim)
    .filter(|v| !v.is_empty())
    .ok_or_else(|| AppError::Validation(MISSING_FIELDS_MESSAGE.to_string()))?;
  Uuid::parse_str(raw).map_err(|_| AppError::Validation(format!("Invalid {}: {}", field, raw)))
}

#[instrument(name = "fulfillment::confirm_order", skip_all, err(Display))]
pub async fn confirm_order(state: &AppState, payload: ProcessOrderPayload) -> Result<ProcessOrderResponse> {
  let ctx_data = ContextData::new(OrderConfirmationCtxData::new(state.clone(), payload));

  match state.registry.run(ctx_data.clone()).await {
    Ok(PipelineResult::Completed) => {}
    Ok(PipelineResult::Stopped) => return Err(AppError::PipelineHaltedByHandler),
    Err(e) => {
      error!(error = %e, "Order confirmation failed.");
      return Err(e);
    }
  }

  let guard = ctx_data.read();
  let input = guard
    .input
    .as_ref()
    .ok_or_else(|| AppError::Internal("Order confirmation finished without validated input.".to_string()))?;
  if !guard.skipped.is_empty() {
    warn!(order_id = %input.order_id, skipped = guard.skipped.len(), "Order confirmed with skipped lines.");
  }
  info!(order_id = %input.order_id, decremented = guard.decremented.len(), "Order confirmed.");
  Ok(ProcessOrderResponse {
    success: true,
    order_id: input.order_id,
    skipped_items: guard.skipped.clone(),
  })
}

#[instrument(name = "fulfillment::confirm_payment", skip_all, err(Display))]
pub async fn confirm_payment(state: &AppState, payload: ProcessPaymentPayload) -> Result<ProcessPaymentResponse> {
  let ctx_data = ContextData::new(PaymentConfirmationCtxData::new(state.clone(), payload));

  match state.registry.run(ctx_data.clone()).await {
    Ok(PipelineResult::Completed) => {}
    Ok(PipelineResult::Stopped) => return Err(AppError::PipelineHaltedByHandler),
    Err(e) => {
      error!(error = %e, "Payment confirmation failed.");
      return Err(e);
    }
  }

  let guard = ctx_data.read();
  let (Some(payment), Some(transaction_id)) = (&guard.payment, &guard.transaction_id) else {
    return Err(AppError::Internal("Payment confirmation finished without a transaction.".to_string()));
  };
  Ok(ProcessPaymentResponse {
    success: true,
    payment_id: payment.id,
    transaction_id: transaction_id.clone(),
    status: payment.status.as_str().to_string(),
  })
}
