// storefront/src/services/checkout.rs

//! Entry points for turning a cart into an order.

use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::cart::{CartStore, LocalStorage};
use crate::errors::{AppError, Result};
use crate::models::CartItem;
use crate::pipelines::contexts::CheckoutCtxData;
use crate::services::session::Session;
use crate::state::AppState;
use crate::store::StoreError;
use orderflow::{ContextData, PipelineResult};

/// Shipping and payment details entered at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckoutForm {
  pub full_name: String,
  pub email: String,
  pub phone: String,
  pub address: String,
  pub city: String,
  pub country: String,
  pub zip_code: String,
  pub payment_method: String,
}

impl CheckoutForm {
  /// Every field is required.
  pub fn validate(&self) -> Result<()> {
    let fields = [
      ("fullName", &self.full_name),
      ("email", &self.email),
      ("phone", &self.phone),
      ("address", &self.address),
      ("city", &self.city),
      ("country", &self.country),
      ("zipCode", &self.zip_code),
      ("paymentMethod", &self.payment_method),
    ];
    let missing: Vec<&str> = fields
      .iter()
      .filter(|(_, value)| value.trim().is_empty())
      .map(|(name, _)| *name)
      .collect();
    if missing.is_empty() {
      Ok(())
    } else {
      Err(AppError::Validation(format!("Missing checkout fields: {}", missing.join(", "))))
    }
  }

  /// Shipping and billing address as stored on the order.
  pub fn address_line(&self) -> String {
    format!(
      "{}, {}, {}, {}, {}",
      self.full_name.trim(),
      self.address.trim(),
      self.city.trim(),
      self.zip_code.trim(),
      self.country.trim()
    )
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutReceipt {
  pub order_id: Uuid,
  pub order_number: String,
  pub payment_id: Uuid,
  pub subtotal_cents: i64,
  pub tax_cents: i64,
  pub shipping_cents: i64,
  pub total_cents: i64,
  pub confirmation_path: String,
}

pub fn confirmation_path(order_id: Uuid) -> String {
  format!("/order-confirmation/{}", order_id)
}

/// Runs the checkout pipeline for `items` on behalf of `session`.
///
/// Validation, auth and lookup failures come back as-is. Any other failure is
/// reported as [`AppError::CheckoutFailed`]; rows already written by the run
/// have been compensated by then.
#[instrument(name = "checkout::submit", skip(state, session, items, form), fields(user_id = %session.user_id, lines = items.len()), err(Display))]
pub async fn submit(state: &AppState, session: &Session, items: Vec<CartItem>, form: CheckoutForm) -> Result<CheckoutReceipt> {
  let ctx_data = ContextData::new(CheckoutCtxData::new(state.clone(), session.clone(), items, form));

  match state.registry.run(ctx_data.clone()).await {
    Ok(PipelineResult::Completed) => {}
    Ok(PipelineResult::Stopped) => {
      warn!("Checkout pipeline stopped before completion.");
      return Err(AppError::PipelineHaltedByHandler);
    }
    Err(e) => return Err(surface_checkout_error(e)),
  }

  let guard = ctx_data.read();
  let (Some(order), Some(payment), Some(totals)) = (&guard.order, &guard.payment, guard.totals) else {
    return Err(AppError::Internal("Checkout completed without an order and payment.".to_string()));
  };
  info!(order_id = %order.id, payment_id = %payment.id, "Checkout completed.");
  Ok(CheckoutReceipt {
    order_id: order.id,
    order_number: order.order_number.clone(),
    payment_id: payment.id,
    subtotal_cents: totals.subtotal_cents,
    tax_cents: totals.tax_cents,
    shipping_cents: totals.shipping_cents,
    total_cents: totals.total_cents,
    confirmation_path: confirmation_path(order.id),
  })
}

/// Checks out whatever is in `cart`, emptying it only when the order went through.
#[instrument(name = "checkout::place_order", skip_all, fields(user_id = %session.user_id), err(Display))]
pub async fn place_order<S: LocalStorage>(
  state: &AppState,
  session: &Session,
  cart: &CartStore<S>,
  form: CheckoutForm,
) -> Result<CheckoutReceipt> {
  let items = cart.items()?;
  let receipt = submit(state, session, items, form).await?;
  cart.clear()?;
  Ok(receipt)
}

fn surface_checkout_error(err: AppError) -> AppError {
  match err {
    AppError::Validation(_) | AppError::Auth(_) | AppError::NotFound(_) | AppError::Forbidden(_) => err,
    AppError::Store(StoreError::PolicyViolation(_)) => err,
    other => {
      error!(error = %other, "Checkout failed.");
      AppError::CheckoutFailed {
        detail: other.to_string(),
      }
    }
  }
}
