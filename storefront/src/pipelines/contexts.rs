// storefront/src/pipelines/contexts.rs

//! Data carried through each pipeline run. Handlers receive these wrapped in
//! `orderflow::ContextData`; inputs are set by the caller, the `Option`
//! fields are filled in step by step.

use std::collections::HashMap;
use uuid::Uuid;

use crate::models::{CartItem, Order, Payment};
use crate::services::checkout::CheckoutForm;
use crate::services::fulfillment::{OrderLine, ProcessOrderPayload, ProcessPaymentPayload};
use crate::services::pricing::OrderTotals;
use crate::services::session::Session;
use crate::state::AppState;
use crate::store::Actor;

#[derive(Clone)]
pub struct CheckoutCtxData {
  pub app_state: AppState,
  pub session: Session,
  pub items: Vec<CartItem>,
  pub form: CheckoutForm,
  pub unit_prices: HashMap<Uuid, i64>,
  pub totals: Option<OrderTotals>,
  pub order: Option<Order>,
  pub payment: Option<Payment>,
  pub notification_id: Option<Uuid>,
}

impl CheckoutCtxData {
  pub fn new(app_state: AppState, session: Session, items: Vec<CartItem>, form: CheckoutForm) -> Self {
    Self {
      app_state,
      session,
      items,
      form,
      unit_prices: HashMap::new(),
      totals: None,
      order: None,
      payment: None,
      notification_id: None,
    }
  }

  /// Checkout writes run as the signed-in shopper.
  pub fn actor(&self) -> Actor {
    Actor::User(self.session.user_id)
  }
}

/// Validated `process-order` input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderConfirmationInput {
  pub order_id: Uuid,
  pub user_id: Uuid,
  pub items: Vec<OrderLine>,
}

#[derive(Clone)]
pub struct OrderConfirmationCtxData {
  pub app_state: AppState,
  pub payload: ProcessOrderPayload,
  pub input: Option<OrderConfirmationInput>,
  pub order: Option<Order>,
  pub decremented: Vec<OrderLine>,
  pub skipped: Vec<OrderLine>,
  pub notification_id: Option<Uuid>,
}

impl OrderConfirmationCtxData {
  pub fn new(app_state: AppState, payload: ProcessOrderPayload) -> Self {
    Self {
      app_state,
      payload,
      input: None,
      order: None,
      decremented: Vec::new(),
      skipped: Vec::new(),
      notification_id: None,
    }
  }
}

/// Validated `process-payment` input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentConfirmationInput {
  pub payment_id: Uuid,
  pub order_id: Uuid,
  pub user_id: Uuid,
  pub amount_cents: i64,
  pub payment_method: String,
}

#[derive(Clone)]
pub struct PaymentConfirmationCtxData {
  pub app_state: AppState,
  pub payload: ProcessPaymentPayload,
  pub input: Option<PaymentConfirmationInput>,
  pub payment: Option<Payment>,
  pub transaction_id: Option<String>,
  pub history_id: Option<Uuid>,
  pub notification_id: Option<Uuid>,
}

impl PaymentConfirmationCtxData {
  pub fn new(app_state: AppState, payload: ProcessPaymentPayload) -> Self {
    Self {
      app_state,
      payload,
      input: None,
      payment: None,
      transaction_id: None,
      history_id: None,
      notification_id: None,
    }
  }
}
