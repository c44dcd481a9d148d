// storefront/src/store/policy.rs

//! Row-level access rules shared by every `DataStore` implementation.
//!
//! Shoppers own their orders, payments, payment history and notifications.
//! The service may touch every row. Catalog writes are service-only.

use uuid::Uuid;

use super::{Actor, StoreError, StoreResult};
use crate::models::{OrderStatus, PaymentStatus};

pub fn ensure_owner(actor: &Actor, owner_id: Uuid, table: &str) -> StoreResult<()> {
  match actor {
    Actor::Service => Ok(()),
    Actor::User(user_id) if *user_id == owner_id => Ok(()),
    Actor::User(_) => Err(StoreError::PolicyViolation(format!(
      "{} row belongs to another user",
      table
    ))),
  }
}

pub fn ensure_service(actor: &Actor, action: &str) -> StoreResult<()> {
  match actor {
    Actor::Service => Ok(()),
    Actor::User(_) => Err(StoreError::PolicyViolation(format!("{} requires the service role", action))),
  }
}

/// A shopper may only abandon their own order; every other transition is
/// made by the service.
pub fn ensure_order_transition(actor: &Actor, owner_id: Uuid, status: OrderStatus) -> StoreResult<()> {
  ensure_owner(actor, owner_id, "orders")?;
  match (actor, status) {
    (Actor::Service, _) | (Actor::User(_), OrderStatus::Abandoned) => Ok(()),
    (Actor::User(_), other) => Err(StoreError::PolicyViolation(format!(
      "users may not move an order to {:?}",
      other
    ))),
  }
}

/// A shopper may only fail their own payment; settling is service-only.
pub fn ensure_payment_transition(actor: &Actor, owner_id: Uuid, status: PaymentStatus) -> StoreResult<()> {
  ensure_owner(actor, owner_id, "payments")?;
  match (actor, status) {
    (Actor::Service, _) | (Actor::User(_), PaymentStatus::Failed) => Ok(()),
    (Actor::User(_), other) => Err(StoreError::PolicyViolation(format!(
      "users may not move a payment to {}",
      other.as_str()
    ))),
  }
}
