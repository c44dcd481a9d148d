// storefront/src/models/order.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "order_status_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
  Pending,
  Confirmed,
  Processing,
  Shipped,
  Delivered,
  Cancelled,
  /// A checkout that failed after its order row was written.
  Abandoned,
}

impl OrderStatus {
  /// Settlement may move an order to `confirmed` only from these states.
  pub const CONFIRMABLE: [OrderStatus; 2] = [OrderStatus::Pending, OrderStatus::Confirmed];

  pub fn accepts_confirmation(&self) -> bool {
    Self::CONFIRMABLE.contains(self)
  }

  /// `abandoned` and `cancelled` orders are never fulfilled or revived.
  pub fn is_terminal_failure(&self) -> bool {
    matches!(self, OrderStatus::Abandoned | OrderStatus::Cancelled)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Order {
  pub id: Uuid,
  pub user_id: Uuid,
  pub order_number: String,
  pub status: OrderStatus,
  pub total_amount_cents: i64,
  pub tax_amount_cents: i64,
  pub shipping_cost_cents: i64,
  pub subtotal_cents: i64,
  pub shipping_address: String,
  pub billing_address: String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
  pub user_id: Uuid,
  pub order_number: String,
  pub total_amount_cents: i64,
  pub tax_amount_cents: i64,
  pub shipping_cost_cents: i64,
  pub subtotal_cents: i64,
  pub shipping_address: String,
  pub billing_address: String,
}
