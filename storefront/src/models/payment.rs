// storefront/src/models/payment.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "payment_status_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
  Pending,
  Processing,
  Success,
  Failed,
  Refunded,
}

impl PaymentStatus {
  /// A payment may be settled from these states. `success` stays settleable
  /// so a repeated confirmation succeeds again.
  pub const SETTLEABLE: [PaymentStatus; 3] = [PaymentStatus::Pending, PaymentStatus::Processing, PaymentStatus::Success];

  pub fn accepts_settlement(&self) -> bool {
    Self::SETTLEABLE.contains(self)
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      PaymentStatus::Pending => "pending",
      PaymentStatus::Processing => "processing",
      PaymentStatus::Success => "success",
      PaymentStatus::Failed => "failed",
      PaymentStatus::Refunded => "refunded",
    }
  }
}

/// Exactly one per order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Payment {
  pub id: Uuid,
  pub order_id: Uuid,
  pub user_id: Uuid,
  pub payment_method: String,
  pub amount_cents: i64,
  pub status: PaymentStatus,
  pub transaction_id: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
  pub order_id: Uuid,
  pub user_id: Uuid,
  pub payment_method: String,
  pub amount_cents: i64,
  pub status: PaymentStatus,
}
