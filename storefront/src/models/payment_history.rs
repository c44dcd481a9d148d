// storefront/src/models/payment_history.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use super::payment::PaymentStatus;

/// Append-only audit row, one per payment-confirmation attempt.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct PaymentHistory {
  pub id: Uuid,
  pub payment_id: Uuid,
  pub status: PaymentStatus,
  pub response: serde_json::Value,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPaymentHistory {
  pub payment_id: Uuid,
  pub status: PaymentStatus,
  pub response: serde_json::Value,
}
