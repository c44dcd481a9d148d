// storefront/src/models/notification.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Notification {
  pub id: Uuid,
  pub user_id: Uuid,
  pub title: String,
  pub message: String,
  pub notification_type: String,
  pub related_id: Option<Uuid>,
  pub is_read: bool,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
  pub user_id: Uuid,
  pub title: String,
  pub message: String,
  pub notification_type: String,
  pub related_id: Option<Uuid>,
}
