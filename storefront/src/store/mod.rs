// storefront/src/store/mod.rs

//! The hosted data platform as seen by the storefront.
//!
//! Every read and write of a user-owned row goes through [`DataStore`] with an
//! [`Actor`]; implementations evaluate the row policies in [`policy`] before
//! touching data. [`MemoryStore`] backs development mode and tests,
//! [`PgStore`] backs a real database.

pub mod memory;
pub mod policy;
pub mod postgres;

pub use memory::{Fault, MemoryStore};
pub use postgres::PgStore;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::catalog::{ProductPage, ProductQuery};
use crate::models::{
  NewNotification, NewOrder, NewPayment, NewPaymentHistory, NewProduct, NewUser, Notification, Order, OrderStatus,
  Payment, PaymentHistory, PaymentStatus, Product, User,
};

/// The identity a store call is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
  /// A signed-in shopper; may only see and change rows they own.
  User(Uuid),
  /// Trusted server-side code (the fulfillment functions, seeding).
  Service,
}

impl Actor {
  pub fn user_id(&self) -> Option<Uuid> {
    match self {
      Actor::User(id) => Some(*id),
      Actor::Service => None,
    }
  }
}

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("unique constraint violated: {0}")]
  UniqueViolation(String),

  #[error("row not found: {0}")]
  NotFound(String),

  #[error("access policy violation: {0}")]
  PolicyViolation(String),

  /// The row exists but its status does not allow the change.
  #[error("invalid state: {0}")]
  InvalidState(String),

  #[error("data store unavailable: {0}")]
  Unavailable(String),

  #[error("database error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("could not decode row: {0}")]
  Decode(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait DataStore: Send + Sync {
  // --- users (identity platform) ---
  async fn insert_user(&self, new_user: NewUser) -> StoreResult<User>;
  async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
  async fn get_user(&self, user_id: Uuid) -> StoreResult<Option<User>>;

  // --- catalog (public reads, service writes) ---
  async fn query_products(&self, query: &ProductQuery) -> StoreResult<ProductPage>;
  async fn get_product(&self, product_id: Uuid) -> StoreResult<Option<Product>>;
  async fn products_by_ids(&self, product_ids: &[Uuid]) -> StoreResult<Vec<Product>>;
  async fn insert_product(&self, actor: &Actor, new_product: NewProduct) -> StoreResult<Product>;

  /// Decrements stock by `quantity` only if at least that much is on hand.
  /// Returns `false`, leaving the row untouched, when stock is insufficient.
  async fn decrement_stock_if_available(&self, actor: &Actor, product_id: Uuid, quantity: i32) -> StoreResult<bool>;

  // --- orders ---
  async fn insert_order(&self, actor: &Actor, new_order: NewOrder) -> StoreResult<Order>;
  async fn get_order(&self, actor: &Actor, order_id: Uuid) -> StoreResult<Option<Order>>;
  async fn list_orders(&self, actor: &Actor, user_id: Uuid) -> StoreResult<Vec<Order>>;
  async fn set_order_status(&self, actor: &Actor, order_id: Uuid, status: OrderStatus) -> StoreResult<()>;

  // --- payments ---
  async fn insert_payment(&self, actor: &Actor, new_payment: NewPayment) -> StoreResult<Payment>;
  async fn get_payment(&self, actor: &Actor, payment_id: Uuid) -> StoreResult<Option<Payment>>;
  async fn payment_for_order(&self, actor: &Actor, order_id: Uuid) -> StoreResult<Option<Payment>>;
  async fn set_payment_status(&self, actor: &Actor, payment_id: Uuid, status: PaymentStatus) -> StoreResult<()>;

  /// Marks the payment `success` with `transaction_id` and its order
  /// `confirmed` as one atomic change.
  async fn settle_payment(
    &self,
    actor: &Actor,
    payment_id: Uuid,
    order_id: Uuid,
    transaction_id: &str,
  ) -> StoreResult<()>;

  async fn insert_payment_history(&self, actor: &Actor, entry: NewPaymentHistory) -> StoreResult<PaymentHistory>;
  async fn list_payment_history(&self, actor: &Actor, payment_id: Uuid) -> StoreResult<Vec<PaymentHistory>>;

  // --- notifications ---
  async fn insert_notification(&self, actor: &Actor, notification: NewNotification) -> StoreResult<Notification>;
  async fn list_notifications(&self, actor: &Actor, user_id: Uuid) -> StoreResult<Vec<Notification>>;
}
