// storefront/src/store/postgres.rs

//! `DataStore` over PostgreSQL with runtime-checked sqlx queries.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{info, instrument};
use uuid::Uuid;

use super::policy::{ensure_order_transition, ensure_owner, ensure_payment_transition, ensure_service};
use super::{Actor, DataStore, StoreError, StoreResult};
use crate::catalog::{ProductPage, ProductQuery};
use crate::models::{
  NewNotification, NewOrder, NewPayment, NewPaymentHistory, NewProduct, NewUser, Notification, Order, OrderStatus,
  Payment, PaymentHistory, PaymentStatus, Product, User,
};

const SCHEMA_SQL: &str = include_str!("../../schema.sql");

const USER_COLUMNS: &str = "id, email, password_hash, full_name, created_at, updated_at";
const PRODUCT_COLUMNS: &str =
  "id, name, description, category, image_url, price_cents, stock_quantity, created_at, updated_at";
const ORDER_COLUMNS: &str = "id, user_id, order_number, status, total_amount_cents, tax_amount_cents, \
   shipping_cost_cents, subtotal_cents, shipping_address, billing_address, created_at, updated_at";
const PAYMENT_COLUMNS: &str =
  "id, order_id, user_id, payment_method, amount_cents, status, transaction_id, created_at, updated_at";
const HISTORY_COLUMNS: &str = "id, payment_id, status, response, created_at";
const NOTIFICATION_COLUMNS: &str =
  "id, user_id, title, message, notification_type, related_id, is_read, created_at";

#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  pub async fn connect(database_url: &str) -> StoreResult<Self> {
    let pool = PgPoolOptions::new().max_connections(10).connect(database_url).await?;
    info!("Successfully connected to the database.");
    Ok(Self::new(pool))
  }

  /// Creates the enum types, tables and indexes if they are missing.
  pub async fn apply_schema(&self) -> StoreResult<()> {
    sqlx::raw_sql(SCHEMA_SQL).execute(&self.pool).await?;
    info!("Database schema is up to date.");
    Ok(())
  }

  async fn owner_of(&self, table: &'static str, row_id: Uuid) -> StoreResult<Uuid> {
    let sql = format!("SELECT user_id FROM {} WHERE id = $1", table);
    sqlx::query_scalar::<_, Uuid>(&sql)
      .bind(row_id)
      .fetch_optional(&self.pool)
      .await
      .map_err(classify)?
      .ok_or_else(|| StoreError::NotFound(format!("{} {}", table, row_id)))
  }
}

/// Sorts sqlx failures into the store's error kinds.
fn classify(err: sqlx::Error) -> StoreError {
  match err {
    sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
      StoreError::UniqueViolation(db_err.constraint().unwrap_or("unique constraint").to_string())
    }
    sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => StoreError::Decode(err.to_string()),
    sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => StoreError::Unavailable(err.to_string()),
    other => StoreError::Sqlx(other),
  }
}

fn like_pattern(needle: &str) -> String {
  let escaped = needle.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
  format!("%{}%", escaped)
}

fn push_product_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &ProductQuery) {
  qb.push(" WHERE TRUE");
  if let Some(search) = &query.search {
    let pattern = like_pattern(search);
    qb.push(" AND (name ILIKE ");
    qb.push_bind(pattern.clone());
    qb.push(" OR description ILIKE ");
    qb.push_bind(pattern);
    qb.push(")");
  }
  if let Some(category) = &query.category {
    qb.push(" AND category = ");
    qb.push_bind(category.clone());
  }
  if let Some(min) = query.min_price_cents {
    qb.push(" AND price_cents >= ");
    qb.push_bind(min);
  }
  if let Some(max) = query.max_price_cents {
    qb.push(" AND price_cents <= ");
    qb.push_bind(max);
  }
  if query.in_stock_only {
    qb.push(" AND stock_quantity > 0");
  }
}

#[async_trait]
impl DataStore for PgStore {
  async fn insert_user(&self, new_user: NewUser) -> StoreResult<User> {
    let sql = format!(
      "INSERT INTO users (email, password_hash, full_name) VALUES (lower($1), $2, $3) RETURNING {}",
      USER_COLUMNS
    );
    sqlx::query_as::<_, User>(&sql)
      .bind(&new_user.email)
      .bind(&new_user.password_hash)
      .bind(&new_user.full_name)
      .fetch_one(&self.pool)
      .await
      .map_err(|e| match classify(e) {
        StoreError::UniqueViolation(_) => StoreError::UniqueViolation("email already registered".to_string()),
        other => other,
      })
  }

  async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE email = lower($1)", USER_COLUMNS);
    sqlx::query_as::<_, User>(&sql)
      .bind(email)
      .fetch_optional(&self.pool)
      .await
      .map_err(classify)
  }

  async fn get_user(&self, user_id: Uuid) -> StoreResult<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
    sqlx::query_as::<_, User>(&sql)
      .bind(user_id)
      .fetch_optional(&self.pool)
      .await
      .map_err(classify)
  }

  #[instrument(name = "pg::query_products", skip(self, query))]
  async fn query_products(&self, query: &ProductQuery) -> StoreResult<ProductPage> {
    let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products");
    push_product_filters(&mut count_qb, query);
    let total: i64 = count_qb
      .build_query_scalar()
      .fetch_one(&self.pool)
      .await
      .map_err(classify)?;

    let mut rows_qb = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM products", PRODUCT_COLUMNS));
    push_product_filters(&mut rows_qb, query);
    rows_qb.push(" ORDER BY ");
    rows_qb.push(query.sort.order_by_sql());
    rows_qb.push(" LIMIT ");
    rows_qb.push_bind(i64::from(query.per_page));
    rows_qb.push(" OFFSET ");
    rows_qb.push_bind(i64::try_from(query.offset()).unwrap_or(i64::MAX));
    let products = rows_qb
      .build_query_as::<Product>()
      .fetch_all(&self.pool)
      .await
      .map_err(classify)?;

    Ok(ProductPage {
      products,
      total: u64::try_from(total).unwrap_or_default(),
      page: query.page,
      per_page: query.per_page,
    })
  }

  async fn get_product(&self, product_id: Uuid) -> StoreResult<Option<Product>> {
    let sql = format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS);
    sqlx::query_as::<_, Product>(&sql)
      .bind(product_id)
      .fetch_optional(&self.pool)
      .await
      .map_err(classify)
  }

  async fn products_by_ids(&self, product_ids: &[Uuid]) -> StoreResult<Vec<Product>> {
    let sql = format!("SELECT {} FROM products WHERE id = ANY($1)", PRODUCT_COLUMNS);
    sqlx::query_as::<_, Product>(&sql)
      .bind(product_ids.to_vec())
      .fetch_all(&self.pool)
      .await
      .map_err(classify)
  }

  async fn insert_product(&self, actor: &Actor, new_product: NewProduct) -> StoreResult<Product> {
    ensure_service(actor, "product insert")?;
    let sql = format!(
      "INSERT INTO products (name, description, category, image_url, price_cents, stock_quantity) \
       VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
      PRODUCT_COLUMNS
    );
    sqlx::query_as::<_, Product>(&sql)
      .bind(&new_product.name)
      .bind(&new_product.description)
      .bind(&new_product.category)
      .bind(&new_product.image_url)
      .bind(new_product.price_cents)
      .bind(new_product.stock_quantity)
      .fetch_one(&self.pool)
      .await
      .map_err(classify)
  }

  #[instrument(name = "pg::decrement_stock", skip(self, actor))]
  async fn decrement_stock_if_available(&self, actor: &Actor, product_id: Uuid, quantity: i32) -> StoreResult<bool> {
    ensure_service(actor, "stock update")?;
    let result = sqlx::query(
      "UPDATE products SET stock_quantity = stock_quantity - $1, updated_at = now() \
       WHERE id = $2 AND stock_quantity >= $1",
    )
    .bind(quantity)
    .bind(product_id)
    .execute(&self.pool)
    .await
    .map_err(classify)?;
    if result.rows_affected() == 1 {
      return Ok(true);
    }
    // Distinguish "not enough stock" from "no such product".
    match self.get_product(product_id).await? {
      Some(_) => Ok(false),
      None => Err(StoreError::NotFound(format!("product {}", product_id))),
    }
  }

  async fn insert_order(&self, actor: &Actor, new_order: NewOrder) -> StoreResult<Order> {
    ensure_owner(actor, new_order.user_id, "orders")?;
    let sql = format!(
      "INSERT INTO orders (user_id, order_number, status, total_amount_cents, tax_amount_cents, \
       shipping_cost_cents, subtotal_cents, shipping_address, billing_address) \
       VALUES ($1, $2, 'pending', $3, $4, $5, $6, $7, $8) RETURNING {}",
      ORDER_COLUMNS
    );
    sqlx::query_as::<_, Order>(&sql)
      .bind(new_order.user_id)
      .bind(&new_order.order_number)
      .bind(new_order.total_amount_cents)
      .bind(new_order.tax_amount_cents)
      .bind(new_order.shipping_cost_cents)
      .bind(new_order.subtotal_cents)
      .bind(&new_order.shipping_address)
      .bind(&new_order.billing_address)
      .fetch_one(&self.pool)
      .await
      .map_err(classify)
  }

  async fn get_order(&self, actor: &Actor, order_id: Uuid) -> StoreResult<Option<Order>> {
    let sql = format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS);
    let order = sqlx::query_as::<_, Order>(&sql)
      .bind(order_id)
      .fetch_optional(&self.pool)
      .await
      .map_err(classify)?;
    if let Some(order) = &order {
      ensure_owner(actor, order.user_id, "orders")?;
    }
    Ok(order)
  }

  async fn list_orders(&self, actor: &Actor, user_id: Uuid) -> StoreResult<Vec<Order>> {
    ensure_owner(actor, user_id, "orders")?;
    let sql = format!(
      "SELECT {} FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
      ORDER_COLUMNS
    );
    sqlx::query_as::<_, Order>(&sql)
      .bind(user_id)
      .fetch_all(&self.pool)
      .await
      .map_err(classify)
  }

  async fn set_order_status(&self, actor: &Actor, order_id: Uuid, status: OrderStatus) -> StoreResult<()> {
    let owner = self.owner_of("orders", order_id).await?;
    ensure_order_transition(actor, owner, status)?;
    sqlx::query("UPDATE orders SET status = $1, updated_at = now() WHERE id = $2")
      .bind(status)
      .bind(order_id)
      .execute(&self.pool)
      .await
      .map_err(classify)?;
    Ok(())
  }

  async fn insert_payment(&self, actor: &Actor, new_payment: NewPayment) -> StoreResult<Payment> {
    ensure_owner(actor, new_payment.user_id, "payments")?;
    if self.owner_of("orders", new_payment.order_id).await? != new_payment.user_id {
      return Err(StoreError::PolicyViolation(format!(
        "order {} does not belong to the paying user",
        new_payment.order_id
      )));
    }
    let sql = format!(
      "INSERT INTO payments (order_id, user_id, payment_method, amount_cents, status) \
       VALUES ($1, $2, $3, $4, $5) RETURNING {}",
      PAYMENT_COLUMNS
    );
    sqlx::query_as::<_, Payment>(&sql)
      .bind(new_payment.order_id)
      .bind(new_payment.user_id)
      .bind(&new_payment.payment_method)
      .bind(new_payment.amount_cents)
      .bind(new_payment.status)
      .fetch_one(&self.pool)
      .await
      .map_err(classify)
  }

  async fn get_payment(&self, actor: &Actor, payment_id: Uuid) -> StoreResult<Option<Payment>> {
    let sql = format!("SELECT {} FROM payments WHERE id = $1", PAYMENT_COLUMNS);
    let payment = sqlx::query_as::<_, Payment>(&sql)
      .bind(payment_id)
      .fetch_optional(&self.pool)
      .await
      .map_err(classify)?;
    if let Some(payment) = &payment {
      ensure_owner(actor, payment.user_id, "payments")?;
    }
    Ok(payment)
  }

  async fn payment_for_order(&self, actor: &Actor, order_id: Uuid) -> StoreResult<Option<Payment>> {
    let sql = format!("SELECT {} FROM payments WHERE order_id = $1", PAYMENT_COLUMNS);
    let payment = sqlx::query_as::<_, Payment>(&sql)
      .bind(order_id)
      .fetch_optional(&self.pool)
      .await
      .map_err(classify)?;
    if let Some(payment) = &payment {
      ensure_owner(actor, payment.user_id, "payments")?;
    }
    Ok(payment)
  }

  async fn set_payment_status(&self, actor: &Actor, payment_id: Uuid, status: PaymentStatus) -> StoreResult<()> {
    let owner = self.owner_of("payments", payment_id).await?;
    ensure_payment_transition(actor, owner, status)?;
    sqlx::query("UPDATE payments SET status = $1, updated_at = now() WHERE id = $2")
      .bind(status)
      .bind(payment_id)
      .execute(&self.pool)
      .await
      .map_err(classify)?;
    Ok(())
  }

  #[instrument(name = "pg::settle_payment", skip(self, actor, transaction_id))]
  async fn settle_payment(
    &self,
    actor: &Actor,
    payment_id: Uuid,
    order_id: Uuid,
    transaction_id: &str,
  ) -> StoreResult<()> {
    ensure_service(actor, "payment settlement")?;
    let mut tx = self.pool.begin().await.map_err(classify)?;

    let payment_rows = sqlx::query(
      "UPDATE payments SET status = 'success', transaction_id = $1, updated_at = now() \
       WHERE id = $2 AND status IN ('pending', 'processing', 'success')",
    )
    .bind(transaction_id)
    .bind(payment_id)
    .execute(&mut *tx)
    .await
    .map_err(classify)?
    .rows_affected();
    if payment_rows == 0 {
      let status = sqlx::query_scalar::<_, PaymentStatus>("SELECT status FROM payments WHERE id = $1")
        .bind(payment_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(classify)?;
      return Err(match status {
        Some(status) => StoreError::InvalidState(format!(
          "payment {} is {} and cannot be settled",
          payment_id,
          status.as_str()
        )),
        None => StoreError::NotFound(format!("payment {}", payment_id)),
      });
    }

    let order_rows = sqlx::query(
      "UPDATE orders SET status = 'confirmed', updated_at = now() \
       WHERE id = $1 AND status IN ('pending', 'confirmed')",
    )
    .bind(order_id)
    .execute(&mut *tx)
    .await
    .map_err(classify)?
    .rows_affected();
    if order_rows == 0 {
      let status = sqlx::query_scalar::<_, OrderStatus>("SELECT status FROM orders WHERE id = $1")
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(classify)?;
      // Dropping `tx` here rolls back the payment update above.
      return Err(match status {
        Some(status) => StoreError::InvalidState(format!("order {} is {:?} and cannot be confirmed", order_id, status)),
        None => StoreError::NotFound(format!("order {}", order_id)),
      });
    }

    tx.commit().await.map_err(classify)?;
    Ok(())
  }

  async fn insert_payment_history(&self, actor: &Actor, entry: NewPaymentHistory) -> StoreResult<PaymentHistory> {
    let owner = self.owner_of("payments", entry.payment_id).await?;
    ensure_owner(actor, owner, "payment_history")?;
    let sql = format!(
      "INSERT INTO payment_history (payment_id, status, response) VALUES ($1, $2, $3) RETURNING {}",
      HISTORY_COLUMNS
    );
    sqlx::query_as::<_, PaymentHistory>(&sql)
      .bind(entry.payment_id)
      .bind(entry.status)
      .bind(&entry.response)
      .fetch_one(&self.pool)
      .await
      .map_err(classify)
  }

  async fn list_payment_history(&self, actor: &Actor, payment_id: Uuid) -> StoreResult<Vec<PaymentHistory>> {
    let owner = self.owner_of("payments", payment_id).await?;
    ensure_owner(actor, owner, "payment_history")?;
    let sql = format!(
      "SELECT {} FROM payment_history WHERE payment_id = $1 ORDER BY created_at",
      HISTORY_COLUMNS
    );
    sqlx::query_as::<_, PaymentHistory>(&sql)
      .bind(payment_id)
      .fetch_all(&self.pool)
      .await
      .map_err(classify)
  }

  async fn insert_notification(&self, actor: &Actor, notification: NewNotification) -> StoreResult<Notification> {
    ensure_owner(actor, notification.user_id, "notifications")?;
    let sql = format!(
      "INSERT INTO notifications (user_id, title, message, notification_type, related_id) \
       VALUES ($1, $2, $3, $4, $5) RETURNING {}",
      NOTIFICATION_COLUMNS
    );
    sqlx::query_as::<_, Notification>(&sql)
      .bind(notification.user_id)
      .bind(&notification.title)
      .bind(&notification.message)
      .bind(&notification.notification_type)
      .bind(notification.related_id)
      .fetch_one(&self.pool)
      .await
      .map_err(classify)
  }

  async fn list_notifications(&self, actor: &Actor, user_id: Uuid) -> StoreResult<Vec<Notification>> {
    ensure_owner(actor, user_id, "notifications")?;
    let sql = format!(
      "SELECT {} FROM notifications WHERE user_id = $1 ORDER BY created_at DESC",
      NOTIFICATION_COLUMNS
    );
    sqlx::query_as::<_, Notification>(&sql)
      .bind(user_id)
      .fetch_all(&self.pool)
      .await
      .map_err(classify)
  }
}
