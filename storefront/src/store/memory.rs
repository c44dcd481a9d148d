// storefront/src/store/memory.rs

//! In-process `DataStore` used by development mode and the test suites.
//!
//! Each table lives behind one `parking_lot::RwLock`; every operation that
//! must be atomic (stock decrement, settlement) runs under a single write
//! guard. Guards are never held across an `.await`.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};
use uuid::Uuid;

use super::policy::{ensure_order_transition, ensure_owner, ensure_payment_transition, ensure_service};
use super::{Actor, DataStore, StoreError, StoreResult};
use crate::catalog::{ProductPage, ProductQuery};
use crate::models::{
  NewNotification, NewOrder, NewPayment, NewPaymentHistory, NewProduct, NewUser, Notification, Order, OrderStatus,
  Payment, PaymentHistory, PaymentStatus, Product, User,
};

/// Store operations that can be made to fail on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
  InsertOrder,
  InsertPayment,
  InsertNotification,
  DecrementStock,
  SettlePayment,
  InsertPaymentHistory,
  SetOrderStatus,
}

#[derive(Default)]
struct Tables {
  users: HashMap<Uuid, User>,
  products: HashMap<Uuid, Product>,
  orders: HashMap<Uuid, Order>,
  payments: HashMap<Uuid, Payment>,
  payment_history: Vec<PaymentHistory>,
  notifications: Vec<Notification>,
}

#[derive(Default)]
pub struct MemoryStore {
  tables: RwLock<Tables>,
  faults: RwLock<HashSet<Fault>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Makes every later call of `fault` fail with `StoreError::Unavailable`.
  pub fn fail_on(&self, fault: Fault) {
    self.faults.write().insert(fault);
  }

  pub fn clear_faults(&self) {
    self.faults.write().clear();
  }

  fn check_fault(&self, fault: Fault) -> StoreResult<()> {
    if self.faults.read().contains(&fault) {
      warn!(?fault, "Injected store fault triggered.");
      return Err(StoreError::Unavailable(format!("injected fault: {:?}", fault)));
    }
    Ok(())
  }
}

fn newest_first<T>(rows: &mut [T], created_at: impl Fn(&T) -> chrono::DateTime<Utc>) {
  rows.sort_by_key(|row| std::cmp::Reverse(created_at(row)));
}

#[async_trait]
impl DataStore for MemoryStore {
  async fn insert_user(&self, new_user: NewUser) -> StoreResult<User> {
    let mut tables = self.tables.write();
    let email = new_user.email.to_lowercase();
    if tables.users.values().any(|u| u.email == email) {
      return Err(StoreError::UniqueViolation("email already registered".to_string()));
    }
    let now = Utc::now();
    let user = User {
      id: Uuid::new_v4(),
      email,
      password_hash: new_user.password_hash,
      full_name: new_user.full_name,
      created_at: now,
      updated_at: now,
    };
    tables.users.insert(user.id, user.clone());
    Ok(user)
  }

  async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
    let email = email.to_lowercase();
    Ok(self.tables.read().users.values().find(|u| u.email == email).cloned())
  }

  async fn get_user(&self, user_id: Uuid) -> StoreResult<Option<User>> {
    Ok(self.tables.read().users.get(&user_id).cloned())
  }

  async fn query_products(&self, query: &ProductQuery) -> StoreResult<ProductPage> {
    let tables = self.tables.read();
    let mut matching: Vec<Product> = tables.products.values().filter(|p| query.matches(p)).cloned().collect();
    matching.sort_by(|a, b| query.sort.compare(a, b));
    let total = matching.len() as u64;
    let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
    let products = matching
      .into_iter()
      .skip(offset)
      .take(query.per_page as usize)
      .collect();
    Ok(ProductPage {
      products,
      total,
      page: query.page,
      per_page: query.per_page,
    })
  }

  async fn get_product(&self, product_id: Uuid) -> StoreResult<Option<Product>> {
    Ok(self.tables.read().products.get(&product_id).cloned())
  }

  async fn products_by_ids(&self, product_ids: &[Uuid]) -> StoreResult<Vec<Product>> {
    let tables = self.tables.read();
    Ok(product_ids.iter().filter_map(|id| tables.products.get(id).cloned()).collect())
  }

  async fn insert_product(&self, actor: &Actor, new_product: NewProduct) -> StoreResult<Product> {
    ensure_service(actor, "product insert")?;
    let now = Utc::now();
    let product = Product {
      id: Uuid::new_v4(),
      name: new_product.name,
      description: new_product.description,
      category: new_product.category,
      image_url: new_product.image_url,
      price_cents: new_product.price_cents,
      stock_quantity: new_product.stock_quantity,
      created_at: now,
      updated_at: now,
    };
    self.tables.write().products.insert(product.id, product.clone());
    Ok(product)
  }

  async fn decrement_stock_if_available(&self, actor: &Actor, product_id: Uuid, quantity: i32) -> StoreResult<bool> {
    ensure_service(actor, "stock update")?;
    self.check_fault(Fault::DecrementStock)?;
    let mut tables = self.tables.write();
    let product = tables
      .products
      .get_mut(&product_id)
      .ok_or_else(|| StoreError::NotFound(format!("product {}", product_id)))?;
    if product.stock_quantity < quantity {
      debug!(%product_id, stock = product.stock_quantity, quantity, "Stock insufficient, row left untouched.");
      return Ok(false);
    }
    product.stock_quantity -= quantity;
    product.updated_at = Utc::now();
    Ok(true)
  }

  async fn insert_order(&self, actor: &Actor, new_order: NewOrder) -> StoreResult<Order> {
    ensure_owner(actor, new_order.user_id, "orders")?;
    self.check_fault(Fault::InsertOrder)?;
    let mut tables = self.tables.write();
    if tables.orders.values().any(|o| o.order_number == new_order.order_number) {
      return Err(StoreError::UniqueViolation(format!(
        "order number {} already exists",
        new_order.order_number
      )));
    }
    let now = Utc::now();
    let order = Order {
      id: Uuid::new_v4(),
      user_id: new_order.user_id,
      order_number: new_order.order_number,
      status: OrderStatus::Pending,
      total_amount_cents: new_order.total_amount_cents,
      tax_amount_cents: new_order.tax_amount_cents,
      shipping_cost_cents: new_order.shipping_cost_cents,
      subtotal_cents: new_order.subtotal_cents,
      shipping_address: new_order.shipping_address,
      billing_address: new_order.billing_address,
      created_at: now,
      updated_at: now,
    };
    tables.orders.insert(order.id, order.clone());
    Ok(order)
  }

  async fn get_order(&self, actor: &Actor, order_id: Uuid) -> StoreResult<Option<Order>> {
    let order = self.tables.read().orders.get(&order_id).cloned();
    if let Some(order) = &order {
      ensure_owner(actor, order.user_id, "orders")?;
    }
    Ok(order)
  }

  async fn list_orders(&self, actor: &Actor, user_id: Uuid) -> StoreResult<Vec<Order>> {
    ensure_owner(actor, user_id, "orders")?;
    let mut orders: Vec<Order> = self
      .tables
      .read()
      .orders
      .values()
      .filter(|o| o.user_id == user_id)
      .cloned()
      .collect();
    newest_first(&mut orders, |o| o.created_at);
    Ok(orders)
  }

  async fn set_order_status(&self, actor: &Actor, order_id: Uuid, status: OrderStatus) -> StoreResult<()> {
    self.check_fault(Fault::SetOrderStatus)?;
    let mut tables = self.tables.write();
    let order = tables
      .orders
      .get_mut(&order_id)
      .ok_or_else(|| StoreError::NotFound(format!("order {}", order_id)))?;
    ensure_order_transition(actor, order.user_id, status)?;
    order.status = status;
    order.updated_at = Utc::now();
    Ok(())
  }

  async fn insert_payment(&self, actor: &Actor, new_payment: NewPayment) -> StoreResult<Payment> {
    ensure_owner(actor, new_payment.user_id, "payments")?;
    self.check_fault(Fault::InsertPayment)?;
    let mut tables = self.tables.write();
    let order_owner = tables
      .orders
      .get(&new_payment.order_id)
      .map(|o| o.user_id)
      .ok_or_else(|| StoreError::NotFound(format!("order {}", new_payment.order_id)))?;
    if order_owner != new_payment.user_id {
      return Err(StoreError::PolicyViolation(format!(
        "order {} does not belong to the paying user",
        new_payment.order_id
      )));
    }
    if tables.payments.values().any(|p| p.order_id == new_payment.order_id) {
      return Err(StoreError::UniqueViolation(format!(
        "order {} already has a payment",
        new_payment.order_id
      )));
    }
    let now = Utc::now();
    let payment = Payment {
      id: Uuid::new_v4(),
      order_id: new_payment.order_id,
      user_id: new_payment.user_id,
      payment_method: new_payment.payment_method,
      amount_cents: new_payment.amount_cents,
      status: new_payment.status,
      transaction_id: None,
      created_at: now,
      updated_at: now,
    };
    tables.payments.insert(payment.id, payment.clone());
    Ok(payment)
  }

  async fn get_payment(&self, actor: &Actor, payment_id: Uuid) -> StoreResult<Option<Payment>> {
    let payment = self.tables.read().payments.get(&payment_id).cloned();
    if let Some(payment) = &payment {
      ensure_owner(actor, payment.user_id, "payments")?;
    }
    Ok(payment)
  }

  async fn payment_for_order(&self, actor: &Actor, order_id: Uuid) -> StoreResult<Option<Payment>> {
    let payment = self
      .tables
      .read()
      .payments
      .values()
      .find(|p| p.order_id == order_id)
      .cloned();
    if let Some(payment) = &payment {
      ensure_owner(actor, payment.user_id, "payments")?;
    }
    Ok(payment)
  }

  async fn set_payment_status(&self, actor: &Actor, payment_id: Uuid, status: PaymentStatus) -> StoreResult<()> {
    let mut tables = self.tables.write();
    let payment = tables
      .payments
      .get_mut(&payment_id)
      .ok_or_else(|| StoreError::NotFound(format!("payment {}", payment_id)))?;
    ensure_payment_transition(actor, payment.user_id, status)?;
    payment.status = status;
    payment.updated_at = Utc::now();
    Ok(())
  }

  async fn settle_payment(
    &self,
    actor: &Actor,
    payment_id: Uuid,
    order_id: Uuid,
    transaction_id: &str,
  ) -> StoreResult<()> {
    ensure_service(actor, "payment settlement")?;
    self.check_fault(Fault::SettlePayment)?;
    let mut tables = self.tables.write();
    let payment_status = tables
      .payments
      .get(&payment_id)
      .map(|p| p.status)
      .ok_or_else(|| StoreError::NotFound(format!("payment {}", payment_id)))?;
    let order_status = tables
      .orders
      .get(&order_id)
      .map(|o| o.status)
      .ok_or_else(|| StoreError::NotFound(format!("order {}", order_id)))?;
    if !payment_status.accepts_settlement() {
      return Err(StoreError::InvalidState(format!(
        "payment {} is {} and cannot be settled",
        payment_id,
        payment_status.as_str()
      )));
    }
    if !order_status.accepts_confirmation() {
      return Err(StoreError::InvalidState(format!(
        "order {} is {:?} and cannot be confirmed",
        order_id, order_status
      )));
    }
    let now = Utc::now();
    if let Some(payment) = tables.payments.get_mut(&payment_id) {
      payment.status = PaymentStatus::Success;
      payment.transaction_id = Some(transaction_id.to_string());
      payment.updated_at = now;
    }
    if let Some(order) = tables.orders.get_mut(&order_id) {
      order.status = OrderStatus::Confirmed;
      order.updated_at = now;
    }
    Ok(())
  }

  async fn insert_payment_history(&self, actor: &Actor, entry: NewPaymentHistory) -> StoreResult<PaymentHistory> {
    self.check_fault(Fault::InsertPaymentHistory)?;
    let mut tables = self.tables.write();
    let owner = tables
      .payments
      .get(&entry.payment_id)
      .map(|p| p.user_id)
      .ok_or_else(|| StoreError::NotFound(format!("payment {}", entry.payment_id)))?;
    ensure_owner(actor, owner, "payment_history")?;
    let row = PaymentHistory {
      id: Uuid::new_v4(),
      payment_id: entry.payment_id,
      status: entry.status,
      response: entry.response,
      created_at: Utc::now(),
    };
    tables.payment_history.push(row.clone());
    Ok(row)
  }

  async fn list_payment_history(&self, actor: &Actor, payment_id: Uuid) -> StoreResult<Vec<PaymentHistory>> {
    let tables = self.tables.read();
    if let Some(payment) = tables.payments.get(&payment_id) {
      ensure_owner(actor, payment.user_id, "payment_history")?;
    }
    Ok(
      tables
        .payment_history
        .iter()
        .filter(|h| h.payment_id == payment_id)
        .cloned()
        .collect(),
    )
  }

  async fn insert_notification(&self, actor: &Actor, notification: NewNotification) -> StoreResult<Notification> {
    ensure_owner(actor, notification.user_id, "notifications")?;
    self.check_fault(Fault::InsertNotification)?;
    let row = Notification {
      id: Uuid::new_v4(),
      user_id: notification.user_id,
      title: notification.title,
      message: notification.message,
      notification_type: notification.notification_type,
      related_id: notification.related_id,
      is_read: false,
      created_at: Utc::now(),
    };
    self.tables.write().notifications.push(row.clone());
    Ok(row)
  }

  async fn list_notifications(&self, actor: &Actor, user_id: Uuid) -> StoreResult<Vec<Notification>> {
    ensure_owner(actor, user_id, "notifications")?;
    let mut rows: Vec<Notification> = self
      .tables
      .read()
      .notifications
      .iter()
      .filter(|n| n.user_id == user_id)
      .cloned()
      .collect();
    newest_first(&mut rows, |n| n.created_at);
    Ok(rows)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn new_product(stock: i32) -> NewProduct {
    NewProduct {
      name: "Tea Tin".into(),
      description: None,
      category: None,
      image_url: None,
      price_cents: 2000,
      stock_quantity: stock,
    }
  }

  fn new_order(user_id: Uuid, number: &str) -> NewOrder {
    NewOrder {
      user_id,
      order_number: number.into(),
      total_amount_cents: 7600,
      tax_amount_cents: 600,
      shipping_cost_cents: 1000,
      subtotal_cents: 6000,
      shipping_address: "A, 1 Road, Town, 00000, Nowhere".into(),
      billing_address: "A, 1 Road, Town, 00000, Nowhere".into(),
    }
  }

  #[tokio::test]
  async fn conditional_decrement_never_goes_negative() {
    let store = MemoryStore::new();
    let product = store.insert_product(&Actor::Service, new_product(5)).await.unwrap();

    assert!(store.decrement_stock_if_available(&Actor::Service, product.id, 5).await.unwrap());
    assert!(!store.decrement_stock_if_available(&Actor::Service, product.id, 1).await.unwrap());
    let after = store.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(after.stock_quantity, 0);
  }

  #[tokio::test]
  async fn users_cannot_touch_stock_or_products() {
    let store = MemoryStore::new();
    let user = Actor::User(Uuid::new_v4());
    assert!(matches!(
      store.insert_product(&user, new_product(1)).await,
      Err(StoreError::PolicyViolation(_))
    ));
  }

  #[tokio::test]
  async fn order_numbers_and_payments_per_order_are_unique() {
    let store = MemoryStore::new();
    let user_id = Uuid::new_v4();
    let actor = Actor::User(user_id);
    let order = store.insert_order(&actor, new_order(user_id, "ORD-1")).await.unwrap();
    assert!(matches!(
      store.insert_order(&actor, new_order(user_id, "ORD-1")).await,
      Err(StoreError::UniqueViolation(_))
    ));

    let payment = NewPayment {
      order_id: order.id,
      user_id,
      payment_method: "card".into(),
      amount_cents: 7600,
      status: PaymentStatus::Processing,
    };
    store.insert_payment(&actor, payment.clone()).await.unwrap();
    assert!(matches!(
      store.insert_payment(&actor, payment).await,
      Err(StoreError::UniqueViolation(_))
    ));
  }

  #[tokio::test]
  async fn other_users_rows_are_forbidden() {
    let store = MemoryStore::new();
    let owner = Uuid::new_v4();
    let order = store.insert_order(&Actor::User(owner), new_order(owner, "ORD-2")).await.unwrap();

    let stranger = Actor::User(Uuid::new_v4());
    assert!(matches!(
      store.get_order(&stranger, order.id).await,
      Err(StoreError::PolicyViolation(_))
    ));
    assert!(store.list_orders(&stranger, owner).await.is_err());
    assert!(store.get_order(&Actor::Service, order.id).await.unwrap().is_some());
  }

  #[tokio::test]
  async fn settlement_updates_payment_and_order_together() {
    let store = MemoryStore::new();
    let owner = Uuid::new_v4();
    let actor = Actor::User(owner);
    let order = store.insert_order(&actor, new_order(owner, "ORD-3")).await.unwrap();
    let payment = store
      .insert_payment(
        &actor,
        NewPayment {
          order_id: order.id,
          user_id: owner,
          payment_method: "card".into(),
          amount_cents: order.total_amount_cents,
          status: PaymentStatus::Processing,
        },
      )
      .await
      .unwrap();

    assert!(store.settle_payment(&actor, payment.id, order.id, "TXN-1").await.is_err());

    store.fail_on(Fault::SettlePayment);
    assert!(store.settle_payment(&Actor::Service, payment.id, order.id, "TXN-1").await.is_err());
    store.clear_faults();

    store.settle_payment(&Actor::Service, payment.id, order.id, "TXN-1").await.unwrap();
    let payment = store.get_payment(&Actor::Service, payment.id).await.unwrap().unwrap();
    let order = store.get_order(&Actor::Service, order.id).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Success);
    assert_eq!(payment.transaction_id.as_deref(), Some("TXN-1"));
    assert_eq!(order.status, OrderStatus::Confirmed);

    store.settle_payment(&Actor::Service, payment.id, order.id, "TXN-2").await.unwrap();
    let again = store.get_payment(&Actor::Service, payment.id).await.unwrap().unwrap();
    assert_eq!(again.transaction_id.as_deref(), Some("TXN-2"));
  }

  #[tokio::test]
  async fn abandoned_orders_and_failed_payments_are_never_settled() {
    let store = MemoryStore::new();
    let owner = Uuid::new_v4();
    let actor = Actor::User(owner);
    let order = store.insert_order(&actor, new_order(owner, "ORD-4")).await.unwrap();
    let payment = store
      .insert_payment(
        &actor,
        NewPayment {
          order_id: order.id,
          user_id: owner,
          payment_method: "card".into(),
          amount_cents: order.total_amount_cents,
          status: PaymentStatus::Processing,
        },
      )
      .await
      .unwrap();

    store.set_order_status(&actor, order.id, OrderStatus::Abandoned).await.unwrap();
    assert!(matches!(
      store.settle_payment(&Actor::Service, payment.id, order.id, "TXN-1").await,
      Err(StoreError::InvalidState(_))
    ));

    store.set_order_status(&Actor::Service, order.id, OrderStatus::Pending).await.unwrap();
    store.set_payment_status(&actor, payment.id, PaymentStatus::Failed).await.unwrap();
    assert!(matches!(
      store.settle_payment(&Actor::Service, payment.id, order.id, "TXN-1").await,
      Err(StoreError::InvalidState(_))
    ));

    let payment = store.get_payment(&Actor::Service, payment.id).await.unwrap().unwrap();
    let order = store.get_order(&Actor::Service, order.id).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Failed);
    assert!(payment.transaction_id.is_none());
    assert_eq!(order.status, OrderStatus::Pending);
  }

  #[tokio::test]
  async fn payments_require_an_order_owned_by_the_payer() {
    let store = MemoryStore::new();
    let owner = Uuid::new_v4();
    let order = store.insert_order(&Actor::User(owner), new_order(owner, "ORD-5")).await.unwrap();
    let stranger = Uuid::new_v4();

    let for_order = |order_id: Uuid, user_id: Uuid| NewPayment {
      order_id,
      user_id,
      payment_method: "card".into(),
      amount_cents: 7600,
      status: PaymentStatus::Processing,
    };

    assert!(matches!(
      store.insert_payment(&Actor::Service, for_order(Uuid::new_v4(), owner)).await,
      Err(StoreError::NotFound(_))
    ));
    assert!(matches!(
      store.insert_payment(&Actor::User(stranger), for_order(order.id, stranger)).await,
      Err(StoreError::PolicyViolation(_))
    ));
    assert!(store.insert_payment(&Actor::User(owner), for_order(order.id, owner)).await.is_ok());
  }
}
