// tests/checkout_tests.rs
mod common;

use chrono::{Duration, Utc};
use common::*;
use serial_test::serial;

use storefront::cart::{CartStore, MemoryStorage};
use storefront::errors::{AppError, CHECKOUT_FAILED_MESSAGE};
use storefront::models::{CartItem, OrderStatus, PaymentStatus};
use storefront::pipelines::checkout_pipeline::ORDER_PLACED_TITLE;
use storefront::services::checkout::{self, place_order};
use storefront::store::{Actor, DataStore, Fault, StoreError};

#[tokio::test]
#[serial]
async fn checkout_writes_order_payment_and_notification_then_clears_cart() {
  let app = TestApp::new();
  let product = app.product("Canvas Tote", 2000, 10).await;
  let (user, session) = app.signed_in_user("ada@example.com").await;

  let cart = CartStore::new(MemoryStorage::new());
  cart.add(product.id, 3).unwrap();

  let receipt = place_order(&app.state, &session, &cart, checkout_form()).await.unwrap();

  assert_eq!(receipt.subtotal_cents, 6000);
  assert_eq!(receipt.tax_cents, 600);
  assert_eq!(receipt.shipping_cents, 1000);
  assert_eq!(receipt.total_cents, 7600);
  assert_eq!(receipt.confirmation_path, format!("/order-confirmation/{}", receipt.order_id));
  assert!(receipt.order_number.starts_with("ORD-"));

  let orders = app.store.list_orders(&Actor::Service, user.id).await.unwrap();
  assert_eq!(orders.len(), 1);
  let order = &orders[0];
  assert_eq!(order.id, receipt.order_id);
  assert_eq!(order.status, OrderStatus::Pending);
  assert_eq!(order.total_amount_cents, 7600);
  assert_eq!(order.shipping_address, "Test Shopper, 1 Market St, Springfield, 12345, US");
  assert_eq!(order.shipping_address, order.billing_address);

  let payment = app
    .store
    .payment_for_order(&Actor::Service, order.id)
    .await
    .unwrap()
    .expect("payment row");
  assert_eq!(payment.id, receipt.payment_id);
  assert_eq!(payment.status, PaymentStatus::Processing);
  assert_eq!(payment.amount_cents, 7600);
  assert_eq!(payment.payment_method, "card");

  let notifications = app.store.list_notifications(&Actor::Service, user.id).await.unwrap();
  assert_eq!(notifications.len(), 1);
  assert_eq!(notifications[0].title, ORDER_PLACED_TITLE);
  assert_eq!(notifications[0].notification_type, "order");
  assert_eq!(notifications[0].related_id, Some(order.id));

  assert!(cart.items().unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn subtotal_over_threshold_ships_free() {
  let app = TestApp::new();
  let product = app.product("Rain Jacket", 15000, 3).await;
  let (_user, session) = app.signed_in_user("free@example.com").await;

  let receipt = checkout::submit(
    &app.state,
    &session,
    vec![CartItem {
      product_id: product.id,
      quantity: 1,
    }],
    checkout_form(),
  )
  .await
  .unwrap();

  assert_eq!(receipt.shipping_cents, 0);
  assert_eq!(receipt.tax_cents, 1500);
  assert_eq!(receipt.total_cents, 16500);
}

#[tokio::test]
#[serial]
async fn order_insert_failure_leaves_nothing_and_keeps_cart() {
  let app = TestApp::new();
  let product = app.product("Canvas Tote", 2000, 10).await;
  let (user, session) = app.signed_in_user("fault1@example.com").await;
  let cart = CartStore::new(MemoryStorage::new());
  cart.add(product.id, 2).unwrap();

  app.store.fail_on(Fault::InsertOrder);
  let err = place_order(&app.state, &session, &cart, checkout_form()).await.unwrap_err();

  assert!(matches!(err, AppError::CheckoutFailed { .. }));
  assert_eq!(err.public_message(), CHECKOUT_FAILED_MESSAGE);
  assert!(app.store.list_orders(&Actor::Service, user.id).await.unwrap().is_empty());
  assert!(app.store.list_notifications(&Actor::Service, user.id).await.unwrap().is_empty());
  assert_eq!(cart.items().unwrap(), vec![CartItem { product_id: product.id, quantity: 2 }]);
}

#[tokio::test]
#[serial]
async fn payment_insert_failure_abandons_the_order() {
  let app = TestApp::new();
  let product = app.product("Canvas Tote", 2000, 10).await;
  let (user, session) = app.signed_in_user("fault2@example.com").await;
  let cart = CartStore::new(MemoryStorage::new());
  cart.add(product.id, 1).unwrap();

  app.store.fail_on(Fault::InsertPayment);
  let err = place_order(&app.state, &session, &cart, checkout_form()).await.unwrap_err();
  assert!(matches!(err, AppError::CheckoutFailed { .. }));

  let orders = app.store.list_orders(&Actor::Service, user.id).await.unwrap();
  assert_eq!(orders.len(), 1);
  assert_eq!(orders[0].status, OrderStatus::Abandoned);
  assert!(app
    .store
    .payment_for_order(&Actor::Service, orders[0].id)
    .await
    .unwrap()
    .is_none());
  assert!(app.store.list_notifications(&Actor::Service, user.id).await.unwrap().is_empty());
  assert_eq!(cart.items().unwrap().len(), 1);
}

#[tokio::test]
#[serial]
async fn notification_failure_unwinds_payment_and_order() {
  let app = TestApp::new();
  let product = app.product("Canvas Tote", 2000, 10).await;
  let (user, session) = app.signed_in_user("fault3@example.com").await;

  app.store.fail_on(Fault::InsertNotification);
  let err = checkout::submit(
    &app.state,
    &session,
    vec![CartItem {
      product_id: product.id,
      quantity: 1,
    }],
    checkout_form(),
  )
  .await
  .unwrap_err();
  assert!(matches!(err, AppError::CheckoutFailed { .. }));

  let orders = app.store.list_orders(&Actor::Service, user.id).await.unwrap();
  assert_eq!(orders[0].status, OrderStatus::Abandoned);
  let payment = app
    .store
    .payment_for_order(&Actor::Service, orders[0].id)
    .await
    .unwrap()
    .expect("payment row");
  assert_eq!(payment.status, PaymentStatus::Failed);
}

#[tokio::test]
#[serial]
async fn invalid_input_is_reported_verbatim() {
  let app = TestApp::new();
  let product = app.product("Canvas Tote", 2000, 10).await;
  let (user, session) = app.signed_in_user("invalid@example.com").await;

  let empty = checkout::submit(&app.state, &session, Vec::new(), checkout_form())
    .await
    .unwrap_err();
  assert!(matches!(empty, AppError::Validation(_)));

  let mut form = checkout_form();
  form.zip_code = " ".into();
  let blank = checkout::submit(
    &app.state,
    &session,
    vec![CartItem {
      product_id: product.id,
      quantity: 1,
    }],
    form,
  )
  .await
  .unwrap_err();
  assert!(matches!(blank, AppError::Validation(ref m) if m.contains("zipCode")));

  let unknown = checkout::submit(
    &app.state,
    &session,
    vec![CartItem {
      product_id: uuid::Uuid::new_v4(),
      quantity: 1,
    }],
    checkout_form(),
  )
  .await
  .unwrap_err();
  assert!(matches!(unknown, AppError::NotFound(_)));

  assert!(app.store.list_orders(&Actor::Service, user.id).await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn duplicate_lines_are_merged_before_pricing() {
  let app = TestApp::new();
  let product = app.product("Ceramic Mug", 1500, 20).await;
  let (_user, session) = app.signed_in_user("merge@example.com").await;

  let line = CartItem {
    product_id: product.id,
    quantity: 2,
  };
  let receipt = checkout::submit(&app.state, &session, vec![line, line], checkout_form())
    .await
    .unwrap();
  assert_eq!(receipt.subtotal_cents, 6000);
}

#[tokio::test]
#[serial]
async fn signed_out_and_expired_sessions_cannot_check_out() {
  let app = TestApp::new();
  let product = app.product("Canvas Tote", 2000, 10).await;
  let items = vec![CartItem {
    product_id: product.id,
    quantity: 1,
  }];

  let (user, session) = app.signed_in_user("gone@example.com").await;
  assert!(app.state.auth.sign_out(&session.access_token));
  let err = checkout::submit(&app.state, &session, items.clone(), checkout_form())
    .await
    .unwrap_err();
  assert!(matches!(err, AppError::Auth(_)));

  let stale = app
    .state
    .sessions
    .issue_at(&user, Utc::now() - Duration::hours(2));
  let err = checkout::submit(&app.state, &stale, items, checkout_form())
    .await
    .unwrap_err();
  assert!(matches!(err, AppError::Auth(_)));

  assert!(app.store.list_orders(&Actor::Service, user.id).await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn shoppers_cannot_read_each_others_orders() {
  let app = TestApp::new();
  let product = app.product("Canvas Tote", 2000, 10).await;
  let (_owner, session) = app.signed_in_user("owner@example.com").await;
  let (other, _) = app.signed_in_user("other@example.com").await;

  let receipt = checkout::submit(
    &app.state,
    &session,
    vec![CartItem {
      product_id: product.id,
      quantity: 1,
    }],
    checkout_form(),
  )
  .await
  .unwrap();

  let err = app
    .store
    .get_order(&Actor::User(other.id), receipt.order_id)
    .await
    .unwrap_err();
  assert!(matches!(err, StoreError::PolicyViolation(_)));
}

#[tokio::test]
#[serial]
async fn oversized_quantities_and_totals_are_rejected() {
  let app = TestApp::new();
  let tote = app.product("Canvas Tote", 3_000_000, 10).await;
  let vault = app.product("Bank Vault", 1_000_000_000_000_000_000, 10).await;
  let (user, session) = app.signed_in_user("huge@example.com").await;

  let err = checkout::submit(
    &app.state,
    &session,
    vec![CartItem {
      product_id: tote.id,
      quantity: u32::MAX,
    }],
    checkout_form(),
  )
  .await
  .unwrap_err();
  assert!(matches!(err, AppError::Validation(ref m) if m.contains("may not exceed")));

  let half = CartItem {
    product_id: tote.id,
    quantity: u32::MAX / 2 + 1,
  };
  let err = checkout::submit(&app.state, &session, vec![half, half], checkout_form())
    .await
    .unwrap_err();
  assert!(matches!(err, AppError::Validation(_)));

  let err = checkout::submit(
    &app.state,
    &session,
    vec![CartItem {
      product_id: vault.id,
      quantity: 10,
    }],
    checkout_form(),
  )
  .await
  .unwrap_err();
  assert!(matches!(err, AppError::Validation(ref m) if m == "Order total is too large."));

  assert!(app.store.list_orders(&Actor::Service, user.id).await.unwrap().is_empty());
}
