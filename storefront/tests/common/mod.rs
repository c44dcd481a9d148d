// tests/common/mod.rs
#![allow(dead_code)]

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::Level;
use uuid::Uuid;

use storefront::config::AppConfig;
use storefront::models::{NewProduct, Product, User};
use storefront::services::checkout::CheckoutForm;
use storefront::services::payment_gateway::{ApprovingGateway, PaymentGateway};
use storefront::services::session::Session;
use storefront::state::AppState;
use storefront::store::{Actor, DataStore, MemoryStore};

pub const SERVICE_KEY: &str = "test-service-role-key";
pub const PASSWORD: &str = "correct horse battery";

static TRACING: Lazy<()> = Lazy::new(|| {
  let _ = tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING);
}

pub fn test_config() -> AppConfig {
  let vars = HashMap::from([("SERVICE_ROLE_KEY", SERVICE_KEY)]);
  AppConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string())).expect("test config")
}

/// App state over a fresh in-memory store. The store handle is returned
/// separately so tests can inject faults and inspect rows.
pub struct TestApp {
  pub state: AppState,
  pub store: Arc<MemoryStore>,
}

impl TestApp {
  pub fn new() -> Self {
    Self::with_gateway(Arc::new(ApprovingGateway))
  }

  pub fn with_gateway(gateway: Arc<dyn PaymentGateway>) -> Self {
    setup_tracing();
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(test_config(), store.clone() as Arc<dyn DataStore>, gateway);
    Self { state, store }
  }

  pub async fn product(&self, name: &str, price_cents: i64, stock_quantity: i32) -> Product {
    self
      .store
      .insert_product(
        &Actor::Service,
        NewProduct {
          name: name.to_string(),
          description: None,
          category: None,
          image_url: None,
          price_cents,
          stock_quantity,
        },
      )
      .await
      .expect("insert product")
  }

  pub async fn signed_in_user(&self, email: &str) -> (User, Session) {
    self
      .state
      .auth
      .sign_up(email, PASSWORD, Some("Test Shopper".into()))
      .await
      .expect("sign up");
    self
      .state
      .auth
      .sign_in_with_password(email, PASSWORD)
      .await
      .expect("sign in")
  }

  pub async fn stock_of(&self, product_id: Uuid) -> i32 {
    self
      .store
      .get_product(product_id)
      .await
      .expect("get product")
      .expect("product exists")
      .stock_quantity
  }
}

pub fn checkout_form() -> CheckoutForm {
  CheckoutForm {
    full_name: "Test Shopper".into(),
    email: "shopper@example.com".into(),
    phone: "555-0100".into(),
    address: "1 Market St".into(),
    city: "Springfield".into(),
    country: "US".into(),
    zip_code: "12345".into(),
    payment_method: "card".into(),
  }
}
