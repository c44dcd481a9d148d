// storefront/src/cart/mod.rs

//! The shopper's cart, persisted as one JSON array under the `cart` key.

pub mod storage;

pub use storage::{FileStorage, LocalStorage, MemoryStorage};

use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::CartItem;

pub const CART_STORAGE_KEY: &str = "cart";

#[derive(Debug, Error)]
pub enum CartError {
  #[error("cart storage failed: {0}")]
  Storage(#[from] std::io::Error),

  #[error("cart could not be serialized: {0}")]
  Serialize(#[from] serde_json::Error),

  #[error("quantity must be positive")]
  InvalidQuantity,
}

impl From<CartError> for AppError {
  fn from(err: CartError) -> Self {
    match err {
      CartError::InvalidQuantity => AppError::Validation(err.to_string()),
      other => AppError::Internal(other.to_string()),
    }
  }
}

pub struct CartStore<S: LocalStorage> {
  storage: S,
}

impl<S: LocalStorage> CartStore<S> {
  pub fn new(storage: S) -> Self {
    Self { storage }
  }

  /// Current lines. Unreadable contents are treated as an empty cart.
  pub fn items(&self) -> Result<Vec<CartItem>, CartError> {
    let Some(raw) = self.storage.get_item(CART_STORAGE_KEY)? else {
      return Ok(Vec::new());
    };
    match serde_json::from_str::<Vec<CartItem>>(&raw) {
      Ok(items) => Ok(items.into_iter().filter(|i| i.quantity > 0).collect()),
      Err(e) => {
        warn!(error = %e, "Discarding unreadable cart contents.");
        Ok(Vec::new())
      }
    }
  }

  fn save(&self, items: &[CartItem]) -> Result<(), CartError> {
    if items.is_empty() {
      self.storage.remove_item(CART_STORAGE_KEY)?;
      return Ok(());
    }
    let raw = serde_json::to_string(items)?;
    self.storage.set_item(CART_STORAGE_KEY, &raw)?;
    Ok(())
  }

  /// Adds `quantity` of a product, merging with an existing line.
  pub fn add(&self, product_id: Uuid, quantity: u32) -> Result<Vec<CartItem>, CartError> {
    if quantity == 0 {
      return Err(CartError::InvalidQuantity);
    }
    let mut items = self.items()?;
    match items.iter_mut().find(|i| i.product_id == product_id) {
      Some(line) => line.quantity = line.quantity.saturating_add(quantity),
      None => items.push(CartItem { product_id, quantity }),
    }
    self.save(&items)?;
    Ok(items)
  }

  /// Sets a line's quantity; zero removes the line.
  pub fn update_quantity(&self, product_id: Uuid, quantity: u32) -> Result<Vec<CartItem>, CartError> {
    if quantity == 0 {
      return self.remove(product_id);
    }
    let mut items = self.items()?;
    match items.iter_mut().find(|i| i.product_id == product_id) {
      Some(line) => line.quantity = quantity,
      None => items.push(CartItem { product_id, quantity }),
    }
    self.save(&items)?;
    Ok(items)
  }

  pub fn remove(&self, product_id: Uuid) -> Result<Vec<CartItem>, CartError> {
    let mut items = self.items()?;
    items.retain(|i| i.product_id != product_id);
    self.save(&items)?;
    Ok(items)
  }

  pub fn clear(&self) -> Result<(), CartError> {
    self.save(&[])
  }

  pub fn total_quantity(&self) -> Result<u64, CartError> {
    Ok(self.items()?.iter().map(|i| u64::from(i.quantity)).sum())
  }

  pub fn storage(&self) -> &S {
    &self.storage
  }
}
