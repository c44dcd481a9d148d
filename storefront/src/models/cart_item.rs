// storefront/src/models/cart_item.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One line of the client-side cart. Serialized exactly as the browser keeps it:
/// `{"productId": "...", "quantity": 2}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
  pub product_id: Uuid,
  pub quantity: u32,
}
