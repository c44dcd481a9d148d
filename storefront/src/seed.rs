// storefront/src/seed.rs

//! Demo catalog loaded at startup when `SEED_DB=true`.

use tracing::{info, instrument};

use crate::catalog::ProductQuery;
use crate::errors::Result;
use crate::models::NewProduct;
use crate::store::{Actor, DataStore};

fn demo_product(name: &str, description: &str, category: &str, price_cents: i64, stock_quantity: i32) -> NewProduct {
  NewProduct {
    name: name.to_string(),
    description: Some(description.to_string()),
    category: Some(category.to_string()),
    image_url: None,
    price_cents,
    stock_quantity,
  }
}

pub fn demo_catalog() -> Vec<NewProduct> {
  vec![
    demo_product("Canvas Tote", "Heavy cotton tote bag.", "accessories", 2000, 50),
    demo_product("Leather Wallet", "Slim bifold wallet.", "accessories", 4500, 25),
    demo_product("Wool Beanie", "Ribbed merino beanie.", "apparel", 2500, 40),
    demo_product("Rain Jacket", "Packable waterproof shell.", "apparel", 12000, 10),
    demo_product("Ceramic Mug", "Stoneware mug, 350 ml.", "home", 1500, 80),
    demo_product("Desk Lamp", "Dimmable LED desk lamp.", "home", 6500, 15),
  ]
}

/// Inserts the demo catalog unless products already exist. Returns how many were inserted.
#[instrument(name = "seed::demo_catalog", skip(store), err(Display))]
pub async fn seed_demo_catalog(store: &dyn DataStore) -> Result<usize> {
  let existing = store.query_products(&ProductQuery::default()).await?;
  if existing.total > 0 {
    info!(existing = existing.total, "Catalog already populated, skipping seed.");
    return Ok(0);
  }
  let products = demo_catalog();
  let count = products.len();
  for product in products {
    store.insert_product(&Actor::Service, product).await?;
  }
  info!(count, "Demo catalog seeded.");
  Ok(count)
}
