// storefront/src/catalog.rs

//! Read-only product queries: filtering, sorting, paging and bulk price lookup.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::models::Product;
use crate::store::DataStore;

pub const DEFAULT_PER_PAGE: u32 = 12;
pub const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
  #[default]
  Newest,
  PriceAsc,
  PriceDesc,
  NameAsc,
}

impl ProductSort {
  pub fn compare(&self, a: &Product, b: &Product) -> Ordering {
    match self {
      ProductSort::Newest => b.created_at.cmp(&a.created_at),
      ProductSort::PriceAsc => a.price_cents.cmp(&b.price_cents),
      ProductSort::PriceDesc => b.price_cents.cmp(&a.price_cents),
      ProductSort::NameAsc => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
    }
    .then_with(|| a.id.cmp(&b.id))
  }

  pub(crate) fn order_by_sql(&self) -> &'static str {
    match self {
      ProductSort::Newest => "created_at DESC, id",
      ProductSort::PriceAsc => "price_cents ASC, id",
      ProductSort::PriceDesc => "price_cents DESC, id",
      ProductSort::NameAsc => "lower(name) ASC, id",
    }
  }
}

/// Query-string shape of `GET /api/v1/products`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProductQuery {
  pub search: Option<String>,
  pub category: Option<String>,
  pub min_price_cents: Option<i64>,
  pub max_price_cents: Option<i64>,
  #[serde(default)]
  pub in_stock_only: bool,
  #[serde(default)]
  pub sort: ProductSort,
  #[serde(default = "first_page")]
  pub page: u32,
  #[serde(default = "default_per_page")]
  pub per_page: u32,
}

fn first_page() -> u32 {
  1
}

fn default_per_page() -> u32 {
  DEFAULT_PER_PAGE
}

impl Default for ProductQuery {
  fn default() -> Self {
    Self {
      search: None,
      category: None,
      min_price_cents: None,
      max_price_cents: None,
      in_stock_only: false,
      sort: ProductSort::default(),
      page: first_page(),
      per_page: default_per_page(),
    }
  }
}

impl ProductQuery {
  /// Trims text filters, clamps paging and rejects inverted price ranges.
  pub fn normalized(mut self) -> Result<Self> {
    self.search = self.search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    self.category = self.category.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    if let (Some(min), Some(max)) = (self.min_price_cents, self.max_price_cents) {
      if min > max {
        return Err(AppError::Validation(
          "min_price_cents cannot exceed max_price_cents".to_string(),
        ));
      }
    }
    self.page = self.page.max(1);
    self.per_page = match self.per_page {
      0 => DEFAULT_PER_PAGE,
      n => n.min(MAX_PER_PAGE),
    };
    Ok(self)
  }

  pub fn offset(&self) -> u64 {
    u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
  }

  /// Search is a case-insensitive substring match on name and description.
  pub fn matches(&self, product: &Product) -> bool {
    if let Some(needle) = &self.search {
      let needle = needle.to_lowercase();
      let in_name = product.name.to_lowercase().contains(&needle);
      let in_description = product
        .description
        .as_deref()
        .is_some_and(|d| d.to_lowercase().contains(&needle));
      if !in_name && !in_description {
        return false;
      }
    }
    if let Some(category) = &self.category {
      if product.category.as_deref() != Some(category.as_str()) {
        return false;
      }
    }
    if self.min_price_cents.is_some_and(|min| product.price_cents < min) {
      return false;
    }
    if self.max_price_cents.is_some_and(|max| product.price_cents > max) {
      return false;
    }
    !(self.in_stock_only && product.stock_quantity <= 0)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductPage {
  pub products: Vec<Product>,
  pub total: u64,
  pub page: u32,
  pub per_page: u32,
}

#[derive(Clone)]
pub struct Catalog {
  store: Arc<dyn DataStore>,
}

impl Catalog {
  pub fn new(store: Arc<dyn DataStore>) -> Self {
    Self { store }
  }

  #[instrument(name = "catalog::list", skip(self, query), err(Display))]
  pub async fn list(&self, query: ProductQuery) -> Result<ProductPage> {
    let query = query.normalized()?;
    let page = self.store.query_products(&query).await?;
    debug!(returned = page.products.len(), total = page.total, "Product page fetched.");
    Ok(page)
  }

  #[instrument(name = "catalog::get", skip(self), err(Display))]
  pub async fn get(&self, product_id: Uuid) -> Result<Product> {
    self
      .store
      .get_product(product_id)
      .await?
      .ok_or_else(|| AppError::NotFound(format!("Product with ID {} not found.", product_id)))
  }

  /// Unit price in cents for every id in `product_ids`. Any unknown id is an error.
  #[instrument(name = "catalog::unit_prices", skip(self, product_ids), fields(requested = product_ids.len()), err(Display))]
  pub async fn unit_prices(&self, product_ids: &[Uuid]) -> Result<HashMap<Uuid, i64>> {
    let products = self.store.products_by_ids(product_ids).await?;
    let prices: HashMap<Uuid, i64> = products.into_iter().map(|p| (p.id, p.price_cents)).collect();
    let missing: Vec<String> = product_ids
      .iter()
      .filter(|id| !prices.contains_key(id))
      .map(Uuid::to_string)
      .collect();
    if !missing.is_empty() {
      warn!(missing = ?missing, "Price lookup found unknown products.");
      return Err(AppError::NotFound(format!("Unknown products: {}", missing.join(", "))));
    }
    Ok(prices)
  }
}
