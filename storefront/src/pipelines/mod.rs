// storefront/src/pipelines/mod.rs

//! The storefront's workflows, each an `orderflow` pipeline over its own
//! context type.

use crate::errors::AppError;
use orderflow::Registry;

pub mod contexts;

pub mod checkout_pipeline;
pub mod order_confirmation_pipeline;
pub mod payment_confirmation_pipeline;

/// Registers every workflow pipeline. Called once while building `AppState`.
pub fn register_all_pipelines(registry: &Registry<AppError>) {
  checkout_pipeline::register_checkout_pipeline(registry);
  order_confirmation_pipeline::register_order_confirmation_pipeline(registry);
  payment_confirmation_pipeline::register_payment_confirmation_pipeline(registry);
  tracing::info!("All application pipelines registered.");
}
