// storefront/src/services/mod.rs
pub mod auth_service;
pub mod checkout;
pub mod fulfillment;
pub mod identifiers;
pub mod payment_gateway;
pub mod pricing;
pub mod session;
