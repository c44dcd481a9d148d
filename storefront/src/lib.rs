// storefront/src/lib.rs

//! Storefront backend: catalog, sessions, checkout and the fulfillment
//! functions, with each multi-step workflow run as an `orderflow` pipeline.

pub mod cart;
pub mod catalog;
pub mod config;
pub mod errors;
pub mod models;
pub mod pipelines;
pub mod seed;
pub mod services;
pub mod state;
pub mod store;
pub mod web;
