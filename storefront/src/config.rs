// storefront/src/config.rs

use crate::errors::{AppError, Result};
use crate::services::pricing::PricingRules;
use dotenvy::dotenv;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  /// Absent means the in-memory store is used.
  pub database_url: Option<String>,
  /// Bearer token the fulfillment functions accept. Never logged.
  pub service_role_key: String,
  pub session_ttl_secs: i64,
  pub tax_rate_bps: u32,
  pub free_shipping_threshold_cents: i64,
  pub flat_shipping_cents: i64,
  pub seed_db: bool,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present
    let config = Self::from_lookup(|name| std::env::var(name).ok())?;
    tracing::info!(
      server_host = %config.server_host,
      server_port = config.server_port,
      persistent_store = config.database_url.is_some(),
      "Application configuration loaded successfully."
    );
    Ok(config)
  }

  /// Builds the configuration from an arbitrary variable source.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let get_env = |var_name: &str| lookup(var_name).filter(|v| !v.trim().is_empty());

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
    let server_port = parse_or(&get_env, "SERVER_PORT", 8080u16)?;
    let database_url = get_env("DATABASE_URL");
    let service_role_key = get_env("SERVICE_ROLE_KEY")
      .ok_or_else(|| AppError::Config("Missing environment variable 'SERVICE_ROLE_KEY'".to_string()))?;

    let session_ttl_secs = parse_or(&get_env, "SESSION_TTL_SECS", 3600i64)?;
    if session_ttl_secs <= 0 {
      return Err(AppError::Config("SESSION_TTL_SECS must be positive".to_string()));
    }
    let tax_rate_bps = parse_or(&get_env, "TAX_RATE_BPS", 1000u32)?;
    let free_shipping_threshold_cents = parse_or(&get_env, "FREE_SHIPPING_THRESHOLD_CENTS", 10_000i64)?;
    let flat_shipping_cents = parse_or(&get_env, "FLAT_SHIPPING_CENTS", 1000i64)?;
    if free_shipping_threshold_cents < 0 || flat_shipping_cents < 0 {
      return Err(AppError::Config("Shipping amounts cannot be negative".to_string()));
    }
    let seed_db = parse_or(&get_env, "SEED_DB", false)?;

    Ok(Self {
      server_host,
      server_port,
      database_url,
      service_role_key,
      session_ttl_secs,
      tax_rate_bps,
      free_shipping_threshold_cents,
      flat_shipping_cents,
      seed_db,
    })
  }

  pub fn pricing_rules(&self) -> PricingRules {
    PricingRules {
      tax_rate_bps: self.tax_rate_bps,
      free_shipping_threshold_cents: self.free_shipping_threshold_cents,
      flat_shipping_cents: self.flat_shipping_cents,
    }
  }

  pub fn bind_address(&self) -> String {
    format!("{}:{}", self.server_host, self.server_port)
  }
}

fn parse_or<T>(get_env: &impl Fn(&str) -> Option<String>, var_name: &str, default: T) -> Result<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  match get_env(var_name) {
    Some(raw) => raw
      .trim()
      .parse::<T>()
      .map_err(|e| AppError::Config(format!("Invalid {}: {}", var_name, e))),
    None => Ok(default),
  }
}
