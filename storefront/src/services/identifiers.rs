// storefront/src/services/identifiers.rs

//! Human-facing identifiers for orders and gateway transactions.

use chrono::{DateTime, Utc};
use uuid::Uuid;

fn random_hex(len: usize) -> String {
  let hex = Uuid::new_v4().simple().to_string().to_uppercase();
  hex.chars().take(len).collect()
}

/// `ORD-<UTC yyyymmddHHMMSSmmm>-<6 hex>`, e.g. `ORD-20240301121530042-9F3A1C`.
pub fn order_number(now: DateTime<Utc>) -> String {
  format!("ORD-{}-{}", now.format("%Y%m%d%H%M%S%3f"), random_hex(6))
}

/// `TXN-<unix millis>-<8 hex>`.
pub fn transaction_id(now: DateTime<Utc>) -> String {
  format!("TXN-{}-{}", now.timestamp_millis(), random_hex(8))
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  #[test]
  fn order_number_layout() {
    let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 15, 30).unwrap() + chrono::Duration::milliseconds(42);
    let number = order_number(at);
    let parts: Vec<&str> = number.split('-').collect();
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[0], "ORD");
    assert_eq!(parts[1], "20240301121530042");
    assert_eq!(parts[2].len(), 6);
    assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
  }

  #[test]
  fn transaction_id_layout() {
    let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
    let txn = transaction_id(at);
    assert!(txn.starts_with("TXN-1700000000123-"));
    assert_eq!(txn.len(), "TXN-1700000000123-".len() + 8);
  }

  #[test]
  fn suffixes_differ_between_calls() {
    let now = Utc::now();
    assert_ne!(order_number(now), order_number(now));
  }
}
