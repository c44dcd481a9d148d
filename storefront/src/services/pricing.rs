// storefront/src/services/pricing.rs

//! Order totals in integer cents.

use serde::Serialize;

/// Largest quantity a single checkout line may carry.
pub const MAX_LINE_QUANTITY: u32 = 10_000;

/// Tax rate in basis points plus the shipping rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingRules {
  pub tax_rate_bps: u32,
  /// Orders whose subtotal is strictly above this ship free.
  pub free_shipping_threshold_cents: i64,
  pub flat_shipping_cents: i64,
}

impl Default for PricingRules {
  fn default() -> Self {
    Self {
      tax_rate_bps: 1000,
      free_shipping_threshold_cents: 10_000,
      flat_shipping_cents: 1000,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
  pub subtotal_cents: i64,
  pub tax_cents: i64,
  pub shipping_cents: i64,
  pub total_cents: i64,
}

impl PricingRules {
  /// Tax rounded half-up to the cent. `None` on overflow.
  pub fn tax_for(&self, subtotal_cents: i64) -> Option<i64> {
    subtotal_cents
      .checked_mul(i64::from(self.tax_rate_bps))?
      .checked_add(5_000)
      .map(|scaled| scaled.div_euclid(10_000))
  }

  pub fn shipping_for(&self, subtotal_cents: i64) -> i64 {
    if subtotal_cents > self.free_shipping_threshold_cents {
      0
    } else {
      self.flat_shipping_cents
    }
  }

  /// Totals for `(unit_price_cents, quantity)` lines, or `None` when any
  /// amount leaves the `i64` cent range.
  pub fn totals<I>(&self, lines: I) -> Option<OrderTotals>
  where
    I: IntoIterator<Item = (i64, u32)>,
  {
    let subtotal_cents = lines
      .into_iter()
      .try_fold(0i64, |acc, (unit, qty)| acc.checked_add(unit.checked_mul(i64::from(qty))?))?;
    let tax_cents = self.tax_for(subtotal_cents)?;
    let shipping_cents = self.shipping_for(subtotal_cents);
    Some(OrderTotals {
      subtotal_cents,
      tax_cents,
      shipping_cents,
      total_cents: subtotal_cents.checked_add(tax_cents)?.checked_add(shipping_cents)?,
    })
  }
}

/// `7600` -> `"$76.00"`.
pub fn format_cents(cents: i64) -> String {
  let sign = if cents < 0 { "-" } else { "" };
  let abs = cents.unsigned_abs();
  format!("{}${}.{:02}", sign, abs / 100, abs % 100)
}

/// Converts an amount in major units (`76.5`) to cents, rounding to the nearest cent.
pub fn major_to_cents(amount: f64) -> Option<i64> {
  if !amount.is_finite() {
    return None;
  }
  let cents = (amount * 100.0).round();
  if cents.abs() > i64::MAX as f64 {
    return None;
  }
  Some(cents as i64)
}
