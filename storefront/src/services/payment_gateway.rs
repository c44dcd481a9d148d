// storefront/src/services/payment_gateway.rs

//! The seam to a card processor.

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::Result;
use crate::services::identifiers;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
  pub payment_id: Uuid,
  pub order_id: Uuid,
  pub amount_cents: i64,
  pub payment_method: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayDecision {
  Approved { transaction_id: String },
  Declined { reason: String },
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
  /// `Err` means the gateway could not be reached; a decline is `Ok(Declined)`.
  async fn authorize(&self, request: &AuthorizationRequest) -> Result<GatewayDecision>;
}

/// Approves every well-formed request with a fresh `TXN-` id.
#[derive(Debug, Default, Clone, Copy)]
pub struct ApprovingGateway;

#[async_trait]
impl PaymentGateway for ApprovingGateway {
  #[instrument(name = "gateway::authorize", skip(self, request), fields(payment_id = %request.payment_id, amount_cents = request.amount_cents))]
  async fn authorize(&self, request: &AuthorizationRequest) -> Result<GatewayDecision> {
    let transaction_id = identifiers::transaction_id(Utc::now());
    info!(%transaction_id, "Payment approved.");
    Ok(GatewayDecision::Approved { transaction_id })
  }
}
