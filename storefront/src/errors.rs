// storefront/src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;
use orderflow::FlowError;

/// Message shown to shoppers when a checkout collaborator fails.
pub const CHECKOUT_FAILED_MESSAGE: &str = "Checkout failed. Please try again.";

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Forbidden: {0}")]
  Forbidden(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Payment Processing Error: {0}")]
  Payment(String),

  /// Checkout could not be completed; the detail stays in the logs.
  #[error("Checkout Failed: {detail}")]
  CheckoutFailed { detail: String },

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Data Store Error: {0}")]
  Store(#[from] StoreError),

  #[error("Workflow Error: {source}")]
  Workflow {
    #[from]
    source: FlowError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),

  // A pipeline stopped early where the HTTP handler expected it to complete.
  #[error("Pipeline execution was halted by a handler.")]
  PipelineHaltedByHandler,
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    match err.downcast::<StoreError>() {
      Ok(store_err) => AppError::Store(store_err),
      Err(err) => AppError::Internal(err.to_string()),
    }
  }
}

impl AppError {
  /// The single human-readable string placed in the `{"error": ...}` body.
  pub fn public_message(&self) -> String {
    match self {
      AppError::Validation(m)
      | AppError::Auth(m)
      | AppError::Forbidden(m)
      | AppError::NotFound(m)
      | AppError::Payment(m)
      | AppError::Internal(m) => m.clone(),
      AppError::CheckoutFailed { .. } => CHECKOUT_FAILED_MESSAGE.to_string(),
      AppError::Config(_) => "Configuration issue".to_string(),
      AppError::Store(store_err) => match store_err {
        StoreError::PolicyViolation(m)
        | StoreError::NotFound(m)
        | StoreError::UniqueViolation(m)
        | StoreError::InvalidState(m) => m.clone(),
        _ => "Data store operation failed".to_string(),
      },
      AppError::Workflow { source } => source.to_string(),
      AppError::PipelineHaltedByHandler => "Process halted by business logic.".to_string(),
    }
  }

  /// Whether retrying the same request could succeed.
  pub fn is_retryable(&self) -> bool {
    match self {
      AppError::Store(store_err) => matches!(store_err, StoreError::Unavailable(_) | StoreError::Sqlx(_)),
      AppError::CheckoutFailed { .. } => true,
      _ => false,
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) => StatusCode::BAD_REQUEST,
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::Forbidden(_) => StatusCode::FORBIDDEN,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::Payment(_) => StatusCode::PAYMENT_REQUIRED,
      AppError::Store(StoreError::PolicyViolation(_)) => StatusCode::FORBIDDEN,
      AppError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
      AppError::Store(StoreError::UniqueViolation(_)) => StatusCode::CONFLICT,
      AppError::Store(StoreError::InvalidState(_)) => StatusCode::CONFLICT,
      AppError::PipelineHaltedByHandler => StatusCode::CONFLICT,
      AppError::CheckoutFailed { .. }
      | AppError::Config(_)
      | AppError::Store(_)
      | AppError::Workflow { .. }
      | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with error");
    } else {
      tracing::warn!(application_error = %self, status = status.as_u16(), "Responding with error");
    }
    HttpResponse::build(status).json(json!({ "error": self.public_message() }))
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
