// storefront/src/web/extractors.rs

//! Bearer-token extractors for shopper sessions and service callers.

use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use tracing::warn;

use crate::errors::AppError;
use crate::services::session::Session;
use crate::state::AppState;

fn bearer_token(req: &HttpRequest) -> Option<&str> {
  req
    .headers()
    .get(AUTHORIZATION)?
    .to_str()
    .ok()?
    .strip_prefix("Bearer ")
    .map(str::trim)
    .filter(|t| !t.is_empty())
}

fn app_state(req: &HttpRequest) -> Result<&web::Data<AppState>, AppError> {
  req
    .app_data::<web::Data<AppState>>()
    .ok_or_else(|| AppError::Internal("Application state is not configured.".to_string()))
}

/// A live session resolved from `Authorization: Bearer <access token>`.
#[derive(Debug, Clone)]
pub struct AuthenticatedSession(pub Session);

impl FromRequest for AuthenticatedSession {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(resolve_session(req))
  }
}

fn resolve_session(req: &HttpRequest) -> Result<AuthenticatedSession, AppError> {
  let state = app_state(req)?;
  let Some(token) = bearer_token(req) else {
    return Err(AppError::Auth("Sign in required.".to_string()));
  };
  state.sessions.validate(token).map(AuthenticatedSession)
}

/// A caller holding the service role key. Required before any fulfillment
/// function touches data.
#[derive(Debug, Clone, Copy)]
pub struct ServiceCaller;

impl FromRequest for ServiceCaller {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(resolve_service_caller(req))
  }
}

fn resolve_service_caller(req: &HttpRequest) -> Result<ServiceCaller, AppError> {
  let state = app_state(req)?;
  match bearer_token(req) {
    Some(token) if keys_match(token, &state.config.service_role_key) => Ok(ServiceCaller),
    Some(_) => {
      warn!(path = %req.path(), "Function call with an invalid service key.");
      Err(AppError::Auth("Invalid service credentials.".to_string()))
    }
    None => {
      warn!(path = %req.path(), "Function call without credentials.");
      Err(AppError::Auth("Missing service credentials.".to_string()))
    }
  }
}

// Compares every byte regardless of where the first mismatch is.
fn keys_match(presented: &str, expected: &str) -> bool {
  let (a, b) = (presented.as_bytes(), expected.as_bytes());
  a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
  use super::*;
  use actix_web::test::TestRequest;

  #[test]
  fn bearer_token_requires_scheme_and_value() {
    let req = TestRequest::default()
      .insert_header((AUTHORIZATION, "Bearer abc123"))
      .to_http_request();
    assert_eq!(bearer_token(&req), Some("abc123"));

    let req = TestRequest::default()
      .insert_header((AUTHORIZATION, "Basic abc123"))
      .to_http_request();
    assert_eq!(bearer_token(&req), None);

    let req = TestRequest::default().insert_header((AUTHORIZATION, "Bearer   ")).to_http_request();
    assert_eq!(bearer_token(&req), None);

    assert_eq!(bearer_token(&TestRequest::default().to_http_request()), None);
  }

  #[test]
  fn keys_match_is_exact() {
    assert!(keys_match("service-key", "service-key"));
    assert!(!keys_match("service-kez", "service-key"));
    assert!(!keys_match("service", "service-key"));
  }
}
