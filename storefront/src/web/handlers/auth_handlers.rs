// storefront/src/web/handlers/auth_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedSession;

// --- Request DTOs ---
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequestPayload {
  pub email: String,
  pub password: String,
  pub full_name: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct SigninRequestPayload {
  pub email: String,
  pub password: String,
}

#[instrument(name = "handler::signup", skip(app_state, req_payload))]
pub async fn signup_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<SignupRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let SignupRequestPayload {
    email,
    password,
    full_name,
  } = req_payload.into_inner();
  let user = app_state.auth.sign_up(&email, &password, full_name).await?;
  Ok(HttpResponse::Created().json(json!({
      "message": "User created successfully.",
      "user": user,
  })))
}

#[instrument(name = "handler::signin", skip(app_state, req_payload))]
pub async fn signin_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<SigninRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let (user, session) = app_state
    .auth
    .sign_in_with_password(&req_payload.email, &req_payload.password)
    .await?;
  info!(user_id = %user.id, "Signin successful.");
  Ok(HttpResponse::Ok().json(json!({
      "user": user,
      "session": session,
  })))
}

#[instrument(name = "handler::signout", skip_all, fields(user_id = %auth.0.user_id))]
pub async fn signout_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedSession,
) -> Result<HttpResponse, AppError> {
  app_state.auth.sign_out(&auth.0.access_token);
  Ok(HttpResponse::NoContent().finish())
}

#[instrument(name = "handler::current_user", skip_all, fields(user_id = %auth.0.user_id))]
pub async fn current_user_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedSession,
) -> Result<HttpResponse, AppError> {
  let user = app_state.auth.get_user(&auth.0.access_token).await?;
  Ok(HttpResponse::Ok().json(json!({ "user": user })))
}
