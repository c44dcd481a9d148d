// storefront/src/services/auth_service.rs

//! Sign-up, sign-in and sign-out against the identity platform, plus Argon2
//! password hashing.

use crate::errors::{AppError, Result};
use crate::models::{NewUser, User};
use crate::services::session::{AuthEvent, Session, SessionManager};
use crate::store::{DataStore, StoreError};
use argon2::{
  password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
  Argon2,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, warn};

pub const MIN_PASSWORD_LEN: usize = 8;

/// Hashes a plain-text password using Argon2 with a fresh random salt.
#[instrument(name = "auth_service::hash_password", skip(password), err(Display))]
pub fn hash_password(password: &str) -> Result<String> {
  if password.is_empty() {
    return Err(AppError::Validation("Password cannot be empty.".to_string()));
  }
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|argon_err| {
      error!(error = %argon_err, "Argon2 password hashing failed.");
      AppError::Internal(format!("Password hashing process failed: {}", argon_err))
    })
}

/// Verifies a plain-text password against a stored Argon2 hash.
///
/// `Ok(false)` means the password does not match; `Err` means the stored hash
/// could not be used at all.
#[instrument(name = "auth_service::verify_password", skip_all, err(Display))]
pub fn verify_password(hashed_password: &str, provided_password: &str) -> Result<bool> {
  if provided_password.is_empty() {
    return Ok(false);
  }
  let parsed_hash = PasswordHash::new(hashed_password).map_err(|parse_err| {
    error!(error = %parse_err, "Failed to parse stored password hash string.");
    AppError::Internal(format!("Invalid stored password hash format: {}", parse_err))
  })?;

  match Argon2::default().verify_password(provided_password.as_bytes(), &parsed_hash) {
    Ok(()) => Ok(true),
    Err(argon2::password_hash::Error::Password) => {
      debug!("Password verification failed: passwords do not match.");
      Ok(false)
    }
    Err(other_argon_err) => {
      error!(error = %other_argon_err, "Argon2 password verification process encountered an error.");
      Err(AppError::Internal(format!(
        "Password verification process failed: {}",
        other_argon_err
      )))
    }
  }
}

fn validate_email(email: &str) -> Result<String> {
  let email = email.trim().to_lowercase();
  let valid = email
    .split_once('@')
    .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.') && !domain.starts_with('.'));
  if !valid {
    return Err(AppError::Validation("Valid email is required.".to_string()));
  }
  Ok(email)
}

#[derive(Clone)]
pub struct AuthService {
  store: Arc<dyn DataStore>,
  sessions: Arc<SessionManager>,
}

impl AuthService {
  pub fn new(store: Arc<dyn DataStore>, sessions: Arc<SessionManager>) -> Self {
    Self { store, sessions }
  }

  #[instrument(name = "auth_service::sign_up", skip(self, password, full_name), err(Display))]
  pub async fn sign_up(&self, email: &str, password: &str, full_name: Option<String>) -> Result<User> {
    let email = validate_email(email)?;
    if password.chars().count() < MIN_PASSWORD_LEN {
      return Err(AppError::Validation(format!(
        "Password must be at least {} characters.",
        MIN_PASSWORD_LEN
      )));
    }
    let password_hash = hash_password(password)?;
    let full_name = full_name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());

    let user = self
      .store
      .insert_user(NewUser {
        email,
        password_hash,
        full_name,
      })
      .await
      .map_err(|e| match e {
        StoreError::UniqueViolation(_) => AppError::Validation("Email is already registered.".to_string()),
        other => AppError::Store(other),
      })?;
    info!(user_id = %user.id, "User signed up.");
    Ok(user)
  }

  #[instrument(name = "auth_service::sign_in", skip(self, password), err(Display))]
  pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<(User, Session)> {
    let email = validate_email(email)?;
    let Some(user) = self.store.find_user_by_email(&email).await? else {
      warn!("Sign-in attempt for unknown email.");
      return Err(AppError::Auth("Invalid email or password.".to_string()));
    };
    if !verify_password(&user.password_hash, password)? {
      warn!(user_id = %user.id, "Sign-in attempt with wrong password.");
      return Err(AppError::Auth("Invalid email or password.".to_string()));
    }
    let session = self.sessions.issue(&user);
    Ok((user, session))
  }

  #[instrument(name = "auth_service::sign_out", skip_all)]
  pub fn sign_out(&self, access_token: &str) -> bool {
    self.sessions.revoke(access_token).is_some()
  }

  /// The user behind a live access token.
  #[instrument(name = "auth_service::get_user", skip_all, err(Display))]
  pub async fn get_user(&self, access_token: &str) -> Result<User> {
    let session = self.sessions.validate(access_token)?;
    self
      .store
      .get_user(session.user_id)
      .await?
      .ok_or_else(|| AppError::Auth("Account no longer exists.".to_string()))
  }

  pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
    self.sessions.subscribe()
  }

  pub fn sessions(&self) -> &Arc<SessionManager> {
    &self.sessions
  }
}
