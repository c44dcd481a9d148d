// storefront/src/services/session.rs

//! Explicit, expiring sessions and the auth-state-change stream.
//!
//! A [`Session`] is issued at sign-in and handed to every workflow call. It is
//! live until it is revoked at sign-out or its `expires_at` passes. Expired
//! sessions are dropped when their token is checked or when a new session is
//! issued, and each drop emits [`AuthEvent::SessionExpired`].

use argon2::password_hash::rand_core::{OsRng, RngCore};
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::models::User;

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
  pub access_token: String,
  pub user_id: Uuid,
  pub email: String,
  pub issued_at: DateTime<Utc>,
  pub expires_at: DateTime<Utc>,
}

impl Session {
  pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
    now >= self.expires_at
  }
}

// Tokens stay out of logs.
impl fmt::Debug for Session {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Session")
      .field("user_id", &self.user_id)
      .field("email", &self.email)
      .field("expires_at", &self.expires_at)
      .finish_non_exhaustive()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
  SignedIn { user_id: Uuid },
  SignedOut { user_id: Uuid },
  SessionExpired { user_id: Uuid },
}

pub struct SessionManager {
  sessions: RwLock<HashMap<String, Session>>,
  ttl: Duration,
  events: broadcast::Sender<AuthEvent>,
}

fn new_access_token() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

impl SessionManager {
  pub fn new(ttl_secs: i64) -> Self {
    let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
    Self {
      sessions: RwLock::new(HashMap::new()),
      ttl: Duration::seconds(ttl_secs),
      events,
    }
  }

  pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
    self.events.subscribe()
  }

  fn emit(&self, event: AuthEvent) {
    // No subscribers is not an error.
    let _ = self.events.send(event);
  }

  pub fn issue(&self, user: &User) -> Session {
    self.issue_at(user, Utc::now())
  }

  pub fn issue_at(&self, user: &User, now: DateTime<Utc>) -> Session {
    let session = Session {
      access_token: new_access_token(),
      user_id: user.id,
      email: user.email.clone(),
      issued_at: now,
      expires_at: now + self.ttl,
    };
    let expired = {
      let mut sessions = self.sessions.write();
      let expired = sweep_expired(&mut sessions, now);
      sessions.insert(session.access_token.clone(), session.clone());
      expired
    };
    self.emit_expired(expired);
    info!(user_id = %user.id, expires_at = %session.expires_at, "Session issued.");
    self.emit(AuthEvent::SignedIn { user_id: user.id });
    session
  }

  /// Drops every session expired at `now`. Returns how many were dropped.
  pub fn purge_expired_at(&self, now: DateTime<Utc>) -> usize {
    let expired = sweep_expired(&mut self.sessions.write(), now);
    let count = expired.len();
    self.emit_expired(expired);
    count
  }

  fn emit_expired(&self, user_ids: Vec<Uuid>) {
    if !user_ids.is_empty() {
      debug!(count = user_ids.len(), "Expired sessions purged.");
    }
    for user_id in user_ids {
      self.emit(AuthEvent::SessionExpired { user_id });
    }
  }

  pub fn validate(&self, access_token: &str) -> Result<Session> {
    self.validate_at(access_token, Utc::now())
  }

  pub fn validate_at(&self, access_token: &str, now: DateTime<Utc>) -> Result<Session> {
    let found = self.sessions.read().get(access_token).cloned();
    let Some(session) = found else {
      debug!("Unknown or revoked access token presented.");
      return Err(AppError::Auth("Not signed in.".to_string()));
    };
    if session.is_expired_at(now) {
      self.sessions.write().remove(access_token);
      info!(user_id = %session.user_id, "Session expired.");
      self.emit(AuthEvent::SessionExpired {
        user_id: session.user_id,
      });
      return Err(AppError::Auth("Session expired. Please sign in again.".to_string()));
    }
    Ok(session)
  }

  /// Confirms a session object handed to a workflow is still live.
  pub fn ensure_live(&self, session: &Session) -> Result<()> {
    self.ensure_live_at(session, Utc::now())
  }

  pub fn ensure_live_at(&self, session: &Session, now: DateTime<Utc>) -> Result<()> {
    let current = self.validate_at(&session.access_token, now)?;
    if current.user_id != session.user_id {
      return Err(AppError::Auth("Session does not match the signed-in user.".to_string()));
    }
    Ok(())
  }

  /// Revokes the token. Returns the session it belonged to, if any.
  pub fn revoke(&self, access_token: &str) -> Option<Session> {
    let removed = self.sessions.write().remove(access_token);
    if let Some(session) = &removed {
      info!(user_id = %session.user_id, "Session revoked.");
      self.emit(AuthEvent::SignedOut {
        user_id: session.user_id,
      });
    }
    removed
  }

  pub fn active_count(&self) -> usize {
    self.sessions.read().len()
  }
}

fn sweep_expired(sessions: &mut HashMap<String, Session>, now: DateTime<Utc>) -> Vec<Uuid> {
  let mut expired = Vec::new();
  sessions.retain(|_, session| {
    let live = !session.is_expired_at(now);
    if !live {
      expired.push(session.user_id);
    }
    live
  });
  expired
}

#[cfg(test)]
mod tests {
  use super::*;

  fn user() -> User {
    let now = Utc::now();
    User {
      id: Uuid::new_v4(),
      email: "shopper@example.com".into(),
      password_hash: String::new(),
      full_name: None,
      created_at: now,
      updated_at: now,
    }
  }

  #[test]
  fn issued_sessions_validate_until_expiry() {
    let manager = SessionManager::new(60);
    let issued_at = Utc::now();
    let session = manager.issue_at(&user(), issued_at);
    assert_eq!(session.access_token.len(), 64);

    assert!(manager.validate_at(&session.access_token, issued_at + Duration::seconds(59)).is_ok());
    let err = manager
      .validate_at(&session.access_token, issued_at + Duration::seconds(60))
      .unwrap_err();
    assert!(matches!(err, AppError::Auth(_)));
    assert_eq!(manager.active_count(), 0);
  }

  #[test]
  fn revoked_sessions_are_not_live() {
    let manager = SessionManager::new(60);
    let session = manager.issue(&user());
    assert!(manager.ensure_live(&session).is_ok());
    assert!(manager.revoke(&session.access_token).is_some());
    assert!(manager.ensure_live(&session).is_err());
    assert!(manager.revoke(&session.access_token).is_none());
  }

  #[test]
  fn debug_output_hides_the_token() {
    let manager = SessionManager::new(60);
    let session = manager.issue(&user());
    assert!(!format!("{:?}", session).contains(&session.access_token));
  }

  #[tokio::test]
  async fn auth_events_are_broadcast() {
    let manager = SessionManager::new(1);
    let mut events = manager.subscribe();
    let u = user();
    let now = Utc::now();
    let session = manager.issue_at(&u, now);
    let _ = manager.validate_at(&session.access_token, now + Duration::seconds(5));
    let second = manager.issue_at(&u, now);
    manager.revoke(&second.access_token);

    assert_eq!(events.recv().await.unwrap(), AuthEvent::SignedIn { user_id: u.id });
    assert_eq!(events.recv().await.unwrap(), AuthEvent::SessionExpired { user_id: u.id });
    assert_eq!(events.recv().await.unwrap(), AuthEvent::SignedIn { user_id: u.id });
    assert_eq!(events.recv().await.unwrap(), AuthEvent::SignedOut { user_id: u.id });
  }

  #[test]
  fn issuing_a_session_purges_expired_ones() {
    let manager = SessionManager::new(60);
    let mut events = manager.subscribe();
    let now = Utc::now();
    let stale = user();
    for _ in 0..20 {
      manager.issue_at(&stale, now - Duration::hours(1));
    }
    assert_eq!(manager.active_count(), 20);

    let live = manager.issue_at(&user(), now);
    assert_eq!(manager.active_count(), 1);
    assert!(manager.validate_at(&live.access_token, now).is_ok());

    let mut expired = 0;
    while let Ok(event) = events.try_recv() {
      if event == (AuthEvent::SessionExpired { user_id: stale.id }) {
        expired += 1;
      }
    }
    assert_eq!(expired, 20);
  }

  #[test]
  fn purge_keeps_live_sessions() {
    let manager = SessionManager::new(60);
    let now = Utc::now();
    manager.issue_at(&user(), now - Duration::seconds(90));
    let live = manager.issue_at(&user(), now - Duration::seconds(45));

    assert_eq!(manager.purge_expired_at(now), 1);
    assert_eq!(manager.purge_expired_at(now), 0);
    assert!(manager.validate_at(&live.access_token, now).is_ok());
  }
}
