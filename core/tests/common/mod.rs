// tests/common/mod.rs
#![allow(dead_code)]

use once_cell::sync::Lazy;
use orderflow::{ContextData, FlowError, PipelineControl};
use std::future::Future;
use std::pin::Pin;
use tracing::Level;

pub type StepFuture = Pin<Box<dyn Future<Output = Result<PipelineControl, TestError>> + Send>>;
pub type UndoFuture = Pin<Box<dyn Future<Output = Result<(), TestError>> + Send>>;

/// A miniature ledger standing in for external side effects.
#[derive(Clone, Debug, Default)]
pub struct LedgerContext {
  pub entries: Vec<String>,
  pub steps_executed: Vec<String>,
  pub compensated: Vec<String>,
  pub stop_at: Option<String>,
  pub fail_at: Option<String>,
  pub fail_compensation_of: Option<String>,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("orderflow error: {0}")]
  Flow(String),

  #[error("step failed: {0}")]
  Step(String),

  #[error("compensation failed: {0}")]
  Compensation(String),
}

impl From<FlowError> for TestError {
  fn from(fe: FlowError) -> Self {
    TestError::Flow(format!("{:?}", fe))
  }
}

/// Appends `entry` to the ledger, honouring `stop_at` / `fail_at`.
pub fn ledger_step(
  step_name: &'static str,
  entry: &'static str,
) -> impl Fn(ContextData<LedgerContext>) -> StepFuture + Send + Sync + 'static {
  move |ctx: ContextData<LedgerContext>| -> StepFuture {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.steps_executed.push(step_name.to_string());
      if guard.fail_at.as_deref() == Some(step_name) {
        return Err(TestError::Step(step_name.to_string()));
      }
      guard.entries.push(entry.to_string());
      if guard.stop_at.as_deref() == Some(step_name) {
        return Ok(PipelineControl::Stop);
      }
      Ok(PipelineControl::Continue)
    })
  }
}

/// Removes `entry` from the ledger and records the compensation.
pub fn ledger_undo(
  step_name: &'static str,
  entry: &'static str,
) -> impl Fn(ContextData<LedgerContext>) -> UndoFuture + Send + Sync + 'static {
  move |ctx: ContextData<LedgerContext>| -> UndoFuture {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.compensated.push(step_name.to_string());
      if guard.fail_compensation_of.as_deref() == Some(step_name) {
        return Err(TestError::Compensation(step_name.to_string()));
      }
      guard.entries.retain(|e| e != entry);
      Ok(())
    })
  }
}

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
