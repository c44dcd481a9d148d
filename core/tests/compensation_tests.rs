// tests/compensation_tests.rs
mod common;

use common::*;
use orderflow::{ContextData, Pipeline, PipelineResult};
use serial_test::serial;

fn compensated_pipeline() -> Pipeline<LedgerContext, TestError> {
  let mut p = Pipeline::<LedgerContext, TestError>::new(&[
    ("reserve", false, None),
    ("charge", false, None),
    ("notify", false, None),
  ]);
  p.on("reserve", ledger_step("reserve", "R"));
  p.compensate("reserve", ledger_undo("reserve", "R"));
  p.on("charge", ledger_step("charge", "C"));
  p.compensate("charge", ledger_undo("charge", "C"));
  p.on("notify", ledger_step("notify", "N"));
  p
}

#[tokio::test]
#[serial]
async fn failure_unwinds_completed_steps_newest_first() {
  setup_tracing();
  let pipeline = compensated_pipeline();
  let ctx = ContextData::new(LedgerContext {
    fail_at: Some("notify".into()),
    ..Default::default()
  });

  let result = pipeline.run(ctx.clone()).await;

  assert_eq!(result, Err(TestError::Step("notify".into())));
  let guard = ctx.read();
  assert_eq!(guard.compensated, vec!["charge", "reserve"]);
  assert!(guard.entries.is_empty());
}

#[tokio::test]
#[serial]
async fn failing_step_itself_is_not_compensated() {
  setup_tracing();
  let pipeline = compensated_pipeline();
  let ctx = ContextData::new(LedgerContext {
    fail_at: Some("charge".into()),
    ..Default::default()
  });

  let _ = pipeline.run(ctx.clone()).await;

  assert_eq!(ctx.read().compensated, vec!["reserve"]);
}

#[tokio::test]
#[serial]
async fn first_step_failure_compensates_nothing() {
  setup_tracing();
  let pipeline = compensated_pipeline();
  let ctx = ContextData::new(LedgerContext {
    fail_at: Some("reserve".into()),
    ..Default::default()
  });

  let _ = pipeline.run(ctx.clone()).await;

  assert!(ctx.read().compensated.is_empty());
}

#[tokio::test]
#[serial]
async fn success_and_stop_never_compensate() {
  setup_tracing();
  let pipeline = compensated_pipeline();

  let ok_ctx = ContextData::new(LedgerContext::default());
  assert_eq!(pipeline.run(ok_ctx.clone()).await, Ok(PipelineResult::Completed));
  assert!(ok_ctx.read().compensated.is_empty());

  let stop_ctx = ContextData::new(LedgerContext {
    stop_at: Some("charge".into()),
    ..Default::default()
  });
  assert_eq!(pipeline.run(stop_ctx.clone()).await, Ok(PipelineResult::Stopped));
  assert!(stop_ctx.read().compensated.is_empty());
}

#[tokio::test]
#[serial]
async fn failed_compensation_keeps_original_error_and_continues() {
  setup_tracing();
  let pipeline = compensated_pipeline();
  let ctx = ContextData::new(LedgerContext {
    fail_at: Some("notify".into()),
    fail_compensation_of: Some("charge".into()),
    ..Default::default()
  });

  let result = pipeline.run(ctx.clone()).await;

  assert_eq!(result, Err(TestError::Step("notify".into())));
  let guard = ctx.read();
  assert_eq!(guard.compensated, vec!["charge", "reserve"]);
  assert_eq!(guard.entries, vec!["C"]);
}

#[tokio::test]
#[serial]
async fn error_in_after_phase_compensates_the_step_itself() {
  setup_tracing();
  let mut pipeline = Pipeline::<LedgerContext, TestError>::new(&[("reserve", false, None)]);
  pipeline.on("reserve", ledger_step("reserve", "R"));
  pipeline.after("reserve", ledger_step("verify", "V"));
  pipeline.compensate("reserve", ledger_undo("reserve", "R"));

  let ctx = ContextData::new(LedgerContext {
    fail_at: Some("verify".into()),
    ..Default::default()
  });
  let result = pipeline.run(ctx.clone()).await;

  assert_eq!(result, Err(TestError::Step("verify".into())));
  assert_eq!(ctx.read().compensated, vec!["reserve"]);
  assert!(pipeline.has_compensation("reserve"));
}
