// orderflow/src/pipeline/execution.rs

//! `Pipeline::run()`: executes steps in order and unwinds completed steps on failure.

use crate::core::context::Handler;
use crate::core::context_data::ContextData;
use crate::core::control::{PipelineControl, PipelineResult};
use crate::core::step::StepDef;
use crate::error::FlowError;
use crate::pipeline::definition::Pipeline;
use tracing::{event, info_span, instrument, Instrument, Level};

enum StepOutcome {
  Done,
  Skipped,
  Stopped,
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Executes the pipeline against `ctx_data`.
  ///
  /// A step counts as completed once all of its `on` handlers succeeded. When
  /// any handler fails, the compensations of completed steps run newest-first
  /// and the original error is returned. A failing compensation is logged and
  /// does not replace that error.
  #[instrument(
    name = "Pipeline::run",
    skip_all,
    fields(
      context_type = %std::any::type_name::<TData>(),
      num_steps = self.steps.len(),
    ),
    err(Display)
  )]
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, Err> {
    event!(Level::DEBUG, "Pipeline execution starting.");
    let mut completed: Vec<&str> = Vec::new();

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_span = info_span!(
        "pipeline_step",
        step_name = step_def.name.as_str(),
        step_index = step_idx,
        optional = step_def.optional
      );
      let outcome = self
        .run_step(step_def, ctx_data.clone(), &mut completed)
        .instrument(step_span)
        .await;

      match outcome {
        Ok(StepOutcome::Done) | Ok(StepOutcome::Skipped) => {}
        Ok(StepOutcome::Stopped) => {
          event!(Level::INFO, step_name = %step_def.name, "Pipeline stopped by a handler.");
          return Ok(PipelineResult::Stopped);
        }
        Err(err) => {
          event!(Level::WARN, step_name = %step_def.name, error = %err, "Step failed, unwinding completed steps.");
          self.unwind(&completed, ctx_data).await;
          return Err(err);
        }
      }
    }

    event!(Level::DEBUG, "Pipeline execution completed successfully.");
    Ok(PipelineResult::Completed)
  }

  async fn run_step<'a>(
    &'a self,
    step_def: &'a StepDef<TData>,
    ctx_data: ContextData<TData>,
    completed: &mut Vec<&'a str>,
  ) -> Result<StepOutcome, Err> {
    let step_name = step_def.name.as_str();

    if let Some(skip_cond) = &step_def.skip_if {
      if skip_cond(ctx_data.clone()) {
        event!(Level::INFO, "Step skipped due to 'skip_if' condition.");
        return Ok(StepOutcome::Skipped);
      }
    }

    let has = |map: &std::collections::HashMap<String, Vec<Handler<TData, Err>>>| {
      map.get(step_name).is_some_and(|v| !v.is_empty())
    };
    if !has(&self.before) && !has(&self.on) && !has(&self.after) {
      if step_def.optional {
        event!(Level::DEBUG, "Optional step has no handlers, skipping.");
        return Ok(StepOutcome::Skipped);
      }
      event!(Level::ERROR, "Non-optional step has no handlers.");
      return Err(Err::from(FlowError::HandlerMissing {
        step_name: step_def.name.clone(),
      }));
    }

    if let PipelineControl::Stop = Self::run_phase(self.before.get(step_name), "before", &ctx_data).await? {
      return Ok(StepOutcome::Stopped);
    }
    if let PipelineControl::Stop = Self::run_phase(self.on.get(step_name), "on", &ctx_data).await? {
      return Ok(StepOutcome::Stopped);
    }
    completed.push(step_name);
    if let PipelineControl::Stop = Self::run_phase(self.after.get(step_name), "after", &ctx_data).await? {
      return Ok(StepOutcome::Stopped);
    }

    event!(Level::DEBUG, "Step processing finished successfully.");
    Ok(StepOutcome::Done)
  }

  async fn run_phase(
    handlers: Option<&Vec<Handler<TData, Err>>>,
    phase: &'static str,
    ctx_data: &ContextData<TData>,
  ) -> Result<PipelineControl, Err> {
    let Some(handlers) = handlers else {
      return Ok(PipelineControl::Continue);
    };
    for (handler_idx, handler_fn) in handlers.iter().enumerate() {
      let handler_span = info_span!("step_handler", phase, handler_index = handler_idx);
      match handler_fn(ctx_data.clone()).instrument(handler_span).await {
        Ok(PipelineControl::Continue) => {}
        Ok(PipelineControl::Stop) => return Ok(PipelineControl::Stop),
        Err(e) => {
          event!(Level::ERROR, phase, error = %e, "Handler failed.");
          return Err(e);
        }
      }
    }
    Ok(PipelineControl::Continue)
  }

  async fn unwind(&self, completed: &[&str], ctx_data: ContextData<TData>) {
    for step_name in completed.iter().rev() {
      let Some(compensation) = self.compensations.get(*step_name) else {
        continue;
      };
      let span = info_span!("step_compensation", step_name = *step_name);
      match compensation(ctx_data.clone()).instrument(span).await {
        Ok(()) => event!(Level::INFO, step_name = *step_name, "Step compensated."),
        Err(e) => event!(
          Level::ERROR,
          step_name = *step_name,
          error = %e,
          "Compensation failed; continuing with remaining steps."
        ),
      }
    }
  }
}
