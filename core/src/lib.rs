// orderflow/src/lib.rs

//! orderflow: an async step pipeline for multi-step business workflows.
//!
//! A pipeline is an ordered list of named steps. Each step may carry:
//!  - `before`, `on` and `after` handlers, run in that order;
//!  - a `compensate` handler, run in reverse step order when a later step fails;
//!  - a skip condition evaluated against the shared context.
//!
//! Handlers receive a cloned [`ContextData<T>`] and return
//! `Result<PipelineControl, Err>`. Returning [`PipelineControl::Stop`] halts the
//! pipeline without error and without compensation. Returning `Err` halts it,
//! runs the compensations of every step that already completed, and hands the
//! original error back to the caller.
//!
//! [`Registry`] keeps one pipeline per context type so application code can
//! dispatch with `registry.run(ContextData::new(ctx))`.

pub mod core;
pub mod error;
pub mod pipeline;
pub mod registry;

pub use crate::core::context::Handler;
pub use crate::core::context_data::ContextData;
pub use crate::core::control::{PipelineControl, PipelineResult};
pub use crate::core::step::{SkipCondition, StepDef};

pub use crate::pipeline::definition::Pipeline;

pub use crate::error::{FlowError, FlowResult};

pub use crate::registry::Registry;

/*
    Typical wiring:
    1. Define a context struct `MyCtx` holding inputs, collaborators and outputs.
    2. Build a `Pipeline<MyCtx, MyErr>` from step definitions.
    3. Attach handlers with `.on()`, `.before()`, `.after()`; attach `.compensate()`
       to every step whose effect must be undone if a later step fails.
    4. Register the pipeline with a `Registry<MyErr>` at startup.
    5. Per request: `registry.run(ContextData::new(ctx)).await`, then read results
       back out of the same `ContextData`.
*/
