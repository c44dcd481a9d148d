// orderflow/src/core/context.rs

//! The boxed handler type stored for every pipeline phase.

use crate::core::context_data::ContextData;
use crate::core::control::PipelineControl;
use std::future::Future;
use std::pin::Pin;

/// A pipeline step handler.
///
/// Takes a clone of the shared `ContextData<TData>` and resolves to
/// `Result<PipelineControl, Err>`.
///
/// Handlers must drop every lock guard obtained from the context before the
/// first `.await`; the guards are blocking `parking_lot` guards.
pub type Handler<TData, Err> = Box<
  dyn Fn(ContextData<TData>) -> Pin<Box<dyn Future<Output = Result<PipelineControl, Err>> + Send>>
    + Send
    + Sync,
>;

/// Boxed future returned by compensation handlers. Compensations cannot stop
/// or redirect the pipeline, they only report whether the undo succeeded.
pub type CompensationFuture<Err> = Pin<Box<dyn Future<Output = Result<(), Err>> + Send>>;

/// A compensation handler, registered at most once per step.
pub type Compensation<TData, Err> = Box<dyn Fn(ContextData<TData>) -> CompensationFuture<Err> + Send + Sync>;
