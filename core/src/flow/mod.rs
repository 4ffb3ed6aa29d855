// mapofus/src/flow/mod.rs

//! Building blocks shared by every pipeline: the lockable context handle,
//! flow-control signals, step definitions and the boxed handler type.

pub mod context_data;
pub mod control;
pub mod step;

use std::future::Future;
use std::pin::Pin;

pub use context_data::ContextData;
pub use control::{PipelineControl, PipelineResult};
pub use step::{SkipCondition, StepDef};

/// A boxed asynchronous step handler.
///
/// Handlers receive a clone of the run's `ContextData<TData>` and must drop any
/// lock guard before they `.await`.
pub type Handler<TData, Err> = Box<
  dyn Fn(ContextData<TData>) -> Pin<Box<dyn Future<Output = Result<PipelineControl, Err>> + Send>>
    + Send
    + Sync,
>;
