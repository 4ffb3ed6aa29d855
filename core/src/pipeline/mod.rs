// mapofus/src/pipeline/mod.rs

//! A named-step pipeline runner. Steps execute in declaration order; each
//! step runs its `before`, `on` and `after` handlers in turn.

pub mod definition;
pub mod execution;
pub mod hooks;

pub use definition::Pipeline;
