// mapofus/src/lib.rs

//! Map of Us: turn a relationship story into an illustrated map, then sell
//! the high-resolution file through a manual, invoice-based payment flow.
//!
//! This crate holds everything that is not HTTP or SQL:
//!  - the order-status state machine (`lifecycle`) and the access gate (`access`),
//!  - prompt construction, image provider adapters and variant derivation,
//!  - the create-order orchestrator, built on a small named-step pipeline engine,
//!  - owner and admin services over the collaborator traits in `store`.

pub mod access;
pub mod admin;
pub mod error;
pub mod flow;
pub mod generation;
pub mod imaging;
pub mod lifecycle;
pub mod model;
pub mod notify;
pub mod orders;
pub mod pipeline;
pub mod prompt;
pub mod providers;
pub mod store;
pub mod validation;

// --- Re-exports ---

pub use crate::error::{FlowError, MapError, MapResult};
pub use crate::flow::{ContextData, PipelineControl, PipelineResult, StepDef};
pub use crate::pipeline::Pipeline;

pub use crate::access::{AdminGate, AdminStatus};
pub use crate::admin::{AdminService, AdminUpdateRequest, SettingsUpdate};
pub use crate::generation::{GenerationDeps, GenerationPolicy, GenerationService};
pub use crate::lifecycle::AdminUpdate;
pub use crate::model::{Identity, Order, OrderStatus, PaymentStatus};
pub use crate::notify::Notifier;
pub use crate::orders::{OrderPreview, OrderService, SharedMap};
pub use crate::providers::{GeneratedImage, ImageProvider, ImageProviderRegistry};
pub use crate::store::Backends;
pub use crate::validation::CreateOrderRequest;
