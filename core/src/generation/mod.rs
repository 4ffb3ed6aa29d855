// mapofus/src/generation/mod.rs

//! The create-order operation: checks, prompt, provider call, variant
//! upload, persistence and notification, run as one step pipeline.

pub mod context;
pub mod pipeline;
pub mod policy;

use crate::error::{MapError, MapResult};
use crate::flow::{ContextData, PipelineResult};
use crate::imaging::DerivationSpec;
use crate::model::{Identity, Order};
use crate::notify::Notifier;
use crate::pipeline::Pipeline;
use crate::providers::ImageProviderRegistry;
use crate::store::Backends;
use crate::validation::CreateOrderRequest;
use std::sync::Arc;
use tracing::{info, instrument};

pub use context::GenerationCtxData;
pub use policy::GenerationPolicy;

/// Everything a run needs besides the request itself.
pub struct GenerationDeps {
  pub backends: Backends,
  pub providers: ImageProviderRegistry,
  pub policy: GenerationPolicy,
  pub derivation: DerivationSpec,
  pub notifier: Notifier,
}

#[derive(Clone)]
pub struct GenerationService {
  deps: Arc<GenerationDeps>,
  pipeline: Arc<Pipeline<GenerationCtxData, MapError>>,
}

impl GenerationService {
  pub fn new(deps: GenerationDeps) -> Self {
    Self {
      deps: Arc::new(deps),
      pipeline: Arc::new(pipeline::build_generation_pipeline()),
    }
  }

  pub fn providers(&self) -> &ImageProviderRegistry {
    &self.deps.providers
  }

  /// Runs the whole create-order sequence and returns the persisted order.
  #[instrument(name = "GenerationService::create_order", skip_all, fields(user_id = %identity.user_id), err(Display))]
  pub async fn create_order(&self, identity: &Identity, request: CreateOrderRequest) -> MapResult<Order> {
    let ctx = ContextData::new(GenerationCtxData::new(self.deps.clone(), identity.clone(), request));
    match self.pipeline.run(ctx.clone()).await? {
      PipelineResult::Completed => {}
      PipelineResult::Stopped => {
        return Err(MapError::Internal("generation pipeline stopped before persisting".to_string()));
      }
    }
    let order = ctx
      .write()
      .order
      .take()
      .ok_or_else(|| MapError::Internal("generation finished without an order".to_string()))?;
    info!(order_id = %order.id, provider = %order.image_provider, "Order created.");
    Ok(order)
  }
}
