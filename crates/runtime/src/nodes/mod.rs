//! Graph nodes: pure state transformers, one responsibility each.

mod actor;
mod auditor;
mod classifier;
mod planner;
mod responder;

pub use actor::Actor;
pub use auditor::Auditor;
pub use classifier::Classifier;
pub use planner::Planner;
pub use responder::Responder;

use std::sync::Arc;

use maestro_core::{traits::LlmClient, RuntimeConfig};

/// Shared handles every node needs: the LLM client and the model slots.
#[derive(Clone)]
pub struct NodeContext {
    pub llm: Arc<dyn LlmClient>,
    pub config: Arc<RuntimeConfig>,
}
