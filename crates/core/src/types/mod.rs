//! Shared data types.

mod audit;
mod intent;
mod memory;
mod plan;
mod skill;

pub use audit::{AuditResult, Severity};
pub use intent::IntentType;
pub use memory::{EntryType, FactCategory, MemoryRecord, RecalledMemory, ScoredRecord, UserFact};
pub use plan::{Plan, PlanStep, StepRole};
pub use skill::{ParameterSpec, SkillExample};
