// crates/core/src/lib.rs
pub mod dialect;
pub mod error;
pub mod executor;
pub mod inventory;
pub mod llm;
pub mod pricing;

pub use dialect::SourceDialect;
pub use error::*;
pub use executor::{ExecutionOutcome, SqlExecutor, TargetLocation};
pub use inventory::{InventoryExtractor, InventorySource, ObjectType, WorkItem, WorkItemSource};
pub use llm::{Translation, TranslationMetrics, TranslationRequest, Translator};
pub use pricing::{calculate_llm_cost, TokenUsage};
