//! Triad agent: the effectful half of the quorum plan gateway.
//!
//! This crate talks to the three plan providers and drives a round:
//! 1. **Prompt** (`prompt`) - one prompt from intent, schema snapshot and override
//! 2. **Dispatch** (`orchestrator`) - concurrent fan-out to exactly three providers
//! 3. **Reduce** - majority-by-hash over the settled results (`triad_core::quorum`)
//! 4. **Audit** - one immutable record per round, whatever the outcome
//! 5. **Gate & commit** (`committer`) - budget checks, then a revision-checked write
//!
//! # Key Types
//!
//! - `PlanProvider` - pluggable trait for OpenAI/Vertex/Anthropic
//! - `QuorumOrchestrator` - the round driver
//! - `PlanCommitter` - sole writer of module records
//!
//! # Safety Principle
//!
//! Providers only propose. A plan is applied only when two of three agree on
//! the same canonical hash and the plan fits its declared budgets.

pub mod committer;
pub mod orchestrator;
pub mod prompt;
pub mod provider;
pub mod providers;

pub use committer::PlanCommitter;
pub use orchestrator::{OrchestrationOutcome, OrchestrationRequest, QuorumOrchestrator};
pub use provider::PlanProvider;
pub use providers::build_providers;
