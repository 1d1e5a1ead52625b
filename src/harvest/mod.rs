//! Harvest orchestration: owner batches in, `(owner, kind, record)` triples out.
//!
//! - **Orchestrator**: per-owner collection walks with per-owner×kind failure
//!   isolation via [`orchestrator::Orchestrator`]
//! - **Sink**: the external output boundary via [`sink::HarvestSink`]

pub mod orchestrator;
pub mod sink;

// Re-export commonly used types
pub use orchestrator::{HarvestOptions, KindReport, Orchestrator, OwnerReport};
pub use sink::{HarvestSink, MemorySink};
