//! Directory resolution and concurrent harvesting engine.
//!
//! Resolves human-supplied faculty names to stable identifiers in a remote
//! academic-directory API, then harvests each person's linked records
//! (publications, grants, teaching activities) through the directory's
//! paginated, schema-drifting endpoints:
//! - Name-to-identifier resolution under fuzzy query semantics ([`resolve`])
//! - Outbound schema-compat rewrites ([`directory::shim`])
//! - Cursor-order collection pagination ([`directory::pages`])
//! - Bounded-concurrency id-space scanning ([`scan`])
//! - Per-owner harvest orchestration feeding an external sink ([`harvest`])

pub mod directory;
pub mod harvest;
pub mod model;
pub mod names;
pub mod resolve;
pub mod scan;
pub mod text;

#[cfg(test)]
pub(crate) mod testutil;

// Re-export common types for convenience
pub use directory::{ClientConfig, DirectoryClient, Paginator, StreamStatus, TransportError};
pub use harvest::{HarvestOptions, HarvestSink, Orchestrator, OwnerReport};
pub use model::{LinkedRecord, OwnerRecord, PartialDate, RecordDetail, RecordKind};
pub use names::{NameQuery, VariantGenerator, VariantRule};
pub use resolve::{Resolution, ResolveError, Resolver};
pub use scan::{MatchSet, ScanOutcome, ScanPredicate, ScanStats, Scanner};
