pub mod dedupe;
pub mod enrich;
pub mod extract;
pub mod ingest;
pub mod merge;
pub mod normalizer;

pub use dedupe::DedupeStats;
pub use enrich::EnrichmentStats;
pub use ingest::{IngestStats, UnifyEngine};
pub use merge::{merge, ContactMerge};
pub use normalizer::{transform, RejectReason, Transformed};
