pub mod client;
pub mod migrate;
pub mod reader;
#[cfg(feature = "test-utils")]
pub mod testutil;
pub mod writer;

pub use client::GraphClient;
pub use neo4rs::query;
pub use reader::{LeadKey, LeadReader, StoreCounts};
pub use writer::LeadWriter;
