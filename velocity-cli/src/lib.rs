//! Shared plumbing for the `velocity-ingest` and `velocity-query` binaries.

pub mod args;
pub mod factory;
pub mod output;
pub mod telemetry;

pub use args::{ChunkerKind, DEFAULT_QUESTION, EmbedderKind, IngestArgs, QueryArgs, StoreArgs};
