pub mod cleanup;
pub mod ingest;

pub use cleanup::CleanupService;
pub use ingest::{IngestReport, IngestService};
