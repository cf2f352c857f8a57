pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod security;
pub mod services;

// Re-export main components for easier use
pub use error::Error;
pub use ingest::{classify, Category, DuplicateSuppressor, EventNormalizer, Outcome, SkipReason};
pub use services::{CleanupService, IngestService};
