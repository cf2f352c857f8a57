pub mod classify;
pub mod dedup;
pub mod fields;
pub mod location;
pub mod normalizer;
pub mod timestamp;

pub use classify::{classify, Category};
pub use dedup::DuplicateSuppressor;
pub use normalizer::{BusImageOutcome, EventNormalizer, Outcome, SkipReason};
