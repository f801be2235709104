pub mod loaders;
pub mod record;

pub use loaders::load_links;
pub use record::{ExtractedRecord, ReconciliationDecision, TargetLink, UpdateLogEntry};
