pub mod action_executor;
pub mod page_extractor;
pub mod reconciliation;
pub mod update_log_writer;

pub use action_executor::{ActionExecutor, EntryDraft, NO_LINKED_DRAWING_LABEL};
pub use page_extractor::PageExtractor;
pub use reconciliation::{ReconcileRules, ReconciliationEngine};
pub use update_log_writer::UpdateLogWriter;
