//! Incremental updates: failure ledger, delta planning, retry policy, and the
//! collector-driven updater that ties them to the merge engine.

pub mod collector;
mod error;
pub mod ledger;
pub mod plan;
pub mod retry;
pub mod updater;

pub use collector::{Collector, Extraction, ModeProfile, UPDATE_PAGES};
pub use error::UpdateError;
pub use ledger::FailureLedger;
pub use plan::{Existing, WorkSet, load_existing, plan_work};
pub use retry::{RetryPolicy, attempt_with_retry};
pub use updater::{UpdateReport, Updater};
