//! Merge layer: per-collector dedup with best-record scoring, primary-key
//! assignment, and the cross-collector combine step.

pub mod combine;
pub mod dedup;
pub mod engine;
mod error;
pub mod pk;
pub mod score;

pub use combine::{
    CombineReport, CombinedOutput, Combiner, Produced, combine_download_links, combine_info,
    combine_relations, normalize_identifiers,
};
pub use dedup::{DedupPolicy, canonicalize, dedup_keep_last, select_best};
pub use engine::{MergeEngine, MergeOutcome};
pub use error::MergeError;
pub use pk::reassign_primary_key;
