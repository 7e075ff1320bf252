//! Credence Core - data model and scoring policy for credibility assessment
//!
//! This crate provides the foundational primitives:
//! - Article content and metadata handed to signal providers
//! - Signal scores and per-signal outcomes (completed, failed, timed out)
//! - CRAAP heuristics and the weighted aggregation policy
//! - Weight sets, historical records and the reliability label scale
//! - Registry of secondary fact-check sites

pub mod article;
pub mod signals;
pub mod craap;
pub mod weights;
pub mod aggregate;
pub mod label;
pub mod record;
pub mod factcheck_sites;

pub use article::*;
pub use signals::*;
pub use craap::*;
pub use weights::*;
pub use aggregate::*;
pub use label::*;
pub use record::*;
pub use factcheck_sites::*;

/// Default per-call timeout for external collaborators, in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Number of nearest reference vectors consulted per article
pub const VECTOR_TOP_K: usize = 3;

/// Dimensionality of article embeddings
pub const EMBEDDING_DIM: usize = 384;

/// Minimum history size before the optimizer fits a model
pub const MIN_TRAINING_RECORDS: usize = 10;

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
