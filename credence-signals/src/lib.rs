//! Credence Signals
//!
//! Independent credibility signal providers:
//! - **CRAAP**: freshness/authority heuristics over article metadata
//! - **Corroboration**: vector similarity against reference claims plus
//!   concurrently queried fact-check sources
//! - **Sentiment**: classifier label with polarity/subjectivity analysis
//! - **Ledger**: advisory attestation lookup
//!
//! Every external collaborator sits behind a trait in [`traits`] so the
//! runtime can inject real clients or test fakes.

pub mod traits;
pub mod craap;
pub mod embedder;
pub mod openai;
pub mod index;
pub mod corroboration;
pub mod sentiment;
pub mod ledger;

pub use traits::*;
pub use craap::*;
pub use embedder::*;
pub use openai::*;
pub use index::*;
pub use corroboration::*;
pub use sentiment::*;
pub use ledger::*;
