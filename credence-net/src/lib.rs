//! Credence Net Layer
//!
//! HTTP plumbing for the collaborators the scoring pipeline calls out to:
//! - Shared client construction with timeouts and user-agent rotation
//! - Article extraction (text, title, publication date, author)
//! - Primary structured fact-check API and secondary site scrapers
//! - Advisory ledger attestation lookup

pub mod client;
pub mod extractor;
pub mod factcheck;
pub mod ledger;

pub use client::*;
pub use extractor::*;
pub use factcheck::*;
pub use ledger::*;
