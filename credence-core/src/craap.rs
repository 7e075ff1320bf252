//! CRAAP heuristics: Currency, Relevance, Authority, Accuracy, Purpose

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ArticleMetadata, SignalKind, SignalScore};

/// Baseline relevance. Heuristic placeholder, not learned.
pub const BASELINE_RELEVANCE: f64 = 0.9;

/// Baseline accuracy. Heuristic placeholder, not learned.
pub const BASELINE_ACCURACY: f64 = 0.85;

/// Baseline purpose. Heuristic placeholder, not learned.
pub const BASELINE_PURPOSE: f64 = 0.75;

/// Authority for institutional/educational domains
pub const INSTITUTIONAL_AUTHORITY: f64 = 0.8;

/// Authority for every other domain
pub const DEFAULT_AUTHORITY: f64 = 0.6;

/// Domain suffixes treated as institutional
pub const INSTITUTIONAL_SUFFIXES: &[&str] = &[".gov", ".edu"];

/// The five CRAAP sub-scores, each in [0,1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CraapScores {
    pub currency: f64,
    pub relevance: f64,
    pub authority: f64,
    pub accuracy: f64,
    pub purpose: f64,
}

impl CraapScores {
    pub fn new(currency: f64, relevance: f64, authority: f64, accuracy: f64, purpose: f64) -> Self {
        Self {
            currency,
            relevance,
            authority,
            accuracy,
            purpose,
        }
    }

    /// Scores substituted when the evaluator is unavailable: a fresh article
    /// from a non-institutional source with baseline constants
    pub fn baseline() -> Self {
        Self::new(
            1.0,
            BASELINE_RELEVANCE,
            DEFAULT_AUTHORITY,
            BASELINE_ACCURACY,
            BASELINE_PURPOSE,
        )
    }

    /// Score article metadata as of `now`
    pub fn evaluate(metadata: &ArticleMetadata, now: DateTime<Utc>) -> Self {
        Self::new(
            currency(metadata.publication_date, now),
            BASELINE_RELEVANCE,
            authority(&metadata.source_domain),
            BASELINE_ACCURACY,
            BASELINE_PURPOSE,
        )
    }

    pub fn mean(&self) -> f64 {
        (self.currency + self.relevance + self.authority + self.accuracy + self.purpose) / 5.0
    }

    pub fn to_signal(&self) -> SignalScore {
        SignalScore::new(SignalKind::Craap.as_str(), self.mean()).with_detail(serde_json::json!({
            "currency": self.currency,
            "relevance": self.relevance,
            "authority": self.authority,
            "accuracy": self.accuracy,
            "purpose": self.purpose,
        }))
    }
}

/// `max(0, 1 - days/365)`. A missing date counts as published `now`;
/// future dates are capped at 1.0.
pub fn currency(publication_date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    let published = publication_date.unwrap_or(now);
    let days = (now - published).num_days() as f64;
    (1.0 - days / 365.0).clamp(0.0, 1.0)
}

/// 0.8 for institutional/educational suffixes, 0.6 otherwise
pub fn authority(source_domain: &str) -> f64 {
    let domain = source_domain.trim().trim_end_matches('.').to_lowercase();
    if INSTITUTIONAL_SUFFIXES
        .iter()
        .any(|suffix| domain.ends_with(suffix))
    {
        INSTITUTIONAL_AUTHORITY
    } else {
        DEFAULT_AUTHORITY
    }
}
