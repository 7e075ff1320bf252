//! Signal scores and the reports produced by each provider
//!
//! Every provider emits a typed report. Reports flatten into named
//! [`SignalScore`]s for the transparency breakdown of an assessment.

use serde::{Deserialize, Serialize};

use crate::CraapScores;

/// Which signal a score or outcome belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    /// Freshness/authority heuristics (CRAAP)
    Craap,
    /// Vector similarity plus external fact-check corroboration
    Corroboration,
    /// Sentiment and subjectivity
    Sentiment,
    /// Advisory ledger attestation
    Ledger,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Craap => "craap",
            SignalKind::Corroboration => "corroboration",
            SignalKind::Sentiment => "sentiment",
            SignalKind::Ledger => "ledger",
        }
    }
}

/// A named value in [0,1] with optional structured detail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalScore {
    pub name: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

impl SignalScore {
    pub fn new(name: &str, value: f64) -> Self {
        Self {
            name: name.to_string(),
            value,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = Some(detail);
        self
    }
}

/// Result of one orchestrated sub-task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SignalOutcome<T> {
    Completed { value: T },
    Failed { reason: String },
    TimedOut { after_secs: u64 },
}

impl<T> SignalOutcome<T> {
    pub fn completed(value: T) -> Self {
        SignalOutcome::Completed { value }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        SignalOutcome::Failed {
            reason: reason.into(),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, SignalOutcome::Completed { .. })
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            SignalOutcome::Completed { value } => Some(value),
            _ => None,
        }
    }

    /// The completed value, or `default` when the sub-task failed or timed out
    pub fn or_default_with(self, default: impl FnOnce() -> T) -> T {
        match self {
            SignalOutcome::Completed { value } => value,
            _ => default(),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> SignalOutcome<U> {
        match self {
            SignalOutcome::Completed { value } => SignalOutcome::Completed { value: f(value) },
            SignalOutcome::Failed { reason } => SignalOutcome::Failed { reason },
            SignalOutcome::TimedOut { after_secs } => SignalOutcome::TimedOut { after_secs },
        }
    }
}

/// One nearest-neighbour hit from the reference index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMatch {
    pub id: String,
    /// Similarity-derived score in [0,1]
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Claim returned by the primary structured fact-check source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactCheckClaim {
    pub claim_text: String,
    pub rating: String,
}

/// Search hit scraped from a secondary fact-check site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactCheckHit {
    pub title: String,
    pub url: String,
    pub site: String,
}

/// Composite corroboration signal with its inputs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorroborationReport {
    /// Composite score, rounded to 2 decimals; may exceed 1.0
    pub score: f64,
    /// Mean vector-match score (0 when no matches)
    pub vector_score: f64,
    pub vector_matches: Vec<VectorMatch>,
    pub primary_claims: Vec<FactCheckClaim>,
    pub secondary_hits: Vec<FactCheckHit>,
}

impl CorroborationReport {
    /// Neutral report substituted when corroboration is unavailable
    pub fn neutral() -> Self {
        Self::default()
    }

    pub fn to_signal(&self) -> SignalScore {
        SignalScore::new(SignalKind::Corroboration.as_str(), self.score).with_detail(
            serde_json::json!({
                "vector_score": self.vector_score,
                "vector_matches": self.vector_matches,
                "primary_claims": self.primary_claims,
                "secondary_hits": self.secondary_hits,
            }),
        )
    }
}

/// Sentiment classification plus subjectivity analysis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentReport {
    /// Classifier label (e.g. POSITIVE/NEGATIVE), if classification succeeded
    pub label: Option<String>,
    /// Classifier confidence for `label`
    pub label_score: Option<f64>,
    /// Polarity in [-1,1]
    pub polarity: f64,
    /// Subjectivity in [0,1]
    pub subjectivity: f64,
}

impl SentimentReport {
    /// Neutral report substituted when sentiment analysis is unavailable
    pub fn neutral() -> Self {
        Self::default()
    }

    pub fn to_signal(&self) -> SignalScore {
        SignalScore::new(SignalKind::Sentiment.as_str(), self.subjectivity).with_detail(
            serde_json::json!({
                "label": self.label,
                "label_score": self.label_score,
                "polarity": self.polarity,
                "subjectivity": self.subjectivity,
            }),
        )
    }
}

/// Joined outputs of one orchestration pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalBundle {
    pub craap: SignalOutcome<CraapScores>,
    pub corroboration: SignalOutcome<CorroborationReport>,
    pub sentiment: SignalOutcome<SentimentReport>,
    pub ledger: SignalOutcome<bool>,
}

impl SignalBundle {
    /// Kinds whose sub-task did not complete
    pub fn degraded(&self) -> Vec<SignalKind> {
        let mut kinds = Vec::new();
        if !self.craap.is_completed() {
            kinds.push(SignalKind::Craap);
        }
        if !self.corroboration.is_completed() {
            kinds.push(SignalKind::Corroboration);
        }
        if !self.sentiment.is_completed() {
            kinds.push(SignalKind::Sentiment);
        }
        if !self.ledger.is_completed() {
            kinds.push(SignalKind::Ledger);
        }
        kinds
    }
}
